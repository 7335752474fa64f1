use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission class stored on the profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Company,
    Operator,
    Customer,
    CustomerBranch,
    /// Any role string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Company => "company",
            Role::Operator => "operator",
            Role::Customer => "customer",
            Role::CustomerBranch => "customer_branch",
            Role::Unknown => "unknown",
        }
    }

    /// Roles a visitor may pick on the sign-up form.
    pub fn self_service(value: &str) -> Option<Role> {
        match value {
            "customer" => Some(Role::Customer),
            "company" => Some(Role::Company),
            _ => None,
        }
    }

    /// Only administrators and companies manage the customer list.
    pub fn can_manage_customers(&self) -> bool {
        matches!(self, Role::Admin | Role::Company)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Try,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Try, Currency::Usd, Currency::Eur, Currency::Gbp];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Try => "TRY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub fn parse(code: &str) -> Option<Currency> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }
}

/// Row of the `profiles` table, keyed 1:1 by the identity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub parent_customer_id: Option<String>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            self.email.split('@').next().unwrap_or(&self.email)
        } else {
            &self.full_name
        }
    }
}

/// Insert payload written by sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub currency: Currency,
}

/// Partial update applied from the settings screen.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone.is_none() && self.currency.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_role_deserializes() {
        let role: Role = serde_json::from_str("\"inspector\"").unwrap();
        assert_eq!(role, Role::Unknown);

        let role: Role = serde_json::from_str("\"customer_branch\"").unwrap();
        assert_eq!(role, Role::CustomerBranch);
    }

    #[test]
    fn test_profile_defaults_optional_columns() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "ops@example.com",
            "full_name": "",
            "role": "operator",
        }))
        .unwrap();

        assert_eq!(profile.currency, Currency::Try);
        assert_eq!(profile.company_id, None);
        assert_eq!(profile.display_name(), "ops");
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!(Currency::parse("eur"), Some(Currency::Eur));
        assert_eq!(Currency::parse("JPY"), None);
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            phone: Some("555".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "phone": "555" })
        );
    }
}

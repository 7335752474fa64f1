use serde::{Deserialize, Serialize};

use super::contains_term;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub created_by_company_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Customer {
    /// Blank terms match everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty()
            || contains_term(self.company_name.as_deref(), term)
            || contains_term(self.address.as_deref(), term)
    }

    pub fn name(&self) -> &str {
        self.company_name.as_deref().unwrap_or("-")
    }
}

impl CustomerDetails {
    /// Trimmed, with a blank address stored as no address.
    pub fn new(
        company_name: &str,
        address: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Self {
        Self {
            company_name: company_name.trim().to_string(),
            address: address
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_company_id: Option<String>,
}

/// Columns entered on the customer form. On update every field is written,
/// so `None` clears the column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDetails {
    pub company_name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

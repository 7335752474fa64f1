use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use super::{manager, optional, Chrome};
use crate::access::Destination;
use crate::i18n::Localizer;
use crate::middleware::CurrentUser;
use crate::models::{Customer, CustomerDetails};
use crate::services::records;
use crate::AppState;

#[derive(Template)]
#[template(path = "customers.html")]
pub struct CustomersTemplate {
    pub i18n: Localizer,
    pub chrome: Chrome,
    pub customers: Vec<Customer>,
    pub term: String,
    pub can_manage: bool,
}

#[derive(Deserialize, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize, Validate)]
pub struct CustomerForm {
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
}

impl CustomerForm {
    fn into_details(self) -> Result<CustomerDetails, AppError> {
        self.validate()?;
        if self.company_name.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Company name is required")));
        }

        Ok(CustomerDetails::new(
            &self.company_name,
            self.address.as_deref(),
            coordinate(&self.latitude, 90.0)?,
            coordinate(&self.longitude, 180.0)?,
        ))
    }
}

/// Blank is no coordinate; anything else must be a number within `limit`.
fn coordinate(value: &str, limit: f64) -> Result<Option<f64>, AppError> {
    let Some(value) = optional(value) else {
        return Ok(None);
    };
    match value.replace(',', ".").parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.abs() <= limit => Ok(Some(parsed)),
        _ => Err(AppError::BadRequest(anyhow::anyhow!("Invalid coordinate: {}", value))),
    }
}

pub async fn list_customers(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<CustomersTemplate, AppError> {
    let identity = user.identity();
    let customers = match &identity.profile {
        Some(profile) => records::list_customers(state.session.backend(), profile, &query.q).await?,
        None => Vec::new(),
    };

    Ok(CustomersTemplate {
        i18n: state.language.localizer(),
        chrome: Chrome::new(identity, Destination::Customers),
        can_manage: identity
            .role()
            .is_some_and(|role| role.can_manage_customers()),
        customers,
        term: query.q,
    })
}

pub async fn create_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CustomerForm>,
) -> Result<Redirect, AppError> {
    let profile = manager(&user)?;
    let details = form.into_details()?;
    records::create_customer(state.session.backend(), profile, &details).await?;
    Ok(Redirect::to(Destination::Customers.path()))
}

pub async fn update_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(customer_id): Path<String>,
    Form(form): Form<CustomerForm>,
) -> Result<Redirect, AppError> {
    let profile = manager(&user)?;
    let details = form.into_details()?;
    records::update_customer(state.session.backend(), profile, &customer_id, &details).await?;
    Ok(Redirect::to(Destination::Customers.path()))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(customer_id): Path<String>,
) -> Result<Redirect, AppError> {
    let profile = manager(&user)?;
    records::delete_customer(state.session.backend(), profile, &customer_id).await?;
    Ok(Redirect::to(Destination::Customers.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_accept_blank_and_decimal_comma() {
        assert_eq!(coordinate("  ", 90.0).unwrap(), None);
        assert_eq!(coordinate("40,99", 90.0).unwrap(), Some(40.99));
        assert_eq!(coordinate("-29.1", 180.0).unwrap(), Some(-29.1));
        assert!(coordinate("91", 90.0).is_err());
        assert!(coordinate("north", 90.0).is_err());
        assert!(coordinate("NaN", 90.0).is_err());
    }
}

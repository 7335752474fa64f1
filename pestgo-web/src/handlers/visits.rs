use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Form,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use super::customers::SearchQuery;
use super::{manager, optional, Chrome};
use crate::access::Destination;
use crate::i18n::Localizer;
use crate::middleware::CurrentUser;
use crate::models::{Customer, Visit, VisitInput, VisitStatus};
use crate::services::records;
use crate::AppState;

#[derive(Template)]
#[template(path = "visits.html")]
pub struct VisitsTemplate {
    pub i18n: Localizer,
    pub chrome: Chrome,
    pub visits: Vec<Visit>,
    /// Choices for the customer picker.
    pub customers: Vec<Customer>,
    pub statuses: [VisitStatus; 3],
    pub term: String,
    pub can_manage: bool,
    pub today: String,
}

#[derive(Deserialize, Validate)]
pub struct VisitForm {
    #[validate(length(min = 1))]
    pub customer_id: String,
    pub visit_date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub visit_type: String,
    pub status: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: String,
}

impl VisitForm {
    fn into_input(self) -> Result<VisitInput, AppError> {
        self.validate()?;

        let visit_date = self.visit_date.trim();
        NaiveDate::parse_from_str(visit_date, "%Y-%m-%d").map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!("Invalid visit date: {}", visit_date))
        })?;
        let start_time = time_of_day(&self.start_time)?;
        let end_time = time_of_day(&self.end_time)?;
        let status = VisitStatus::parse(&self.status).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unsupported visit status: {}", self.status))
        })?;

        Ok(VisitInput {
            customer_id: self.customer_id.trim().to_string(),
            visit_date: visit_date.to_string(),
            start_time,
            end_time,
            visit_type: optional(&self.visit_type),
            status,
            notes: optional(&self.notes),
            created_by_company_id: None,
        })
    }
}

/// `HH:MM` (or `HH:MM:SS`), blank for none.
fn time_of_day(value: &str) -> Result<Option<String>, AppError> {
    let Some(value) = optional(value) else {
        return Ok(None);
    };
    NaiveTime::parse_from_str(&value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
        .map(|_| Some(value.clone()))
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid time: {}", value)))
}

pub async fn list_visits(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<VisitsTemplate, AppError> {
    let identity = user.identity();
    let can_manage = identity
        .role()
        .is_some_and(|role| role.can_manage_customers());

    let (visits, customers) = match &identity.profile {
        Some(profile) => {
            let backend = state.session.backend();
            let visits = records::list_visits(backend, profile, &query.q).await?;
            let customers = if can_manage {
                records::list_customers(backend, profile, "").await?
            } else {
                Vec::new()
            };
            (visits, customers)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(VisitsTemplate {
        i18n: state.language.localizer(),
        chrome: Chrome::new(identity, Destination::Visits),
        visits,
        customers,
        statuses: VisitStatus::SELECTABLE,
        term: query.q,
        can_manage,
        today: chrono::Local::now().format("%Y-%m-%d").to_string(),
    })
}

pub async fn create_visit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VisitForm>,
) -> Result<Redirect, AppError> {
    let profile = manager(&user)?;
    let input = form.into_input()?;
    records::create_visit(state.session.backend(), profile, &input).await?;
    Ok(Redirect::to(Destination::Visits.path()))
}

pub async fn update_visit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(visit_id): Path<String>,
    Form(form): Form<VisitForm>,
) -> Result<Redirect, AppError> {
    let profile = manager(&user)?;
    let input = form.into_input()?;
    records::update_visit(state.session.backend(), profile, &visit_id, &input).await?;
    Ok(Redirect::to(Destination::Visits.path()))
}

pub async fn delete_visit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(visit_id): Path<String>,
) -> Result<Redirect, AppError> {
    let profile = manager(&user)?;
    records::delete_visit(state.session.backend(), profile, &visit_id).await?;
    Ok(Redirect::to(Destination::Visits.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(visit_date: &str, start_time: &str, status: &str) -> VisitForm {
        VisitForm {
            customer_id: "c1".to_string(),
            visit_date: visit_date.to_string(),
            start_time: start_time.to_string(),
            end_time: String::new(),
            visit_type: "  ".to_string(),
            status: status.to_string(),
            notes: "Kitchen".to_string(),
        }
    }

    #[test]
    fn test_form_becomes_visit_input() {
        let input = form("2024-06-01", "09:30", "completed").into_input().unwrap();
        assert_eq!(input.visit_date, "2024-06-01");
        assert_eq!(input.start_time.as_deref(), Some("09:30"));
        assert_eq!(input.end_time, None);
        assert_eq!(input.visit_type, None);
        assert_eq!(input.status, VisitStatus::Completed);
        assert_eq!(input.notes.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn test_form_rejects_bad_values() {
        assert!(form("01.06.2024", "", "planned").into_input().is_err());
        assert!(form("2024-06-01", "25:00", "planned").into_input().is_err());
        assert!(form("2024-06-01", "", "unknown").into_input().is_err());
    }
}

//! Role-scoped reads and writes behind the dashboard, customer and visit pages.

use serde::Deserialize;
use std::collections::HashMap;

use super::backend::{BackendError, RemoteService};
use super::rows::{self, Rows};
use crate::models::{
    Customer, CustomerDetails, NewCustomer, Profile, Role, Visit, VisitCustomer, VisitInput,
};

pub const CUSTOMERS_TABLE: &str = "customers";
pub const VISITS_TABLE: &str = "visits";
pub const SERVICE_REQUESTS_TABLE: &str = "service_requests";
pub const OPERATORS_TABLE: &str = "operators";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Only shown to administrators and companies.
    pub total_customers: Option<u64>,
    pub total_visits: u64,
    pub pending_requests: u64,
    pub completed_visits: u64,
}

/// Column and value every dashboard count is filtered by, or `None` for an
/// unscoped (admin) view.
fn activity_scope(profile: &Profile) -> Option<(&'static str, String)> {
    match profile.role {
        Role::Company => profile
            .company_id
            .clone()
            .map(|id| ("company_id", id)),
        Role::Operator => Some(("operator_id", profile.id.clone())),
        Role::Customer | Role::CustomerBranch | Role::Unknown => {
            Some(("customer_id", profile.id.clone()))
        }
        Role::Admin => None,
    }
}

fn scoped<'a>(
    backend: &'a dyn RemoteService,
    table: &str,
    scope: &Option<(&'static str, String)>,
) -> Rows<'a> {
    let rows = Rows::from(backend, table).select("id");
    match scope {
        Some((column, value)) => rows.eq(column, value),
        None => rows,
    }
}

/// Counters for the dashboard. A company without an affiliation, like a
/// missing profile, sees zeros.
pub async fn dashboard_stats(
    backend: &dyn RemoteService,
    profile: Option<&Profile>,
) -> Result<DashboardStats, BackendError> {
    let Some(profile) = profile else {
        return Ok(DashboardStats::default());
    };
    if profile.role == Role::Company && profile.company_id.is_none() {
        return Ok(DashboardStats::default());
    }

    let scope = activity_scope(profile);

    let total_customers = match profile.role {
        Role::Admin => Some(Rows::from(backend, CUSTOMERS_TABLE).count().await?),
        Role::Company => Some(
            Rows::from(backend, CUSTOMERS_TABLE)
                .eq("created_by_company_id", profile.company_id.as_deref().unwrap_or_default())
                .count()
                .await?,
        ),
        _ => None,
    };

    let (total_visits, completed_visits, pending_requests) = tokio::try_join!(
        scoped(backend, VISITS_TABLE, &scope).count(),
        scoped(backend, VISITS_TABLE, &scope)
            .eq("status", "completed")
            .count(),
        scoped(backend, SERVICE_REQUESTS_TABLE, &scope)
            .eq("status", "pending")
            .count(),
    )?;

    Ok(DashboardStats {
        total_customers,
        total_visits,
        pending_requests,
        completed_visits,
    })
}

#[derive(Deserialize)]
struct OperatorCompany {
    company_id: Option<String>,
}

/// Customers visible to `profile`, newest first, narrowed by `term`.
pub async fn list_customers(
    backend: &dyn RemoteService,
    profile: &Profile,
    term: &str,
) -> Result<Vec<Customer>, BackendError> {
    let mut query = Rows::from(backend, CUSTOMERS_TABLE);

    match profile.role {
        Role::Admin => {}
        Role::Company => {
            query = query.eq(
                "created_by_company_id",
                profile.company_id.as_deref().unwrap_or_default(),
            );
        }
        Role::Operator => {
            let operator: Option<OperatorCompany> = Rows::from(backend, OPERATORS_TABLE)
                .select("company_id")
                .eq("profile_id", &profile.id)
                .maybe_single()
                .await?;
            match operator.and_then(|o| o.company_id) {
                Some(company_id) => query = query.eq("created_by_company_id", company_id),
                None => {
                    tracing::warn!(user_id = %profile.id, "Operator has no company, showing no customers");
                    return Ok(Vec::new());
                }
            }
        }
        Role::Customer | Role::CustomerBranch | Role::Unknown => {
            query = query.eq("profile_id", &profile.id);
        }
    }

    let customers: Vec<Customer> = query.order("created_at", false).fetch().await?;
    Ok(customers.into_iter().filter(|c| c.matches(term)).collect())
}

/// Rows a company may touch are the ones it created; other roles reaching
/// here are administrators and see everything.
fn owned<'a>(query: Rows<'a>, profile: &Profile) -> Rows<'a> {
    match profile.role {
        Role::Company => query.eq(
            "created_by_company_id",
            profile.company_id.as_deref().unwrap_or_default(),
        ),
        _ => query,
    }
}

fn company_of(profile: &Profile) -> Option<String> {
    match profile.role {
        Role::Company => profile.company_id.clone(),
        _ => None,
    }
}

pub async fn create_customer(
    backend: &dyn RemoteService,
    profile: &Profile,
    details: &CustomerDetails,
) -> Result<Customer, BackendError> {
    let customer = NewCustomer {
        company_name: details.company_name.clone(),
        address: details.address.clone(),
        latitude: details.latitude,
        longitude: details.longitude,
        created_by_company_id: company_of(profile),
    };

    let created: Customer = rows::insert(backend, CUSTOMERS_TABLE, &customer).await?;
    tracing::info!(customer_id = %created.id, "Customer created");
    Ok(created)
}

/// Overwrite the editable columns of one customer. Companies may only edit
/// their own.
pub async fn update_customer(
    backend: &dyn RemoteService,
    profile: &Profile,
    customer_id: &str,
    details: &CustomerDetails,
) -> Result<Customer, BackendError> {
    let mut updated: Vec<Customer> = owned(Rows::from(backend, CUSTOMERS_TABLE), profile)
        .eq("id", customer_id)
        .update(details)
        .await?;

    match updated.len() {
        0 => Err(BackendError::NotFound),
        _ => {
            tracing::info!(customer_id = %customer_id, "Customer updated");
            Ok(updated.remove(0))
        }
    }
}

/// Delete one customer. Companies may only remove their own.
pub async fn delete_customer(
    backend: &dyn RemoteService,
    profile: &Profile,
    customer_id: &str,
) -> Result<(), BackendError> {
    let removed = owned(Rows::from(backend, CUSTOMERS_TABLE), profile)
        .eq("id", customer_id)
        .delete()
        .await?;

    match removed {
        0 => Err(BackendError::NotFound),
        _ => {
            tracing::info!(customer_id = %customer_id, "Customer deleted");
            Ok(())
        }
    }
}

/// Visits in date order, company-scoped for companies, each carrying the
/// name and address of its customer, narrowed by `term`.
pub async fn list_visits(
    backend: &dyn RemoteService,
    profile: &Profile,
    term: &str,
) -> Result<Vec<Visit>, BackendError> {
    let (visits, customers) = tokio::try_join!(
        owned(Rows::from(backend, VISITS_TABLE), profile)
            .order("visit_date", true)
            .fetch::<Visit>(),
        list_customers(backend, profile, ""),
    )?;

    let customers: HashMap<String, Customer> =
        customers.into_iter().map(|c| (c.id.clone(), c)).collect();

    Ok(visits
        .into_iter()
        .map(|mut visit| {
            visit.customer = customers.get(&visit.customer_id).map(|c| VisitCustomer {
                company_name: c.company_name.clone(),
                address: c.address.clone(),
            });
            visit
        })
        .filter(|v| v.matches(term))
        .collect())
}

/// The visit's customer must exist and, for companies, be one of theirs.
async fn ensure_customer(
    backend: &dyn RemoteService,
    profile: &Profile,
    customer_id: &str,
) -> Result<(), BackendError> {
    let found: Option<serde_json::Value> = owned(Rows::from(backend, CUSTOMERS_TABLE), profile)
        .select("id")
        .eq("id", customer_id)
        .maybe_single()
        .await?;

    match found {
        Some(_) => Ok(()),
        None => {
            tracing::warn!(customer_id = %customer_id, user_id = %profile.id, "Visit refers to a customer out of reach");
            Err(BackendError::NotFound)
        }
    }
}

pub async fn create_visit(
    backend: &dyn RemoteService,
    profile: &Profile,
    input: &VisitInput,
) -> Result<Visit, BackendError> {
    ensure_customer(backend, profile, &input.customer_id).await?;

    let input = VisitInput {
        created_by_company_id: company_of(profile),
        ..input.clone()
    };
    let created: Visit = rows::insert(backend, VISITS_TABLE, &input).await?;
    tracing::info!(visit_id = %created.id, customer_id = %created.customer_id, "Visit created");
    Ok(created)
}

/// Rewrite one visit. Companies may only edit their own, and only point it at
/// their own customers.
pub async fn update_visit(
    backend: &dyn RemoteService,
    profile: &Profile,
    visit_id: &str,
    input: &VisitInput,
) -> Result<Visit, BackendError> {
    ensure_customer(backend, profile, &input.customer_id).await?;

    let input = VisitInput {
        created_by_company_id: None,
        ..input.clone()
    };
    let mut updated: Vec<Visit> = owned(Rows::from(backend, VISITS_TABLE), profile)
        .eq("id", visit_id)
        .update(&input)
        .await?;

    match updated.len() {
        0 => Err(BackendError::NotFound),
        _ => {
            tracing::info!(visit_id = %visit_id, "Visit updated");
            Ok(updated.remove(0))
        }
    }
}

pub async fn delete_visit(
    backend: &dyn RemoteService,
    profile: &Profile,
    visit_id: &str,
) -> Result<(), BackendError> {
    let removed = owned(Rows::from(backend, VISITS_TABLE), profile)
        .eq("id", visit_id)
        .delete()
        .await?;

    match removed {
        0 => Err(BackendError::NotFound),
        _ => {
            tracing::info!(visit_id = %visit_id, "Visit deleted");
            Ok(())
        }
    }
}

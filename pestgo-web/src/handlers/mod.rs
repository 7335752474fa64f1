//! Page, form and service route handlers.

pub mod app;
pub mod auth;
pub mod customers;
pub mod language;
pub mod metrics;
pub mod pages;
pub mod settings;
pub mod visits;

use service_core::error::AppError;

use crate::access::{navigation_for, Destination, NavigationItem};
use crate::middleware::CurrentUser;
use crate::models::Profile;
use crate::session::Identity;

/// Sidebar and header data shared by every signed-in page.
pub struct Chrome {
    pub nav: Vec<NavigationItem>,
    pub active: &'static str,
    pub user_name: String,
    pub user_email: String,
    pub role: &'static str,
}

impl Chrome {
    pub fn new(identity: &Identity, active: Destination) -> Self {
        Self {
            nav: navigation_for(identity.role()),
            active: active.path(),
            user_name: identity.display_name().to_string(),
            user_email: identity.email().to_string(),
            role: identity.role().map(|r| r.as_str()).unwrap_or_default(),
        }
    }
}

/// Profile of a user allowed to create, edit or remove customers and visits.
pub(crate) fn manager(user: &CurrentUser) -> Result<&Profile, AppError> {
    user.identity()
        .profile
        .as_ref()
        .filter(|p| p.role.can_manage_customers())
        .ok_or_else(|| {
            AppError::Forbidden(anyhow::anyhow!(
                "Only companies and administrators manage customers and visits"
            ))
        })
}

/// Blank form fields are absent values.
pub(crate) fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

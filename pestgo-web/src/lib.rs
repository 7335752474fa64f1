pub mod access;
pub mod config;
pub mod handlers;
pub mod i18n;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod startup;

use i18n::LanguageContext;
use session::AuthSession;
use std::sync::Arc;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<AuthSession>,
    pub language: Arc<LanguageContext>,
}

impl AppState {
    pub fn new(session: Arc<AuthSession>, language: Arc<LanguageContext>) -> Self {
        Self { session, language }
    }
}

#![allow(dead_code)]

use axum::Router;
use pestgo_web::config::SessionSettings;
use pestgo_web::i18n::{LanguageContext, Translator};
use pestgo_web::services::{LocalStorage, MockBackend, RemoteService};
use pestgo_web::session::{AuthSession, AuthState};
use pestgo_web::startup::build_router;
use pestgo_web::AppState;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const PASSWORD: &str = "secret123";

pub fn session_settings() -> SessionSettings {
    SessionSettings {
        bootstrap_timeout_ms: 4000,
        settle_timeout_ms: 1500,
    }
}

pub fn start(backend: &Arc<MockBackend>) -> Arc<AuthSession> {
    let remote: Arc<dyn RemoteService> = backend.clone();
    AuthSession::start(remote, session_settings())
}

/// Wait until no lookup is in flight.
pub async fn resolved(session: &AuthSession) -> AuthState {
    let mut state = session.watch();
    let wait = async {
        loop {
            {
                let current = state.borrow_and_update();
                if !current.resolving {
                    return current.clone();
                }
            }
            state.changed().await.expect("session dropped");
        }
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .expect("session never resolved")
}

/// Identity with a profile row of the given role.
pub fn add_account(backend: &MockBackend, email: &str, role: &str, company_id: Option<&str>) -> String {
    let id = backend.add_user(email, PASSWORD);
    backend.seed(
        "profiles",
        vec![json!({
            "id": id,
            "email": email,
            "full_name": "Test Account",
            "role": role,
            "company_id": company_id,
            "currency": "TRY",
        })],
    );
    id
}

pub async fn app(backend: &Arc<MockBackend>) -> (Router, Arc<AuthSession>) {
    let session = start(backend);
    let translator = Arc::new(Translator::embedded().expect("embedded translations"));
    let language = Arc::new(LanguageContext::load(translator, Arc::new(LocalStorage::in_memory())).await);
    let router = build_router(AppState::new(Arc::clone(&session), language));
    (router, session)
}

use askama::Template;
use axum::{extract::State, http::Uri, response::Redirect};

use super::Chrome;
use crate::access::{routes::HOME_PATH, Destination};
use crate::i18n::Localizer;
use crate::middleware::CurrentUser;
use crate::services::records::{self, DashboardStats};
use crate::AppState;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub i18n: Localizer,
    pub chrome: Chrome,
    pub stats: DashboardStats,
    pub profile_missing: bool,
}

pub async fn dashboard(State(state): State<AppState>, user: CurrentUser) -> DashboardTemplate {
    let identity = user.identity();

    // Counter failures leave zeros on screen
    let stats = match records::dashboard_stats(state.session.backend(), identity.profile.as_ref())
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(user_id = %identity.user_id(), error = %e, "Failed to load dashboard counters");
            DashboardStats::default()
        }
    };

    DashboardTemplate {
        i18n: state.language.localizer(),
        chrome: Chrome::new(identity, Destination::Home),
        stats,
        profile_missing: identity.profile.is_none(),
    }
}

/// Unmatched paths land on home; the guard takes it from there.
pub async fn fallback(uri: Uri) -> Redirect {
    tracing::debug!(path = %uri.path(), "Unmatched path");
    Redirect::to(HOME_PATH)
}

pub async fn health_check() -> &'static str {
    "OK"
}

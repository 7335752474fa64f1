use askama::Template;
use axum::{extract::State, http::Uri};

use super::Chrome;
use crate::access::Destination;
use crate::i18n::Localizer;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Destinations without a dedicated screen yet.
#[derive(Template)]
#[template(path = "placeholder.html")]
pub struct PlaceholderTemplate {
    pub i18n: Localizer,
    pub chrome: Chrome,
    pub title_key: &'static str,
}

pub async fn placeholder(
    State(state): State<AppState>,
    user: CurrentUser,
    uri: Uri,
) -> PlaceholderTemplate {
    let destination = Destination::owning(uri.path()).unwrap_or(Destination::Home);
    PlaceholderTemplate {
        i18n: state.language.localizer(),
        chrome: Chrome::new(user.identity(), destination),
        title_key: destination.label_key(),
    }
}

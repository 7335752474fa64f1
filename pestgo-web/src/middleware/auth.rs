use askama::Template;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::access::{evaluate, routes::SIGN_IN_PATH, Access, Destination};
use crate::i18n::Localizer;
use crate::session::Identity;
use crate::AppState;

#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub i18n: Localizer,
}

/// Runs the access guard in front of every page route.
///
/// While the session is resolving a self-refreshing loading page is served
/// in place of the page; nothing is redirected until the state settles.
/// Form submissions are refused with a 503 and `Retry-After`.
pub async fn access_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let destination = Destination::owning(&path);
    let auth = state.session.state();

    match evaluate(&auth, destination) {
        Access::Authorized => next.run(request).await,
        Access::Resolving => {
            let loading = LoadingTemplate {
                i18n: state.language.localizer(),
            };
            if request.method() == Method::GET || request.method() == Method::HEAD {
                tracing::debug!(path = %path, "Session still resolving, serving loading page");
                loading.into_response()
            } else {
                tracing::info!(path = %path, method = %request.method(), "Session still resolving, refusing submission");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [(header::RETRY_AFTER, "1")],
                    loading,
                )
                    .into_response()
            }
        }
        Access::Redirect(to) => {
            tracing::debug!(path = %path, to = %to, phase = ?auth.phase(), "Access redirect");
            Redirect::to(to).into_response()
        }
    }
}

/// Resolved identity of the signed-in user.
///
/// Page routes sit behind [`access_guard`], so rejection only happens if the
/// session ended between the guard and the handler.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl CurrentUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match state.session.state().identity {
            Some(identity) => Ok(CurrentUser(identity)),
            None => Err(Redirect::to(SIGN_IN_PATH).into_response()),
        }
    }
}

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use validator::Validate;

use crate::access::routes::{HOME_PATH, SIGN_IN_PATH};
use crate::i18n::Localizer;
use crate::models::Role;
use crate::session::SessionError;
use crate::AppState;

#[derive(Template)]
#[template(path = "signin.html")]
pub struct SignInTemplate {
    pub i18n: Localizer,
    pub email: String,
    pub error: Option<&'static str>,
    pub notice: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignUpTemplate {
    pub i18n: Localizer,
    pub email: String,
    pub full_name: String,
    pub role: &'static str,
    pub error: Option<&'static str>,
}

#[derive(Deserialize, Validate)]
pub struct SignInForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct SignUpForm {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInQuery {
    #[serde(default)]
    pub registered: Option<String>,
}

pub async fn signin_page(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
) -> SignInTemplate {
    SignInTemplate {
        i18n: state.language.localizer(),
        email: String::new(),
        error: None,
        notice: query.registered.map(|_| "auth.signUpSucceeded"),
    }
}

pub async fn signup_page(State(state): State<AppState>) -> SignUpTemplate {
    SignUpTemplate {
        i18n: state.language.localizer(),
        email: String::new(),
        full_name: String::new(),
        role: Role::Customer.as_str(),
        error: None,
    }
}

pub async fn signin_handler(
    State(state): State<AppState>,
    Form(form): Form<SignInForm>,
) -> Response {
    let rejected = |error: &'static str| {
        let template = SignInTemplate {
            i18n: state.language.localizer(),
            email: form.email.clone(),
            error: Some(error),
            notice: None,
        };
        (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
    };

    if form.validate().is_err() {
        return rejected("auth.invalidForm");
    }

    if let Err(e) = state.session.sign_in(form.email.trim(), &form.password).await {
        return rejected(if e.is_invalid_credentials() {
            "auth.invalidCredentials"
        } else {
            "auth.serviceUnavailable"
        });
    }

    // The identity is published by the notification listener
    let settled = state
        .session
        .settle(state.session.settings().settle_timeout())
        .await;
    if settled.is_signed_in() {
        tracing::info!(user_id = ?settled.identity.as_ref().map(|i| i.user_id()), "User signed in");
    } else {
        tracing::warn!("Sign-in accepted but session not yet published");
    }

    Redirect::to(HOME_PATH).into_response()
}

pub async fn signup_handler(
    State(state): State<AppState>,
    Form(form): Form<SignUpForm>,
) -> Response {
    let role = match form.role.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Role::self_service(value).map(Some).ok_or(()),
    };

    let rejected = |error: &'static str| {
        let template = SignUpTemplate {
            i18n: state.language.localizer(),
            email: form.email.clone(),
            full_name: form.full_name.clone(),
            role: role
                .ok()
                .flatten()
                .unwrap_or(Role::Customer)
                .as_str(),
            error: Some(error),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
    };

    if form.validate().is_err() || form.full_name.trim().is_empty() {
        return rejected("auth.invalidForm");
    }
    if form.password != form.confirm_password {
        return rejected("auth.passwordMismatch");
    }
    let Ok(role) = role else {
        return rejected("auth.invalidForm");
    };

    match state
        .session
        .sign_up(form.email.trim(), &form.password, form.full_name.trim(), role)
        .await
    {
        Ok(_) => Redirect::to(&format!("{}?registered=1", SIGN_IN_PATH)).into_response(),
        Err(SessionError::ProfileCreation { .. }) => rejected("auth.profileCreationFailed"),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            rejected("auth.signUpFailed")
        }
    }
}

/// Always lands on the sign-in page, even if the remote call fails.
pub async fn signout_handler(State(state): State<AppState>) -> Redirect {
    if let Err(e) = state.session.sign_out().await {
        tracing::error!(error = %e, "Remote sign-out failed");
    }
    Redirect::to(SIGN_IN_PATH)
}

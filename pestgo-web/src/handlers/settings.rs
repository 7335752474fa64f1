use askama::Template;
use axum::{
    extract::{Query, State},
    response::Redirect,
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use super::Chrome;
use crate::access::Destination;
use crate::i18n::Localizer;
use crate::middleware::CurrentUser;
use crate::models::{Currency, Profile, ProfileUpdate};
use crate::AppState;

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub i18n: Localizer,
    pub chrome: Chrome,
    pub profile: Option<Profile>,
    pub currencies: [Currency; 4],
    pub saved: bool,
}

#[derive(Deserialize)]
pub struct SettingsQuery {
    #[serde(default)]
    pub saved: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(max = 32))]
    #[serde(default)]
    pub phone: String,
    pub currency: String,
}

impl ProfileForm {
    fn into_update(self) -> Result<ProfileUpdate, AppError> {
        let currency = Currency::parse(&self.currency).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unsupported currency: {}", self.currency))
        })?;
        Ok(ProfileUpdate {
            full_name: Some(self.full_name.trim().to_string()),
            phone: Some(self.phone.trim().to_string()),
            currency: Some(currency),
        })
    }
}

pub async fn settings_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SettingsQuery>,
) -> SettingsTemplate {
    let identity = user.identity();
    SettingsTemplate {
        i18n: state.language.localizer(),
        chrome: Chrome::new(identity, Destination::Settings),
        profile: identity.profile.clone(),
        currencies: Currency::ALL,
        saved: query.saved.is_some(),
    }
}

pub async fn update_settings(
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, AppError> {
    form.validate()?;
    let changes = form.into_update()?;
    state.session.update_profile(&changes).await?;
    Ok(Redirect::to("/settings?saved=1"))
}

use super::backend::{BackendError, RemoteService};
use super::rows::{self, Rows};
use crate::models::{NewProfile, Profile, ProfileUpdate};

pub const PROFILES_TABLE: &str = "profiles";

/// Profile row for `user_id`; a missing row is `Ok(None)`.
pub async fn fetch_profile(
    backend: &dyn RemoteService,
    user_id: &str,
) -> Result<Option<Profile>, BackendError> {
    Rows::from(backend, PROFILES_TABLE)
        .eq("id", user_id)
        .maybe_single()
        .await
}

pub async fn create_profile(
    backend: &dyn RemoteService,
    profile: &NewProfile,
) -> Result<Profile, BackendError> {
    rows::insert(backend, PROFILES_TABLE, profile).await
}

pub async fn update_profile(
    backend: &dyn RemoteService,
    user_id: &str,
    changes: &ProfileUpdate,
) -> Result<Profile, BackendError> {
    let mut updated: Vec<Profile> = Rows::from(backend, PROFILES_TABLE)
        .eq("id", user_id)
        .update(changes)
        .await?;

    if updated.len() != 1 {
        return Err(BackendError::NotFound);
    }
    Ok(updated.remove(0))
}

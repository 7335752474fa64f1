use service_core::error::AppError;
use thiserror::Error;

use crate::services::BackendError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Credential or service failure during sign-in, sign-up or sign-out.
    #[error("Authentication failed: {0}")]
    Auth(#[source] BackendError),

    /// Profile lookup failed. Non-fatal during bootstrap.
    #[error("Profile lookup failed: {0}")]
    ProfileFetch(#[source] BackendError),

    #[error("Profile update failed: {0}")]
    ProfileUpdate(#[source] BackendError),

    /// The identity exists remotely but its profile row could not be written.
    #[error("Account {user_id} was created but its profile could not be stored: {source}")]
    ProfileCreation {
        user_id: String,
        #[source]
        source: BackendError,
    },
}

impl SessionError {
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, SessionError::Auth(BackendError::InvalidCredentials))
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid login credentials"))
            }
            BackendError::NoSession => AppError::Unauthorized(anyhow::anyhow!("Not signed in")),
            BackendError::NotFound => AppError::NotFound(anyhow::anyhow!("Row not found")),
            BackendError::Storage(msg) => AppError::InternalError(anyhow::anyhow!(msg)),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Auth(BackendError::InvalidCredentials) => {
                AppError::AuthError(anyhow::anyhow!("Invalid login credentials"))
            }
            SessionError::Auth(e) => AppError::AuthError(anyhow::Error::new(e)),
            SessionError::ProfileFetch(e) => AppError::BadGateway(e.to_string()),
            SessionError::ProfileUpdate(BackendError::NotFound) => {
                AppError::NotFound(anyhow::anyhow!("Profile not found"))
            }
            SessionError::ProfileUpdate(e) => AppError::BadGateway(e.to_string()),
            e @ SessionError::ProfileCreation { .. } => AppError::BadGateway(e.to_string()),
        }
    }
}

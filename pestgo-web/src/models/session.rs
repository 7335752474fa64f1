use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity as reported by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Remote-issued proof of authentication for one identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: RemoteUser,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    /// True when the access token expires within `leeway` from now.
    pub fn expires_within(&self, leeway: Duration) -> bool {
        self.expires_at <= Utc::now() + leeway
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl AuthChangeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthChangeEvent::SignedIn => "signed_in",
            AuthChangeEvent::SignedOut => "signed_out",
            AuthChangeEvent::TokenRefreshed => "token_refreshed",
            AuthChangeEvent::UserUpdated => "user_updated",
        }
    }
}

/// Session-change notification pushed by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: AuthChangeEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthChangeEvent::SignedOut,
            session: None,
        }
    }

    /// Session carried by the notification, unless it reports a sign-out.
    pub fn active_session(&self) -> Option<&Session> {
        match self.event {
            AuthChangeEvent::SignedOut => None,
            _ => self.session.as_ref(),
        }
    }
}

//! Capability contract of the hosted backend-as-a-service.
//!
//! The session layer and the screens only talk to [`RemoteService`]; the
//! hosted implementation and the in-memory mock both satisfy it.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::{AuthChange, RemoteUser, Session};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Not signed in")]
    NoSession,

    #[error("Row not found")]
    NotFound,

    #[error("Undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Local storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Table read/write target: projection, `eq` predicates and ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
}

impl RowQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    /// True when `row` satisfies every `eq` predicate.
    ///
    /// Non-string columns compare by their JSON rendering, so `eq("count", "3")`
    /// matches the number 3.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(column, expected)| {
            match row.get(column) {
                Some(Value::String(actual)) => actual == expected,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *expected,
            }
        })
    }
}

/// Live feed of session-change notifications. Dropping it unsubscribes.
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    pub fn new(receiver: broadcast::Receiver<AuthChange>) -> Self {
        Self { receiver }
    }

    /// Next notification, or `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session notifications dropped, continuing");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Current session, restored or refreshed as needed. `Ok(None)` when signed out.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Identity behind the current session, validated remotely.
    async fn get_user(&self) -> Result<Option<RemoteUser>, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<RemoteUser, BackendError>;

    /// Invalidate the session remotely. Local session state is dropped even
    /// when the remote call fails.
    async fn sign_out(&self) -> Result<(), BackendError>;

    fn subscribe(&self) -> AuthSubscription;

    async fn select(&self, query: &RowQuery) -> Result<Vec<Value>, BackendError>;

    async fn count(&self, query: &RowQuery) -> Result<u64, BackendError>;

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError>;

    async fn update(&self, query: &RowQuery, patch: Value) -> Result<Vec<Value>, BackendError>;

    async fn delete(&self, query: &RowQuery) -> Result<u64, BackendError>;
}

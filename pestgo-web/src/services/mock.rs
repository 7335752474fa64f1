use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::backend::{AuthSubscription, BackendError, RemoteService, RowQuery};
use crate::models::{AuthChange, RemoteUser, Session};

#[derive(Clone)]
struct MockUser {
    id: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct MockState {
    users: HashMap<String, MockUser>,
    tables: HashMap<String, Vec<Value>>,
    session: Option<Session>,
}

#[derive(Default)]
struct Faults {
    hang_session_lookup: AtomicBool,
    hang_profile_reads: AtomicBool,
    profile_read_delay_ms: AtomicU64,
    fail_profile_reads: AtomicBool,
    fail_profile_inserts: AtomicBool,
    fail_sign_out: AtomicBool,
}

/// In-memory [`RemoteService`] with switchable faults, used by tests and
/// local demos.
pub struct MockBackend {
    state: Mutex<MockState>,
    faults: Faults,
    changes: broadcast::Sender<AuthChange>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(MockState::default()),
            faults: Faults::default(),
            changes,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an identity and return its id.
    pub fn add_user(&self, email: &str, password: &str) -> String {
        let user = MockUser {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let id = user.id.clone();
        self.state().users.insert(email.to_string(), user);
        id
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.state()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state().tables.get(table).cloned().unwrap_or_default()
    }

    /// Pretend a session survived from a previous run.
    pub fn restore_session_for(&self, email: &str) -> Option<Session> {
        let mut state = self.state();
        let user = state.users.get(email)?.clone();
        let session = issue_session(&user);
        state.session = Some(session.clone());
        Some(session)
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state().session.clone()
    }

    /// Push a notification as if the remote service had sent it.
    pub fn emit(&self, change: AuthChange) {
        let _ = self.changes.send(change);
    }

    pub fn hang_session_lookup(&self, enabled: bool) {
        self.faults
            .hang_session_lookup
            .store(enabled, AtomicOrdering::SeqCst);
    }

    pub fn hang_profile_reads(&self, enabled: bool) {
        self.faults
            .hang_profile_reads
            .store(enabled, AtomicOrdering::SeqCst);
    }

    /// Slow profile reads down without hanging them; zero turns it off.
    pub fn delay_profile_reads(&self, millis: u64) {
        self.faults
            .profile_read_delay_ms
            .store(millis, AtomicOrdering::SeqCst);
    }

    pub fn fail_profile_reads(&self, enabled: bool) {
        self.faults
            .fail_profile_reads
            .store(enabled, AtomicOrdering::SeqCst);
    }

    pub fn fail_profile_inserts(&self, enabled: bool) {
        self.faults
            .fail_profile_inserts
            .store(enabled, AtomicOrdering::SeqCst);
    }

    pub fn fail_sign_out(&self, enabled: bool) {
        self.faults
            .fail_sign_out
            .store(enabled, AtomicOrdering::SeqCst);
    }

    fn is_set(flag: &AtomicBool) -> bool {
        flag.load(AtomicOrdering::SeqCst)
    }
}

fn issue_session(user: &MockUser) -> Session {
    Session {
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Uuid::new_v4().to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        user: RemoteUser {
            id: user.id.clone(),
            email: user.email.clone(),
        },
    }
}

/// Strings lexically, numbers numerically, missing and null last.
fn compare_column(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let wanted: Vec<&str> = columns.split(',').map(str::trim).collect();
    match row {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(key, _)| wanted.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

#[async_trait]
impl RemoteService for MockBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        if Self::is_set(&self.faults.hang_session_lookup) {
            std::future::pending::<()>().await;
        }
        Ok(self.current_session())
    }

    async fn get_user(&self) -> Result<Option<RemoteUser>, BackendError> {
        Ok(self.current_session().map(|s| s.user))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let session = {
            let mut state = self.state();
            let user = state
                .users
                .get(email)
                .filter(|u| u.password == password)
                .cloned()
                .ok_or(BackendError::InvalidCredentials)?;
            let session = issue_session(&user);
            state.session = Some(session.clone());
            session
        };

        self.emit(AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<RemoteUser, BackendError> {
        let mut state = self.state();
        if state.users.contains_key(email) {
            return Err(BackendError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let user = MockUser {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let remote = RemoteUser {
            id: user.id.clone(),
            email: user.email.clone(),
        };
        state.users.insert(email.to_string(), user);
        Ok(remote)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.state().session = None;
        self.emit(AuthChange::signed_out());

        if Self::is_set(&self.faults.fail_sign_out) {
            return Err(BackendError::Rejected {
                status: 503,
                message: "logout endpoint unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.changes.subscribe())
    }

    async fn select(&self, query: &RowQuery) -> Result<Vec<Value>, BackendError> {
        if query.table == "profiles" {
            if Self::is_set(&self.faults.hang_profile_reads) {
                std::future::pending::<()>().await;
            }
            let delay = self.faults.profile_read_delay_ms.load(AtomicOrdering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }
            if Self::is_set(&self.faults.fail_profile_reads) {
                return Err(BackendError::Rejected {
                    status: 500,
                    message: "profiles unavailable".to_string(),
                });
            }
        }

        let mut rows: Vec<Value> = self
            .state()
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_column(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows.iter().map(|row| project(row, &query.columns)).collect())
    }

    async fn count(&self, query: &RowQuery) -> Result<u64, BackendError> {
        Ok(self
            .state()
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, mut row: Value) -> Result<Value, BackendError> {
        if table == "profiles" && Self::is_set(&self.faults.fail_profile_inserts) {
            return Err(BackendError::Rejected {
                status: 403,
                message: "new row violates row-level security policy".to_string(),
            });
        }

        if let Value::Object(fields) = &mut row {
            fields
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            fields
                .entry("created_at")
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        }

        self.state()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, query: &RowQuery, patch: Value) -> Result<Vec<Value>, BackendError> {
        let Value::Object(changes) = patch else {
            return Err(BackendError::Rejected {
                status: 400,
                message: "patch must be an object".to_string(),
            });
        };

        let mut state = self.state();
        let Some(rows) = state.tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| query.matches(r)) {
            if let Value::Object(fields) = row {
                for (key, value) in &changes {
                    fields.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, query: &RowQuery) -> Result<u64, BackendError> {
        let mut state = self.state();
        let Some(rows) = state.tables.get_mut(&query.table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok((before - rows.len()) as u64)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use service_core::observability::{TracedClientExt, TracedRequest};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::backend::{AuthSubscription, BackendError, RemoteService, RowQuery};
use super::storage::{LocalStorage, SESSION_KEY};
use crate::config::BackendSettings;
use crate::models::{AuthChange, AuthChangeEvent, RemoteUser, Session};

/// Refresh access tokens this long before they expire.
const REFRESH_LEEWAY_SECS: i64 = 30;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: RemoteUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// [`RemoteService`] backed by the hosted auth (`/auth/v1`) and row
/// (`/rest/v1`) REST endpoints.
///
/// The current session is kept in memory and mirrored to local storage so a
/// restart can pick it up again.
pub struct HostedBackend {
    client: Client,
    settings: BackendSettings,
    storage: Arc<LocalStorage>,
    current: RwLock<Option<Session>>,
    changes: broadcast::Sender<AuthChange>,
}

impl HostedBackend {
    pub fn new(settings: BackendSettings, storage: Arc<LocalStorage>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            client: Client::new(),
            settings,
            storage,
            current: RwLock::new(None),
            changes,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.settings.url.trim_end_matches('/'), path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.settings.url.trim_end_matches('/'), table)
    }

    fn anon_key(&self) -> &str {
        self.settings.anon_key.expose_secret()
    }

    /// Bearer for row calls: the session token, or the anon key when signed out.
    async fn bearer(&self) -> String {
        match self.current.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key().to_string(),
        }
    }

    fn notify(&self, change: AuthChange) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.changes.send(change);
    }

    async fn store_session(&self, session: &Session) {
        *self.current.write().await = Some(session.clone());
        match serde_json::to_string(session) {
            Ok(serialized) => {
                if let Err(e) = self.storage.set(SESSION_KEY, &serialized).await {
                    tracing::warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize session"),
        }
    }

    async fn clear_session(&self) {
        *self.current.write().await = None;
        if let Err(e) = self.storage.remove(SESSION_KEY).await {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
    }

    async fn restore_session(&self) -> Option<Session> {
        let stored = self.storage.get(SESSION_KEY).await?;
        match serde_json::from_str::<Session>(&stored) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                None
            }
        }
    }

    async fn token_request(&self, grant_type: &str, body: Value) -> Result<Session, BackendError> {
        let response = self
            .client
            .traced_post(&self.auth_url("/token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", self.anon_key())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            let error = rejected(response).await;
            tracing::debug!(error = %error, grant_type, "Token request refused");
            return Err(BackendError::InvalidCredentials);
        }

        let tokens: TokenResponse = ensure_success(response).await?.json().await?;
        Ok(tokens.into_session())
    }

    fn rest(&self, request: TracedRequest, bearer: &str) -> TracedRequest {
        request
            .header("apikey", self.anon_key())
            .bearer_auth(bearer)
    }
}

/// PostgREST query parameters for a [`RowQuery`].
fn rest_params(query: &RowQuery, include_select: bool) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(query.filters.len() + 2);
    if include_select {
        params.push(("select".to_string(), query.columns.clone()));
    }
    for (column, value) in &query.filters {
        params.push((column.clone(), format!("eq.{}", value)));
    }
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(rejected(response).await)
    }
}

async fn rejected(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .unwrap_or("request failed")
        .to_string();

    BackendError::Rejected { status, message }
}

#[async_trait]
impl RemoteService for HostedBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let current = self.current.read().await.clone();
        let session = match current {
            Some(session) => session,
            None => match self.restore_session().await {
                Some(session) => session,
                None => return Ok(None),
            },
        };

        if !session.expires_within(Duration::seconds(REFRESH_LEEWAY_SECS)) {
            *self.current.write().await = Some(session.clone());
            return Ok(Some(session));
        }

        tracing::info!(user_id = %session.user_id(), "Refreshing expired access token");
        match self
            .token_request(
                "refresh_token",
                serde_json::json!({ "refresh_token": session.refresh_token }),
            )
            .await
        {
            Ok(fresh) => {
                self.store_session(&fresh).await;
                self.notify(AuthChange {
                    event: AuthChangeEvent::TokenRefreshed,
                    session: Some(fresh.clone()),
                });
                Ok(Some(fresh))
            }
            Err(e) => {
                self.clear_session().await;
                Err(e)
            }
        }
    }

    async fn get_user(&self) -> Result<Option<RemoteUser>, BackendError> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };

        let response = self
            .client
            .traced_get(&self.auth_url("/user"))
            .header("apikey", self.anon_key())
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if response.status().as_u16() == 401 {
            return Ok(None);
        }

        Ok(Some(ensure_success(response).await?.json().await?))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let session = self
            .token_request(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        self.store_session(&session).await;
        tracing::info!(user_id = %session.user_id(), "Signed in");
        self.notify(AuthChange::signed_in(session.clone()));

        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<RemoteUser, BackendError> {
        let response = self
            .client
            .traced_post(&self.auth_url("/signup"))
            .header("apikey", self.anon_key())
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: Value = ensure_success(response).await?.json().await?;

        // Auto-confirmed projects answer with a session wrapping the user,
        // otherwise the user object comes back on its own. The account is not
        // signed in either way; the caller signs in explicitly.
        let user = body.get("user").cloned().unwrap_or(body);
        Ok(serde_json::from_value(user)?)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let token = self
            .current
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());

        let result = match token {
            Some(token) => {
                let outcome = self
                    .client
                    .traced_post(&self.auth_url("/logout"))
                    .header("apikey", self.anon_key())
                    .bearer_auth(token)
                    .send()
                    .await;
                match outcome {
                    Ok(response) => ensure_success(response).await.map(|_| ()),
                    Err(e) => Err(BackendError::from(e)),
                }
            }
            None => Ok(()),
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "Failed to revoke session during sign-out");
        }

        // Local session goes away regardless of the remote outcome
        self.clear_session().await;
        self.notify(AuthChange::signed_out());

        result
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.changes.subscribe())
    }

    async fn select(&self, query: &RowQuery) -> Result<Vec<Value>, BackendError> {
        let bearer = self.bearer().await;
        let response = self
            .rest(self.client.traced_get(&self.rest_url(&query.table)), &bearer)
            .query(&rest_params(query, true))
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    async fn count(&self, query: &RowQuery) -> Result<u64, BackendError> {
        let bearer = self.bearer().await;
        let response = self
            .rest(self.client.traced_head(&self.rest_url(&query.table)), &bearer)
            .header("Prefer", "count=exact")
            .query(&rest_params(query, true))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| BackendError::Rejected {
                status: response.status().as_u16(),
                message: "missing Content-Range in count response".to_string(),
            })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        let bearer = self.bearer().await;
        let response = self
            .rest(self.client.traced_post(&self.rest_url(table)), &bearer)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let mut rows: Vec<Value> = ensure_success(response).await?.json().await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, query: &RowQuery, patch: Value) -> Result<Vec<Value>, BackendError> {
        let bearer = self.bearer().await;
        let response = self
            .rest(self.client.traced_patch(&self.rest_url(&query.table)), &bearer)
            .header("Prefer", "return=representation")
            .query(&rest_params(query, false))
            .json(&patch)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete(&self, query: &RowQuery) -> Result<u64, BackendError> {
        let bearer = self.bearer().await;
        let response = self
            .rest(self.client.traced_delete(&self.rest_url(&query.table)), &bearer)
            .header("Prefer", "return=representation")
            .query(&rest_params(query, false))
            .send()
            .await?;

        let rows: Vec<Value> = ensure_success(response).await?.json().await?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::Order;
    use secrecy::Secret;

    #[test]
    fn test_rest_params_encode_filters_and_order() {
        let mut query = RowQuery::new("customers");
        query.filters.push(("created_by_company_id".to_string(), "co-1".to_string()));
        query.order = Some(Order {
            column: "created_at".to_string(),
            ascending: false,
        });

        assert_eq!(
            rest_params(&query, true),
            vec![
                ("select".to_string(), "*".to_string()),
                ("created_by_company_id".to_string(), "eq.co-1".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
        assert_eq!(rest_params(&query, false).len(), 2);
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
    }

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let tokens: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "user": { "id": "u1", "email": "a@example.com" }
        }))
        .unwrap();

        let session = tokens.into_session();
        assert_eq!(session.expires_at.timestamp(), 1_900_000_000);
        assert_eq!(session.user_id(), "u1");
    }

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let backend = HostedBackend::new(
            BackendSettings {
                url: "https://project.example.co/".to_string(),
                anon_key: Secret::new("anon".to_string()),
            },
            Arc::new(LocalStorage::in_memory()),
        );
        assert_eq!(backend.auth_url("/token"), "https://project.example.co/auth/v1/token");
        assert_eq!(backend.rest_url("profiles"), "https://project.example.co/rest/v1/profiles");
    }

    #[tokio::test]
    async fn test_restores_persisted_session() {
        let storage = Arc::new(LocalStorage::in_memory());
        let session = Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user: RemoteUser {
                id: "u1".to_string(),
                email: "a@example.com".to_string(),
            },
        };
        storage
            .set(SESSION_KEY, &serde_json::to_string(&session).unwrap())
            .await
            .unwrap();

        let backend = HostedBackend::new(
            BackendSettings {
                url: "http://127.0.0.1:9".to_string(),
                anon_key: Secret::new("anon".to_string()),
            },
            storage,
        );

        let restored = backend.get_session().await.unwrap();
        assert_eq!(restored, Some(session));
    }
}

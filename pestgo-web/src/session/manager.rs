use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::SessionError;
use super::state::{AuthEvent, AuthState, Identity};
use crate::config::SessionSettings;
use crate::models::{
    AuthChange, AuthChangeEvent, Currency, NewProfile, ProfileUpdate, RemoteUser, Role, Session,
};
use crate::services::metrics::record_auth_transition;
use crate::services::{profiles, AuthSubscription, BackendError, RemoteService};

/// Owner of the process-wide [`AuthState`].
///
/// `start` bootstraps the state once and keeps it current from the remote
/// service's session notifications until `shutdown`. Everything else reads the
/// state through [`AuthSession::state`] or [`AuthSession::watch`].
///
/// Session-change notifications are the authoritative writer. Every write made
/// by the listener or by a mutation bumps an epoch; the bootstrap lookup only
/// lands its result if no such write happened while it was in flight.
pub struct AuthSession {
    backend: Arc<dyn RemoteService>,
    state: watch::Sender<AuthState>,
    epoch: AtomicU64,
    alive: CancellationToken,
    settings: SessionSettings,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AuthSession {
    /// Subscribe to notifications, then spawn the bootstrap lookup and the
    /// listener. Must be called from within a Tokio runtime.
    pub fn start(backend: Arc<dyn RemoteService>, settings: SessionSettings) -> Arc<Self> {
        let (state, _) = watch::channel(AuthState::initial());
        let session = Arc::new(Self {
            backend,
            state,
            epoch: AtomicU64::new(0),
            alive: CancellationToken::new(),
            settings,
            tasks: Mutex::new(Vec::new()),
        });

        // Subscribe before bootstrapping so a sign-in racing the lookup is not lost
        let subscription = session.backend.subscribe();
        let epoch = session.epoch.load(Ordering::SeqCst);
        let listener = tokio::spawn(Arc::clone(&session).listen(subscription));
        let bootstrap = tokio::spawn(Arc::clone(&session).bootstrap(epoch));
        session.tasks().extend([listener, bootstrap]);

        session
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn backend(&self) -> &dyn RemoteService {
        self.backend.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn is_alive(&self) -> bool {
        !self.alive.is_cancelled()
    }

    /// Tear down: later writes become no-ops and background tasks are aborted.
    /// In-flight network requests are not cancelled remotely.
    pub fn shutdown(&self) {
        self.alive.cancel();
        for handle in self.tasks().drain(..) {
            handle.abort();
        }
        tracing::info!("Auth session shut down");
    }

    /// Check credentials remotely. The resulting identity arrives through the
    /// sign-in notification; use [`AuthSession::settle`] to wait for it.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), SessionError> {
        self.backend
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Sign-in rejected");
                SessionError::Auth(e)
            })?;

        tracing::info!("Sign-in accepted, waiting for session notification");
        Ok(())
    }

    /// Create the identity, then its profile row. A failed profile insert
    /// leaves the identity in place and fails the whole operation.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Option<Role>,
    ) -> Result<RemoteUser, SessionError> {
        let user = self
            .backend
            .sign_up(email, password)
            .await
            .map_err(SessionError::Auth)?;

        let profile = NewProfile {
            id: user.id.clone(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role: role.unwrap_or(Role::Customer),
            currency: Currency::Try,
        };

        if let Err(source) = profiles::create_profile(self.backend(), &profile).await {
            tracing::error!(
                user_id = %user.id,
                error = %source,
                "Identity created but profile insert failed"
            );
            return Err(SessionError::ProfileCreation {
                user_id: user.id,
                source,
            });
        }

        tracing::info!(user_id = %user.id, role = %profile.role, "Account created");
        Ok(user)
    }

    /// Invalidate remotely, then clear local state whatever the outcome.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let result = self.backend.sign_out().await;
        self.apply(AuthEvent::SignedOut);

        result.map_err(|e| {
            tracing::warn!(error = %e, "Remote sign-out failed, local session cleared anyway");
            SessionError::Auth(e)
        })
    }

    /// Re-read the profile of the current identity. Any failure evicts the
    /// identity rather than keeping stale data. A sign-out or notification
    /// landing while the reads are in flight wins over the reloaded profile.
    pub async fn refresh_user(&self) -> Result<(), SessionError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let Some(current) = self.state().identity else {
            return Ok(());
        };

        let user = match self.backend.get_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(self.evict(BackendError::NoSession)),
            Err(e) => return Err(self.evict(e)),
        };

        match profiles::fetch_profile(self.backend(), &user.id).await {
            Ok(profile) => {
                let identity = Identity {
                    session: current.session,
                    profile,
                };
                if !self.write(AuthEvent::Resolved(Some(identity)), Some(epoch)) {
                    tracing::debug!(user_id = %user.id, "Session changed during refresh, keeping newer state");
                }
                Ok(())
            }
            Err(e) => Err(self.evict(e)),
        }
    }

    /// Write profile changes for the signed-in user, then reload them.
    pub async fn update_profile(&self, changes: &ProfileUpdate) -> Result<(), SessionError> {
        let Some(identity) = self.state().identity else {
            return Err(SessionError::Auth(BackendError::NoSession));
        };
        if changes.is_empty() {
            return Ok(());
        }

        profiles::update_profile(self.backend(), identity.user_id(), changes)
            .await
            .map_err(SessionError::ProfileUpdate)?;
        tracing::info!(user_id = %identity.user_id(), "Profile updated");

        self.refresh_user().await
    }

    /// Wait, at most `limit`, until an identity is published and no lookup is
    /// in flight. Returns whatever state holds at that point.
    pub async fn settle(&self, limit: Duration) -> AuthState {
        let mut receiver = self.watch();
        let wait = async {
            loop {
                {
                    let state = receiver.borrow_and_update();
                    if !state.resolving && state.identity.is_some() {
                        return state.clone();
                    }
                }
                if receiver.changed().await.is_err() {
                    return receiver.borrow().clone();
                }
            }
        };

        match tokio::time::timeout(limit, wait).await {
            Ok(state) => state,
            Err(_) => {
                tracing::debug!("Session did not settle in time");
                self.state()
            }
        }
    }

    fn evict(&self, error: BackendError) -> SessionError {
        tracing::warn!(error = %error, "Profile refresh failed, clearing session");
        self.apply(AuthEvent::SignedOut);
        SessionError::ProfileFetch(error)
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Authoritative write; invalidates any bootstrap result still in flight.
    fn apply(&self, event: AuthEvent) {
        self.write(event, None);
    }

    /// Write `event` unless torn down, or unless `expected_epoch` is given and
    /// an authoritative write has happened since.
    fn write(&self, event: AuthEvent, expected_epoch: Option<u64>) -> bool {
        if self.alive.is_cancelled() {
            tracing::debug!(event = event.label(), "Ignoring session update after shutdown");
            return false;
        }

        let label = event.label();
        let applied = self.state.send_if_modified(|state| {
            match expected_epoch {
                Some(expected) if self.epoch.load(Ordering::SeqCst) != expected => return false,
                Some(_) => {}
                None => {
                    self.epoch.fetch_add(1, Ordering::SeqCst);
                }
            }
            let current = std::mem::take(state);
            *state = current.apply(event);
            true
        });

        if applied {
            record_auth_transition(label);
            tracing::debug!(event = label, "Session state updated");
        } else {
            tracing::debug!(event = label, "Stale session update skipped");
        }
        applied
    }

    async fn load_identity(&self, session: Session) -> Identity {
        match profiles::fetch_profile(self.backend(), session.user_id()).await {
            Ok(Some(profile)) => Identity {
                session,
                profile: Some(profile),
            },
            Ok(None) => {
                tracing::warn!(user_id = %session.user_id(), "No profile for session, continuing without one");
                Identity {
                    session,
                    profile: None,
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user_id(), error = %e, "Profile lookup failed, continuing without one");
                Identity {
                    session,
                    profile: None,
                }
            }
        }
    }

    async fn lookup_current(&self) -> Option<Identity> {
        match self.backend.get_session().await {
            Ok(Some(session)) => Some(self.load_identity(session).await),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, starting signed out");
                None
            }
        }
    }

    /// Lands its result only if nothing authoritative was written since `epoch`.
    async fn bootstrap(self: Arc<Self>, epoch: u64) {
        let deadline = self.settings.bootstrap_timeout();

        let lookup = self.lookup_current();
        tokio::pin!(lookup);

        let identity = tokio::select! {
            identity = &mut lookup => identity,
            _ = tokio::time::sleep(deadline) => {
                tracing::warn!(
                    timeout_ms = deadline.as_millis() as u64,
                    "Session bootstrap exceeded its deadline, leaving loading state"
                );
                self.write(AuthEvent::DeadlineElapsed, Some(epoch));
                lookup.await
            }
        };

        tracing::info!(signed_in = identity.is_some(), "Session bootstrap finished");
        self.write(AuthEvent::Resolved(identity), Some(epoch));
    }

    async fn listen(self: Arc<Self>, mut subscription: AuthSubscription) {
        loop {
            let change = tokio::select! {
                _ = self.alive.cancelled() => break,
                change = subscription.recv() => change,
            };

            match change {
                Some(change) => self.on_change(change).await,
                None => {
                    tracing::warn!("Session notification channel closed");
                    break;
                }
            }
        }
        subscription.unsubscribe();
    }

    async fn on_change(&self, change: AuthChange) {
        let event = change.event;
        let Some(session) = change.active_session().cloned() else {
            tracing::info!(event = event.as_str(), "Session ended");
            self.apply(AuthEvent::SignedOut);
            return;
        };

        // Token renewal for the same user keeps the profile already loaded
        if event == AuthChangeEvent::TokenRefreshed {
            if let Some(current) = self.state().identity {
                if current.user_id() == session.user_id() && current.profile.is_some() {
                    self.apply(AuthEvent::Resolved(Some(Identity {
                        session,
                        profile: current.profile,
                    })));
                    return;
                }
            }
        }

        tracing::info!(event = event.as_str(), user_id = %session.user_id(), "Session changed");
        self.apply(AuthEvent::ResolutionStarted);

        let deadline = self.settings.bootstrap_timeout();
        let identity = match tokio::time::timeout(deadline, self.load_identity(session.clone())).await
        {
            Ok(identity) => identity,
            Err(_) => {
                tracing::warn!(user_id = %session.user_id(), "Profile lookup timed out, continuing without one");
                Identity {
                    session,
                    profile: None,
                }
            }
        };

        self.apply(AuthEvent::Resolved(Some(identity)));
    }
}

use crate::models::{Profile, Role, Session};

/// Resolved identity: a live session and, ideally, its profile.
///
/// A missing profile is the degraded-but-signed-in case.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub session: Session,
    pub profile: Option<Profile>,
}

impl Identity {
    pub fn user_id(&self) -> &str {
        self.session.user_id()
    }

    pub fn email(&self) -> &str {
        self.session.email()
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn display_name(&self) -> &str {
        match &self.profile {
            Some(profile) => profile.display_name(),
            None => self.email(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub resolving: bool,
}

/// Everything that may change an [`AuthState`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A lookup (bootstrap or post-sign-in profile fetch) is in flight.
    ResolutionStarted,
    /// A lookup finished; `None` means no session.
    Resolved(Option<Identity>),
    SignedOut,
    /// The guard timer fired before the lookup finished.
    DeadlineElapsed,
}

impl AuthEvent {
    pub fn label(&self) -> &'static str {
        match self {
            AuthEvent::ResolutionStarted => "resolution_started",
            AuthEvent::Resolved(Some(_)) => "resolved_identity",
            AuthEvent::Resolved(None) => "resolved_absent",
            AuthEvent::SignedOut => "signed_out",
            AuthEvent::DeadlineElapsed => "deadline_elapsed",
        }
    }
}

/// Coarse view of an [`AuthState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Pending,
    Absent,
    SignedIn,
    Degraded,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initial()
    }
}

impl AuthState {
    /// State at process start: nothing known, bootstrap pending.
    pub fn initial() -> Self {
        Self {
            identity: None,
            resolving: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            identity: None,
            resolving: false,
        }
    }

    /// Pure transition function.
    pub fn apply(self, event: AuthEvent) -> AuthState {
        match event {
            AuthEvent::ResolutionStarted => AuthState {
                resolving: true,
                ..self
            },
            AuthEvent::Resolved(identity) => AuthState {
                identity,
                resolving: false,
            },
            AuthEvent::SignedOut => AuthState::signed_out(),
            AuthEvent::DeadlineElapsed => AuthState {
                resolving: false,
                ..self
            },
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.identity, self.resolving) {
            (_, true) => SessionPhase::Pending,
            (None, false) => SessionPhase::Absent,
            (Some(identity), false) if identity.profile.is_none() => SessionPhase::Degraded,
            (Some(_), false) => SessionPhase::SignedIn,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().and_then(Identity::role)
    }
}

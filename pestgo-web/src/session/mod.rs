//! Client-side authentication session: state, transitions and the
//! long-lived manager that keeps it in step with the remote service.

pub mod error;
pub mod manager;
pub mod state;

pub use error::SessionError;
pub use manager::AuthSession;
pub use state::{AuthEvent, AuthState, Identity, SessionPhase};

pub mod auth;
pub mod metrics;

pub use auth::{access_guard, CurrentUser};
pub use metrics::metrics_middleware;

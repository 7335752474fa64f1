//! Remote service access and client-side persistence.

pub mod backend;
pub mod hosted;
pub mod metrics;
pub mod mock;
pub mod profiles;
pub mod records;
pub mod rows;
pub mod storage;

pub use backend::{AuthSubscription, BackendError, RemoteService, RowQuery};
pub use hosted::HostedBackend;
pub use mock::MockBackend;
pub use rows::Rows;
pub use storage::LocalStorage;

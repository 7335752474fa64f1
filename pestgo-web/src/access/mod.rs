//! Route catalog, the per-request access guard and the role navigation map.

pub mod guard;
pub mod navigation;
pub mod routes;

pub use guard::{evaluate, Access};
pub use navigation::{navigation_for, NavigationItem};
pub use routes::Destination;

pub mod customer;
pub mod profile;
pub mod session;
pub mod visit;

pub use customer::{Customer, CustomerDetails, NewCustomer};
pub use profile::{Currency, NewProfile, Profile, ProfileUpdate, Role};
pub use session::{AuthChange, AuthChangeEvent, RemoteUser, Session};
pub use visit::{Visit, VisitCustomer, VisitInput, VisitStatus};

/// Case-insensitive substring match used by the list screens' search boxes.
pub(crate) fn contains_term(field: Option<&str>, term: &str) -> bool {
    field
        .map(|value| value.to_lowercase().contains(&term.to_lowercase()))
        .unwrap_or(false)
}

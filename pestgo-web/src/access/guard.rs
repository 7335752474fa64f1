use super::routes::{Destination, HOME_PATH, SIGN_IN_PATH};
use crate::session::AuthState;

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A lookup is in flight: show the loading page, do not redirect.
    Resolving,
    Authorized,
    Redirect(&'static str),
}

/// Stateless decision from the current state and requested destination.
/// `None` is an unmatched path and always goes home.
pub fn evaluate(state: &AuthState, destination: Option<Destination>) -> Access {
    let Some(destination) = destination else {
        return Access::Redirect(HOME_PATH);
    };

    if state.resolving {
        return Access::Resolving;
    }

    match (state.identity.is_some(), destination.is_public()) {
        (true, false) | (false, true) => Access::Authorized,
        (true, true) => Access::Redirect(HOME_PATH),
        (false, false) => Access::Redirect(SIGN_IN_PATH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::session::state::tests::identity;
    use crate::session::AuthState;

    fn signed_in(profile: bool) -> AuthState {
        let role = profile.then_some(Role::Company);
        AuthState {
            identity: Some(identity(role)),
            resolving: false,
        }
    }

    #[test]
    fn test_resolving_never_redirects() {
        let state = AuthState::initial();
        for destination in Destination::ALL {
            assert_eq!(evaluate(&state, Some(destination)), Access::Resolving);
        }
    }

    #[test]
    fn test_absent_identity_is_sent_to_sign_in() {
        let state = AuthState::signed_out();
        for destination in Destination::ALL {
            let expected = if destination.is_public() {
                Access::Authorized
            } else {
                Access::Redirect(SIGN_IN_PATH)
            };
            assert_eq!(evaluate(&state, Some(destination)), expected, "{:?}", destination);
        }
    }

    #[test]
    fn test_signed_in_users_are_kept_off_public_pages() {
        for state in [signed_in(true), signed_in(false)] {
            assert_eq!(evaluate(&state, Some(Destination::SignIn)), Access::Redirect(HOME_PATH));
            assert_eq!(evaluate(&state, Some(Destination::SignUp)), Access::Redirect(HOME_PATH));
            assert_eq!(evaluate(&state, Some(Destination::Customers)), Access::Authorized);
        }
    }

    #[test]
    fn test_unmatched_paths_go_home() {
        assert_eq!(evaluate(&AuthState::initial(), None), Access::Redirect(HOME_PATH));
        assert_eq!(evaluate(&AuthState::signed_out(), None), Access::Redirect(HOME_PATH));
    }
}

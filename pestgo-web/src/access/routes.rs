/// Every page the client can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Home,
    Customers,
    Visits,
    Operators,
    Equipment,
    Materials,
    Warehouse,
    ServiceRequests,
    Reports,
    Settings,
    Companies,
    Branches,
    SignIn,
    SignUp,
}

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const SIGN_UP_PATH: &str = "/auth/signup";
pub const HOME_PATH: &str = "/";

impl Destination {
    pub const ALL: [Destination; 14] = [
        Destination::Home,
        Destination::Customers,
        Destination::Visits,
        Destination::Operators,
        Destination::Equipment,
        Destination::Materials,
        Destination::Warehouse,
        Destination::ServiceRequests,
        Destination::Reports,
        Destination::Settings,
        Destination::Companies,
        Destination::Branches,
        Destination::SignIn,
        Destination::SignUp,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Destination::Home => HOME_PATH,
            Destination::Customers => "/customers",
            Destination::Visits => "/visits",
            Destination::Operators => "/operators",
            Destination::Equipment => "/equipment",
            Destination::Materials => "/materials",
            Destination::Warehouse => "/warehouse",
            Destination::ServiceRequests => "/service-requests",
            Destination::Reports => "/reports",
            Destination::Settings => "/settings",
            Destination::Companies => "/companies",
            Destination::Branches => "/branches",
            Destination::SignIn => SIGN_IN_PATH,
            Destination::SignUp => SIGN_UP_PATH,
        }
    }

    /// Exact match on the path; a single trailing slash is tolerated.
    pub fn from_path(path: &str) -> Option<Destination> {
        let path = match path.strip_suffix('/') {
            Some("") | None => path,
            Some(trimmed) => trimmed,
        };
        Self::ALL.into_iter().find(|d| d.path() == path)
    }

    /// Destination a request path belongs to: an exact match, or the page
    /// whose path prefixes it (`/customers/42/delete` belongs to customers).
    pub fn owning(path: &str) -> Option<Destination> {
        Self::from_path(path).or_else(|| {
            Self::ALL.into_iter().find(|d| {
                *d != Destination::Home
                    && path
                        .strip_prefix(d.path())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
        })
    }

    /// Reachable only while signed out.
    pub fn is_public(&self) -> bool {
        matches!(self, Destination::SignIn | Destination::SignUp)
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Destination::Home => "nav.dashboard",
            Destination::Customers => "nav.customers",
            Destination::Visits => "nav.visits",
            Destination::Operators => "nav.operators",
            Destination::Equipment => "nav.equipment",
            Destination::Materials => "nav.materials",
            Destination::Warehouse => "nav.warehouse",
            Destination::ServiceRequests => "nav.serviceRequests",
            Destination::Reports => "nav.reports",
            Destination::Settings => "nav.settings",
            Destination::Companies => "nav.companies",
            Destination::Branches => "nav.branches",
            Destination::SignIn => "auth.signIn",
            Destination::SignUp => "auth.signUp",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Destination::Home => "home",
            Destination::Customers => "users",
            Destination::Visits => "calendar",
            Destination::Operators => "user-check",
            Destination::Equipment => "wrench",
            Destination::Materials => "package",
            Destination::Warehouse => "warehouse",
            Destination::ServiceRequests => "clipboard-list",
            Destination::Reports => "file-text",
            Destination::Settings => "settings",
            Destination::Companies => "building",
            Destination::Branches => "map-pin",
            Destination::SignIn | Destination::SignUp => "log-in",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_back_to_their_destination() {
        for destination in Destination::ALL {
            assert_eq!(Destination::from_path(destination.path()), Some(destination));
        }
    }

    #[test]
    fn test_trailing_slash_and_unknown_paths() {
        assert_eq!(Destination::from_path("/visits/"), Some(Destination::Visits));
        assert_eq!(Destination::from_path("/"), Some(Destination::Home));
        assert_eq!(Destination::from_path("/nope"), None);
        assert_eq!(Destination::from_path("/customers/42"), None);
    }

    #[test]
    fn test_sub_paths_belong_to_their_page() {
        assert_eq!(
            Destination::owning("/customers/42/delete"),
            Some(Destination::Customers)
        );
        assert_eq!(Destination::owning("/settings"), Some(Destination::Settings));
        assert_eq!(Destination::owning("/customersx"), None);
        assert_eq!(Destination::owning("/x/y"), None);
    }

    #[test]
    fn test_only_auth_pages_are_public() {
        let public: Vec<_> = Destination::ALL.into_iter().filter(|d| d.is_public()).collect();
        assert_eq!(public, vec![Destination::SignIn, Destination::SignUp]);
    }
}

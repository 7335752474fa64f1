use super::routes::Destination;
use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationItem {
    pub destination: Destination,
    pub label_key: &'static str,
    pub icon: &'static str,
}

impl NavigationItem {
    pub fn path(&self) -> &'static str {
        self.destination.path()
    }
}

impl From<Destination> for NavigationItem {
    fn from(destination: Destination) -> Self {
        Self {
            destination,
            label_key: destination.label_key(),
            icon: destination.icon(),
        }
    }
}

const ADMIN: &[Destination] = &[
    Destination::Companies,
    Destination::Customers,
    Destination::Visits,
    Destination::Operators,
    Destination::ServiceRequests,
    Destination::Reports,
    Destination::Settings,
];

const COMPANY: &[Destination] = &[
    Destination::Customers,
    Destination::Visits,
    Destination::Operators,
    Destination::Equipment,
    Destination::Materials,
    Destination::Warehouse,
    Destination::ServiceRequests,
    Destination::Reports,
    Destination::Settings,
];

const OPERATOR: &[Destination] = &[
    Destination::Visits,
    Destination::Customers,
    Destination::Warehouse,
    Destination::ServiceRequests,
    Destination::Settings,
];

const CUSTOMER: &[Destination] = &[
    Destination::Branches,
    Destination::Visits,
    Destination::ServiceRequests,
    Destination::Settings,
];

const CUSTOMER_BRANCH: &[Destination] = &[
    Destination::Visits,
    Destination::ServiceRequests,
    Destination::Settings,
];

/// Ordered menu for `role`, always led by home. Unknown or missing roles get
/// home only.
pub fn navigation_for(role: Option<Role>) -> Vec<NavigationItem> {
    let extra: &[Destination] = match role {
        Some(Role::Admin) => ADMIN,
        Some(Role::Company) => COMPANY,
        Some(Role::Operator) => OPERATOR,
        Some(Role::Customer) => CUSTOMER,
        Some(Role::CustomerBranch) => CUSTOMER_BRANCH,
        Some(Role::Unknown) | None => &[],
    };

    std::iter::once(Destination::Home)
        .chain(extra.iter().copied())
        .map(NavigationItem::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(role: Option<Role>) -> Vec<&'static str> {
        navigation_for(role).iter().map(NavigationItem::path).collect()
    }

    #[test]
    fn test_company_menu_order() {
        assert_eq!(
            paths(Some(Role::Company)),
            vec![
                "/",
                "/customers",
                "/visits",
                "/operators",
                "/equipment",
                "/materials",
                "/warehouse",
                "/service-requests",
                "/reports",
                "/settings",
            ]
        );
    }

    #[test]
    fn test_operator_sees_visits_before_customers() {
        assert_eq!(
            paths(Some(Role::Operator)),
            vec!["/", "/visits", "/customers", "/warehouse", "/service-requests", "/settings"]
        );
    }

    #[test]
    fn test_every_role_starts_at_home_and_is_stable() {
        let roles = [
            Some(Role::Admin),
            Some(Role::Company),
            Some(Role::Operator),
            Some(Role::Customer),
            Some(Role::CustomerBranch),
            Some(Role::Unknown),
            None,
        ];
        for role in roles {
            let menu = navigation_for(role);
            assert_eq!(menu[0].destination, Destination::Home);
            assert_eq!(menu, navigation_for(role));
            assert!(menu.iter().all(|item| !item.destination.is_public()));
        }
    }

    #[test]
    fn test_unknown_role_is_home_only() {
        assert_eq!(paths(Some(Role::Unknown)), vec!["/"]);
        assert_eq!(paths(None), vec!["/"]);
        assert_eq!(navigation_for(None)[0].label_key, "nav.dashboard");
    }

    #[test]
    fn test_admin_and_customer_menus() {
        assert_eq!(paths(Some(Role::Admin))[1], "/companies");
        assert_eq!(paths(Some(Role::Customer))[1], "/branches");
        assert_eq!(paths(Some(Role::CustomerBranch)).len(), 4);
    }
}

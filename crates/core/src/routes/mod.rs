//! Routing table and route-level access policy

mod guard;
mod router;

pub use guard::{GuardDecision, NavigationGuard};
pub use router::{Navigation, Router};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access requirements a route declares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequirements {
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub requires_guest: bool,
    #[serde(default)]
    pub requires_super_admin: bool,
}

impl AccessRequirements {
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        requires_guest: false,
        requires_super_admin: false,
    };

    pub const GUEST: Self = Self {
        requires_guest: true,
        ..Self::PUBLIC
    };

    pub const AUTHENTICATED: Self = Self {
        requires_auth: true,
        ..Self::PUBLIC
    };

    pub const SUPER_ADMIN: Self = Self {
        requires_auth: true,
        requires_super_admin: true,
        ..Self::PUBLIC
    };
}

/// A navigable route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: &'static str,
    pub name: &'static str,
    /// Identifier of the view rendered for this route, resolved on first visit
    pub view: &'static str,
    pub access: AccessRequirements,
}

impl RouteDescriptor {
    pub const fn new(
        path: &'static str,
        name: &'static str,
        view: &'static str,
        access: AccessRequirements,
    ) -> Self {
        Self {
            path,
            name,
            view,
            access,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("No route matches '{0}'")]
    NotFound(String),

    #[error("Route table is missing the '{0}' route")]
    MissingRedirectTarget(&'static str),

    #[error("Navigation to '{0}' keeps redirecting")]
    RedirectLoop(String),
}

/// Static routing table, fixed at startup
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub const fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }

    /// Look a route up by path (`/reports`) or by name (`Reports`)
    pub fn resolve(&self, target: &str) -> Result<&RouteDescriptor, RouteError> {
        let found = if target.starts_with('/') {
            let path = normalize_path(target);
            self.routes.iter().find(|route| route.path == path)
        } else {
            self.by_name(target)
        };
        found.ok_or_else(|| RouteError::NotFound(target.to_string()))
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            RouteDescriptor::new("/login", "Login", "LoginView", AccessRequirements::GUEST),
            RouteDescriptor::new(
                "/",
                "Dashboard",
                "DashboardView",
                AccessRequirements::AUTHENTICATED,
            ),
            RouteDescriptor::new(
                "/admin/employees",
                "AdminEmployees",
                "AdminEmployeesView",
                AccessRequirements::SUPER_ADMIN,
            ),
            RouteDescriptor::new(
                "/tools/klaes",
                "KlaesReprocess",
                "KlaesReprocessView",
                AccessRequirements::AUTHENTICATED,
            ),
            RouteDescriptor::new(
                "/config/setup",
                "EnvSetup",
                "EnvSetupView",
                AccessRequirements::SUPER_ADMIN,
            ),
            RouteDescriptor::new(
                "/klaes/manager",
                "KlaesManager",
                "KlaesManagerView",
                AccessRequirements::AUTHENTICATED,
            ),
            RouteDescriptor::new(
                "/reports",
                "Reports",
                "ReportsView",
                AccessRequirements::AUTHENTICATED,
            ),
        ])
    }
}

// Drops the query/fragment and any trailing slash except on the root path.
fn normalize_path(target: &str) -> &str {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

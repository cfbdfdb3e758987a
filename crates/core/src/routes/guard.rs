use super::RouteDescriptor;
use crate::config::AuthConfig;
use crate::session::SessionState;

/// Outcome of a guard evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send the navigation to the named route instead
    Redirect(&'static str),
}

/// Pre-navigation access check
///
/// Checks run in a fixed order and the first match wins:
/// 1. auth required, no session: login route
/// 2. superadmin required, not a superadmin: landing route
/// 3. guest only, session present: landing route
///
/// Role mismatches redirect silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationGuard {
    login_route: &'static str,
    landing_route: &'static str,
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new(AuthConfig::LOGIN_ROUTE, AuthConfig::LANDING_ROUTE)
    }
}

impl NavigationGuard {
    pub const fn new(login_route: &'static str, landing_route: &'static str) -> Self {
        Self {
            login_route,
            landing_route,
        }
    }

    pub const fn login_route(&self) -> &'static str {
        self.login_route
    }

    pub const fn landing_route(&self) -> &'static str {
        self.landing_route
    }

    pub fn evaluate(&self, to: &RouteDescriptor, session: &SessionState) -> GuardDecision {
        let access = to.access;
        if access.requires_auth && !session.is_authenticated() {
            GuardDecision::Redirect(self.login_route)
        } else if access.requires_super_admin && !session.is_super_admin() {
            GuardDecision::Redirect(self.landing_route)
        } else if access.requires_guest && session.is_authenticated() {
            GuardDecision::Redirect(self.landing_route)
        } else {
            GuardDecision::Allow
        }
    }
}

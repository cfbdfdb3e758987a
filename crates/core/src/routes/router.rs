use super::{GuardDecision, NavigationGuard, RouteDescriptor, RouteError, RouteTable};
use crate::session::SessionStore;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, info};

// A redirect is a navigation of its own and is guarded again; this bounds
// the chain for tables whose guards point at each other.
const MAX_REDIRECTS: usize = 4;

/// A committed navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// What the caller asked for
    pub requested: String,
    /// Where the navigation ended up
    pub route: RouteDescriptor,
    /// The guard sent the navigation somewhere else
    pub redirected: bool,
}

/// Resolves targets, runs the guard and tracks the current route
pub struct Router {
    table: RouteTable,
    guard: NavigationGuard,
    session: Arc<SessionStore>,
    current: ArcSwapOption<RouteDescriptor>,
}

impl Router {
    /// # Errors
    ///
    /// Fails if the guard's login or landing route is not in `table`
    pub fn new(
        table: RouteTable,
        guard: NavigationGuard,
        session: Arc<SessionStore>,
    ) -> Result<Self, RouteError> {
        for name in [guard.login_route(), guard.landing_route()] {
            if table.by_name(name).is_none() {
                return Err(RouteError::MissingRedirectTarget(name));
            }
        }
        Ok(Self {
            table,
            guard,
            session,
            current: ArcSwapOption::empty(),
        })
    }

    /// Router over the default table and guard
    pub fn with_defaults(session: Arc<SessionStore>) -> Result<Self, RouteError> {
        Self::new(RouteTable::default(), NavigationGuard::default(), session)
    }

    pub fn current(&self) -> Option<Arc<RouteDescriptor>> {
        self.current.load_full()
    }

    pub const fn table(&self) -> &RouteTable {
        &self.table
    }

    /// User-initiated navigation, subject to the guard
    pub fn push(&self, target: &str) -> Result<Navigation, RouteError> {
        let mut route = self.table.resolve(target)?;
        let mut redirected = false;

        for _ in 0..=MAX_REDIRECTS {
            let session = self.session.snapshot();
            match self.guard.evaluate(route, &session) {
                GuardDecision::Allow => return Ok(self.commit(target, route, redirected)),
                GuardDecision::Redirect(name) => {
                    debug!(from = route.name, to = name, "Navigation redirected by guard");
                    route = self.table.resolve(name)?;
                    redirected = true;
                }
            }
        }

        Err(RouteError::RedirectLoop(target.to_string()))
    }

    /// Forced navigation that bypasses the guard
    pub fn force(&self, name: &str) -> Result<Navigation, RouteError> {
        let route = self.table.resolve(name)?;
        info!(to = route.name, "Forced navigation");
        Ok(self.commit(name, route, false))
    }

    /// Forced navigation to the login route
    pub fn force_login(&self) -> Result<Navigation, RouteError> {
        self.force(self.guard.login_route())
    }

    fn commit(&self, requested: &str, route: &RouteDescriptor, redirected: bool) -> Navigation {
        self.current.store(Some(Arc::new(route.clone())));
        Navigation {
            requested: requested.to_string(),
            route: route.clone(),
            redirected,
        }
    }
}

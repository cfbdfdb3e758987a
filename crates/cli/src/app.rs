//! Application wiring: one session context shared by the gateway and the router

use anyhow::Result;
use navaja_core::{ClientConfig, FileStorage, Navigation, Router, SessionStorage, SessionStore};
use navaja_http::{ApiClient, AuthEndpoints, SessionEvent};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, warn};

pub struct App {
    pub session: Arc<SessionStore>,
    pub client: ApiClient,
    pub router: Router,
    events: broadcast::Receiver<SessionEvent>,
}

impl App {
    /// Wire the application from configuration, rehydrating the persisted session
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(&config.session.storage_path));
        let auth = AuthEndpoints::from_config(&config.api)?;
        Self::assemble(storage, auth, config)
    }

    fn assemble(
        storage: Arc<dyn SessionStorage>,
        auth: AuthEndpoints,
        config: &ClientConfig,
    ) -> Result<Self> {
        let session = Arc::new(SessionStore::restore(storage, Arc::new(auth)));
        let client = ApiClient::from_config(&config.api, session.clone())?;
        let router = Router::with_defaults(session.clone())?;
        let events = client.subscribe();

        Ok(Self {
            session,
            client,
            router,
            events,
        })
    }

    /// Apply session events published since the last call
    ///
    /// An invalidated session sends the router to the login route, bypassing
    /// the guard. Returns the forced navigations.
    pub fn apply_session_events(&mut self) -> Vec<Navigation> {
        let mut navigations = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Invalidated { reason }) => {
                    warn!(?reason, "Session ended, returning to login");
                    match self.router.force_login() {
                        Ok(navigation) => navigations.push(navigation),
                        Err(e) => error!(error = %e, "Failed to navigate to login"),
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed session events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        navigations
    }
}

//! The session store: single owner of the session and of its storage entries

use super::{SessionState, User};
use crate::auth::{AuthApi, LoginRequest};
use crate::config::AuthConfig;
use crate::storage::SessionStorage;
use crate::CoreResult;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Login did not succeed; `message` is ready to show to the user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoginFailure {
    pub message: String,
}

/// Holds the current identity and tokens
///
/// Constructed once per application and shared (`Arc<SessionStore>`) with
/// the HTTP gateway and the router. Reads are lock-free snapshots.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    auth: Arc<dyn AuthApi>,
    state: ArcSwap<SessionState>,
}

impl SessionStore {
    /// Build the store, rehydrating any session persisted in `storage`
    ///
    /// A persisted access token without a readable user record (or the
    /// reverse) is not a valid session; it is discarded and its entries
    /// removed.
    pub fn restore(storage: Arc<dyn SessionStorage>, auth: Arc<dyn AuthApi>) -> Self {
        let access = read_entry(storage.as_ref(), AuthConfig::ACCESS_TOKEN_KEY);
        let refresh = read_entry(storage.as_ref(), AuthConfig::REFRESH_TOKEN_KEY);
        let user = read_entry(storage.as_ref(), AuthConfig::USER_KEY).and_then(|raw| {
            serde_json::from_str::<User>(&raw)
                .inspect_err(|e| warn!(error = %e, "Discarding unreadable persisted user"))
                .ok()
        });

        let store = Self {
            storage,
            auth,
            state: ArcSwap::from_pointee(SessionState::default()),
        };

        match (access, user) {
            (Some(access), Some(user)) => {
                info!(role = %user.role, "Restored persisted session");
                store
                    .state
                    .store(Arc::new(SessionState::authenticated(access, refresh, user)));
            }
            (None, None) if refresh.is_none() => debug!("No persisted session"),
            _ => {
                warn!("Persisted session is incomplete, clearing it");
                store.clear_storage();
            }
        }

        store
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> Arc<SessionState> {
        self.state.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.load().is_authenticated()
    }

    pub fn is_super_admin(&self) -> bool {
        self.state.load().is_super_admin()
    }

    /// Authenticate with the backend
    ///
    /// On success the tokens and the user record replace the current session
    /// in memory and in storage. On failure the previous session is left
    /// untouched and the display message is recorded in `error`.
    pub async fn login(&self, empleado_id: &str, password: &str) -> Result<(), LoginFailure> {
        self.update(|state| {
            state.loading = true;
            state.error = None;
        });

        let request = LoginRequest {
            empleado_id: empleado_id.to_string(),
            password: password.to_string(),
        };

        match self.auth.login(&request).await {
            Ok(response) => {
                if let Err(e) = self.persist(&response.access, &response.refresh, &response.user)
                {
                    warn!(error = %e, "Failed to persist session, it will not survive a restart");
                }
                info!(empleado_id, role = %response.user.role, "Login succeeded");
                self.state.store(Arc::new(SessionState::authenticated(
                    response.access,
                    Some(response.refresh),
                    response.user,
                )));
                Ok(())
            }
            Err(e) => {
                let message = e.display_message();
                warn!(empleado_id, error = %e, "Login failed");
                self.update(|state| {
                    state.loading = false;
                    state.error = Some(message.clone());
                });
                Err(LoginFailure { message })
            }
        }
    }

    /// Clear the session in memory and in storage. Safe to call repeatedly.
    pub fn logout(&self) {
        let previous = self.state.swap(Arc::new(SessionState::default()));
        self.clear_storage();
        if previous.is_authenticated() {
            info!("Logged out");
        }
    }

    /// Record a refreshed access token
    ///
    /// Returns `false` when there is no session to update. A logout that
    /// lands while the token is being written wins: the token is removed
    /// again and `false` is returned.
    pub fn replace_access_token(&self, access: &str) -> CoreResult<bool> {
        if !self.is_authenticated() {
            return Ok(false);
        }
        self.storage.set(AuthConfig::ACCESS_TOKEN_KEY, access)?;
        if !self.is_authenticated() {
            debug!("Session ended while storing a refreshed token, discarding it");
            self.storage.remove(AuthConfig::ACCESS_TOKEN_KEY)?;
            return Ok(false);
        }
        self.update(|state| {
            if state.is_authenticated() {
                state.access_token = Some(access.to_string());
            }
        });
        Ok(true)
    }

    /// Access token as currently persisted
    pub fn stored_access_token(&self) -> Option<String> {
        read_entry(self.storage.as_ref(), AuthConfig::ACCESS_TOKEN_KEY)
    }

    /// Refresh token as currently persisted
    pub fn stored_refresh_token(&self) -> Option<String> {
        read_entry(self.storage.as_ref(), AuthConfig::REFRESH_TOKEN_KEY)
    }

    pub fn auth_api(&self) -> &Arc<dyn AuthApi> {
        &self.auth
    }

    fn update(&self, f: impl Fn(&mut SessionState)) {
        self.state.rcu(|current| {
            let mut next = SessionState::clone(current);
            f(&mut next);
            next
        });
    }

    fn persist(&self, access: &str, refresh: &str, user: &User) -> CoreResult<()> {
        let user = serde_json::to_string(user)?;
        self.storage.set(AuthConfig::ACCESS_TOKEN_KEY, access)?;
        self.storage.set(AuthConfig::REFRESH_TOKEN_KEY, refresh)?;
        self.storage.set(AuthConfig::USER_KEY, &user)?;
        Ok(())
    }

    fn clear_storage(&self) {
        for key in [
            AuthConfig::ACCESS_TOKEN_KEY,
            AuthConfig::REFRESH_TOKEN_KEY,
            AuthConfig::USER_KEY,
        ] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove session entry");
            }
        }
    }
}

fn read_entry(storage: &dyn SessionStorage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            warn!(key, error = %e, "Failed to read session entry");
            None
        }
    }
}

//! Gateway to the NavajaSuiza API
//!
//! Every request carries the access token currently persisted by the
//! [`SessionStore`]. A 401 on a first transmission triggers at most one
//! refresh, then one replay. Refreshes are single-flight: concurrent 401s
//! wait for the refresh in progress and replay with its token. When the
//! session cannot be recovered the gateway logs it out and publishes
//! [`SessionEvent::Invalidated`].

pub mod auth;
pub mod error;
pub mod events;
pub mod request;
pub mod users;

pub use auth::AuthEndpoints;
pub use events::{InvalidationReason, SessionEvent};
pub use request::ApiRequest;

use error::ClientError;
use navaja_core::SessionStore;
use navaja_core::config::ApiConfig;
use request::Attempt;
use reqwest::{Client, ClientBuilder, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

const DEFAULT_USER_AGENT: &str = concat!("navaja-client/", env!("CARGO_PKG_VERSION"));

/// Authenticated API client
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresh_gate: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Client configured from [`ApiConfig`]
    pub fn from_config(config: &ApiConfig, session: Arc<SessionStore>) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(&config.base_url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .session(session)
            .build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// Receive [`SessionEvent`]s published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(&ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(&ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(&ApiRequest::delete(path)).await
    }

    /// Send a request and decode its JSON response
    ///
    /// An empty success body decodes as JSON `null`.
    pub async fn send<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        let response = self.dispatch(request).await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                Ok(serde_json::from_value(Value::Null)?)
            } else {
                Ok(serde_json::from_slice(&bytes)?)
            }
        } else {
            Err(error_from(response).await)
        }
    }

    /// Transmit `request`, recovering once from an expired access token
    ///
    /// Returns the final response whatever its status; only a 401 on the
    /// original transmission is handled here.
    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let token = self.inner.session.stored_access_token();
        let response = self
            .transmit(request, token.as_deref(), Attempt::Original)
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let rejected = error_from(response).await;
        let Some(fresh) = self.recover(token.as_deref()).await else {
            return Err(rejected);
        };

        let replay = self
            .transmit(request, Some(&fresh), Attempt::Replay)
            .await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!(path = request.path(), "Replayed request rejected again");
        }
        Ok(replay)
    }

    async fn transmit(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        attempt: Attempt,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.inner.base_url, request.path());
        let mut builder = self.inner.client.request(request.method().clone(), url);

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method(),
            path = request.path(),
            ?attempt,
            authenticated = token.is_some(),
            "Sending request"
        );
        Ok(builder.send().await?)
    }

    /// Obtain a usable access token after a 401, or end the session
    ///
    /// `stale` is the token the rejected request carried. If the stored token
    /// differs by the time the refresh gate is acquired, another request
    /// already refreshed and its token is reused.
    async fn recover(&self, stale: Option<&str>) -> Option<String> {
        let _gate = self.inner.refresh_gate.lock().await;
        let session = &self.inner.session;

        match (session.stored_access_token(), stale) {
            (Some(current), _) if stale != Some(current.as_str()) => {
                debug!("Access token already refreshed by a concurrent request");
                return Some(current);
            }
            (None, Some(_)) => {
                debug!("Session already ended by a concurrent request");
                return None;
            }
            _ => {}
        }

        let Some(refresh_token) = session.stored_refresh_token() else {
            self.invalidate(InvalidationReason::MissingRefreshToken);
            return None;
        };

        match session.auth_api().refresh(&refresh_token).await {
            Ok(refreshed) => match session.replace_access_token(&refreshed.access) {
                Ok(true) => {
                    info!("Access token refreshed");
                    Some(refreshed.access)
                }
                Ok(false) => {
                    debug!("Session ended while refreshing, not replaying");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Failed to persist refreshed access token");
                    Some(refreshed.access)
                }
            },
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.invalidate(InvalidationReason::RefreshRejected);
                None
            }
        }
    }

    fn invalidate(&self, reason: InvalidationReason) {
        warn!(?reason, "Session invalidated, logging out");
        self.inner.session.logout();
        if self
            .inner
            .events
            .send(SessionEvent::Invalidated { reason })
            .is_err()
        {
            debug!("No subscribers for session events");
        }
    }
}

async fn error_from(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::from_status(status, body)
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    session: Option<Arc<SessionStore>>,
}

impl ApiClientBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Session whose tokens are attached and refreshed
    #[must_use]
    pub fn session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let session = self
            .session
            .ok_or_else(|| ClientError::Configuration("session is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let mut client_builder = ClientBuilder::new().default_headers(headers);
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        client_builder =
            client_builder.user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT));

        Ok(ApiClient {
            inner: Arc::new(Inner {
                client: client_builder.build()?,
                base_url,
                session,
                refresh_gate: Mutex::new(()),
                events: events::channel(),
            }),
        })
    }
}

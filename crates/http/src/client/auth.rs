//! Login and refresh endpoints

use super::ClientError;
use async_trait::async_trait;
use navaja_core::auth::{
    AuthApi, AuthApiError, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
};
use navaja_core::config::{ApiConfig, AuthConfig};
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Client for the unauthenticated auth endpoints
///
/// Requests go out without credentials and bypass the gateway's refresh
/// handling: a failed login or refresh is reported as is.
#[derive(Clone)]
pub struct AuthEndpoints {
    client: Client,
    base_url: String,
}

impl AuthEndpoints {
    /// Create a new auth client
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new_with_timeout(base_url, None)
    }

    /// Auth client configured from [`ApiConfig`]
    pub fn from_config(config: &ApiConfig) -> Result<Self, ClientError> {
        Self::new_with_timeout(
            &config.base_url,
            Some(Duration::from_secs(config.timeout_secs)),
        )
    }

    fn new_with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is required".into()));
        }

        let mut builder = ClientBuilder::new().user_agent(super::DEFAULT_USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AuthApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthApiError::Transport(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| AuthApiError::Transport(format!("invalid response body: {e}")))
        } else {
            Err(AuthApiError::Rejected {
                status: status.as_u16(),
                payload: response.json::<Value>().await.ok(),
            })
        }
    }
}

#[async_trait]
impl AuthApi for AuthEndpoints {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthApiError> {
        self.post(AuthConfig::LOGIN_PATH, request).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthApiError> {
        let request = RefreshRequest {
            refresh: refresh_token.to_string(),
        };
        self.post(AuthConfig::REFRESH_PATH, &request).await
    }
}

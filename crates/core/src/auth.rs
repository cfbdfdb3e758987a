//! Authentication endpoint contract
//!
//! The session store and the gateway both talk to the backend's login and
//! refresh endpoints through [`AuthApi`], so neither depends on a concrete
//! HTTP client.

use crate::config::AuthConfig;
use crate::session::User;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Credentials posted to the login endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub empleado_id: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("empleado_id", &self.empleado_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

/// Body posted to the refresh endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Successful refresh payload
///
/// The backend may rotate the refresh token and send it back; the client
/// keeps using the one it logged in with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Failure talking to an authentication endpoint
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthApiError {
    /// The endpoint answered with a non-success status
    #[error("authentication endpoint returned {status}")]
    Rejected {
        status: u16,
        payload: Option<Value>,
    },

    /// The request never produced a usable response
    #[error("transport error: {0}")]
    Transport(String),
}

impl AuthApiError {
    /// Message suitable for showing next to a login form
    ///
    /// Prefers the payload's `detail`, then the first of `non_field_errors`,
    /// then a generic connectivity message.
    pub fn display_message(&self) -> String {
        let Self::Rejected {
            payload: Some(payload),
            ..
        } = self
        else {
            return AuthConfig::GENERIC_LOGIN_ERROR.to_string();
        };

        first_message(payload.get("detail"))
            .or_else(|| first_message(payload.get("non_field_errors")))
            .unwrap_or_else(|| AuthConfig::GENERIC_LOGIN_ERROR.to_string())
    }
}

// Validation errors arrive either as a bare string or as a list of strings.
fn first_message(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Login and refresh endpoints
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token pair and the user's profile
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthApiError>;

    /// Exchange a refresh token for a new access token
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthApiError>;
}

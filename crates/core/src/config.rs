//! Client configuration

use crate::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Authentication constants shared by the store, the gateway and the router
pub struct AuthConfig;

impl AuthConfig {
    /// Storage key for the access token
    pub const ACCESS_TOKEN_KEY: &'static str = "access_token";

    /// Storage key for the refresh token
    pub const REFRESH_TOKEN_KEY: &'static str = "refresh_token";

    /// Storage key for the serialized user record
    pub const USER_KEY: &'static str = "user";

    /// Login endpoint, relative to the API base URL
    pub const LOGIN_PATH: &'static str = "/auth/login/";

    /// Refresh endpoint, relative to the API base URL
    pub const REFRESH_PATH: &'static str = "/auth/refresh/";

    /// Route the session is sent to when it is missing or invalidated
    pub const LOGIN_ROUTE: &'static str = "Login";

    /// Default authenticated landing route
    pub const LANDING_ROUTE: &'static str = "Dashboard";

    /// Message shown when the server gave nothing more specific
    pub const GENERIC_LOGIN_ERROR: &'static str = "Unable to connect to the server.";
}

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend API configuration
    pub api: ApiConfig,

    /// Session persistence configuration
    pub session: SessionConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL, e.g. `http://localhost:8000/api`
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File the session survives restarts in
    pub storage_path: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            user_agent: concat!("navaja-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: default_data_dir().join("session.json"),
        }
    }
}

/// Platform data directory for the client, honouring `NAVAJA_STATE_DIR`
pub fn default_data_dir() -> PathBuf {
    std::env::var("NAVAJA_STATE_DIR").map_or_else(
        |_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("navaja")
        },
        PathBuf::from,
    )
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and `NAVAJA__*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value cannot be parsed
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default(
                "session.storage_path",
                defaults.session.storage_path.to_string_lossy().to_string(),
            )?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("NAVAJA").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

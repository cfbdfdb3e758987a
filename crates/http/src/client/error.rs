//! Client error types

use serde_json::Value;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    /// Credentials missing, expired or rejected
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        message: String,
        payload: Option<Value>,
    },

    /// Resource not found
    #[error("Resource not found: {message}")]
    NotFound {
        message: String,
        payload: Option<Value>,
    },

    /// Bad request
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        payload: Option<Value>,
    },

    /// Forbidden
    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
        payload: Option<Value>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code and response body
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let payload = serde_json::from_str::<Value>(&body).ok();
        let message = payload
            .as_ref()
            .and_then(|p| p.get("detail"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        match status.as_u16() {
            400 => Self::BadRequest { message, payload },
            401 => Self::AuthenticationFailed { message, payload },
            403 => Self::Forbidden { message, payload },
            404 => Self::NotFound { message, payload },
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
                payload,
            },
        }
    }

    /// Status code the server answered with, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::AuthenticationFailed { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::ServerError { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Serialization(_) | Self::Configuration(_) => None,
        }
    }

    /// JSON error body, when the server sent one
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::BadRequest { payload, .. }
            | Self::AuthenticationFailed { payload, .. }
            | Self::Forbidden { payload, .. }
            | Self::NotFound { payload, .. }
            | Self::ServerError { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// The request was rejected because its credential is missing or expired
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn maps_status_codes() {
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_REQUEST, String::new()),
            ClientError::BadRequest { .. }
        ));
        assert!(ClientError::from_status(StatusCode::UNAUTHORIZED, String::new()).is_auth_expired());
        assert!(matches!(
            ClientError::from_status(StatusCode::FORBIDDEN, String::new()),
            ClientError::Forbidden { .. }
        ));
        assert_eq!(
            ClientError::from_status(StatusCode::SERVICE_UNAVAILABLE, String::new()).status(),
            Some(503)
        );
    }

    #[test]
    fn prefers_detail_from_json_body() {
        let err = ClientError::from_status(
            StatusCode::FORBIDDEN,
            r#"{"detail":"Acceso restringido a SuperAdmin."}"#.to_string(),
        );
        assert_eq!(err.to_string(), "Forbidden: Acceso restringido a SuperAdmin.");
        assert_eq!(err.payload().unwrap()["detail"], "Acceso restringido a SuperAdmin.");
    }

    #[test]
    fn falls_back_to_raw_body_or_status() {
        let err = ClientError::from_status(StatusCode::NOT_FOUND, "gone".to_string());
        assert_eq!(err.to_string(), "Resource not found: gone");
        assert!(err.payload().is_none());

        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, String::new());
        assert_eq!(err.to_string(), "Authentication failed: 401 Unauthorized");
    }
}

//! NavajaSuiza HTTP gateway
//!
//! [`ApiClient`] attaches the session's access token to every request and
//! transparently refreshes it once on expiry. [`AuthEndpoints`] talks to the
//! login and refresh endpoints directly.

pub mod client;

pub use client::error::ClientError;
pub use client::{ApiClient, ApiClientBuilder, ApiRequest, AuthEndpoints, InvalidationReason, SessionEvent};

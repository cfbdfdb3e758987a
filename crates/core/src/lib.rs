//! NavajaSuiza client core: session store, durable storage and route guard

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod storage;

pub use auth::{AuthApi, AuthApiError, LoginRequest, LoginResponse, RefreshResponse};
pub use config::{AuthConfig, ClientConfig};
pub use error::{CoreError, CoreResult};
pub use routes::{
    AccessRequirements, GuardDecision, Navigation, NavigationGuard, RouteDescriptor, RouteError,
    RouteTable, Router,
};
pub use session::{LoginFailure, Role, SessionState, SessionStore, User};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};

//! User API client methods

use super::{ApiClient, ClientError};
use navaja_core::User;

impl ApiClient {
    /// Profile of the authenticated user
    pub async fn me(&self) -> Result<User, ClientError> {
        self.get("/users/me/").await
    }

    /// Every account (superadmin only)
    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.get("/admin/users/").await
    }
}

//! Session state: who is logged in and with what privileges

mod store;

pub use store::{LoginFailure, SessionStore};

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Employee role, as assigned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperAdmin,
    Admin,
    Empleado,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "superadmin",
            Self::Admin => "admin",
            Self::Empleado => "empleado",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile of the logged-in employee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub empleado_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub departamento: Option<String>,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub date_joined: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

impl User {
    /// A user with only a role set
    pub const fn with_role(role: Role) -> Self {
        Self {
            id: None,
            empleado_id: None,
            username: None,
            email: None,
            first_name: None,
            last_name: None,
            full_name: None,
            role,
            departamento: None,
            is_blocked: false,
            date_joined: None,
            last_login: None,
        }
    }

    /// Full name, else username, else the empty string
    pub fn display_name(&self) -> &str {
        [&self.full_name, &self.username]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|name| !name.is_empty())
            .unwrap_or("")
    }
}

/// Immutable snapshot of the session
///
/// Authorization flags are computed from the tokens and the user on every
/// call and are never stored alongside them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    /// A login call is in flight
    pub loading: bool,
    /// Message from the last failed login
    pub error: Option<String>,
}

impl SessionState {
    pub(crate) fn authenticated(access: String, refresh: Option<String>, user: User) -> Self {
        Self {
            access_token: Some(access),
            refresh_token: refresh,
            user: Some(user),
            loading: false,
            error: None,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn user_role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", User::display_name)
    }

    pub fn is_super_admin(&self) -> bool {
        self.user_role() == Some(Role::SuperAdmin)
    }

    /// Superadmins and admins
    pub fn is_admin_user(&self) -> bool {
        matches!(self.user_role(), Some(Role::SuperAdmin | Role::Admin))
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

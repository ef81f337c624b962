use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::AUTH_COOKIE;

/// Which kind of user a session stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    Member,
    Uninvited,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Organizer => write!(f, "organizer"),
            Role::Member => write!(f, "member"),
            Role::Uninvited => write!(f, "uninvited"),
        }
    }
}

/// Authenticated user handle.
///
/// The `auth_token` is shared by the HTTP client (Cookie header) and the
/// browser context (injected cookie).
#[derive(Debug, Clone)]
pub struct Session {
    pub role: Role,
    pub display_name: String,
    pub phone: String,
    pub token: String,
    pub user_id: Option<String>,
}

impl Session {
    pub fn new(role: Role, display_name: &str, phone: &str, token: &str) -> Self {
        Self {
            role,
            display_name: display_name.to_string(),
            phone: phone.to_string(),
            token: token.to_string(),
            user_id: None,
        }
    }

    /// Value for a `Cookie` request header
    pub fn cookie_header(&self) -> String {
        format!("{}={}", AUTH_COOKIE, self.token)
    }
}

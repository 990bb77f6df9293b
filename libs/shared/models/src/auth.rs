use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub iat: Option<u64>,
}

/// Authenticated caller, as placed in request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Numeric row id of the caller in the `users` table.
    pub fn user_id(&self) -> Option<i64> {
        self.id.parse().ok()
    }

    pub fn user_role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(UserRole::parse)
    }

    pub fn is_admin(&self) -> bool {
        self.user_role() == Some(UserRole::Admin)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Patient,
    Nutritionist,
}

impl UserRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "patient" => Some(UserRole::Patient),
            "nutritionist" => Some(UserRole::Nutritionist),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Patient => write!(f, "patient"),
            UserRole::Nutritionist => write!(f, "nutritionist"),
        }
    }
}

/// Row of the external `users` table. Only the columns this service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub fullname: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: UserRole,
    pub avatar_url: Option<String>,
}

//! Persisted record shapes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller role as issued by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Account owning contacts. Managed outside this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: String,
    pub extra_info: String,
    pub completed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user: Arc<User>,
}

impl Contact {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.user.id == user.id
    }
}

/// Validated fields for a new contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: String,
    pub extra_info: String,
    pub completed: bool,
}

/// Validated replacement values for an existing contact.
///
/// Every field is written on update. Fields the caller left out of the request
/// arrive here as empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: String,
    pub extra_info: String,
    pub completed: bool,
}

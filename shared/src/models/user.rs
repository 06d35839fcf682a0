//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A canteen member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    /// Bumped to revoke every token issued so far
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
}

/// Roles known to the canteen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    /// Office staff: stock, reconciliation, deposits, reminders
    OfficeAssistant,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::OfficeAssistant => "office_assistant",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "office_assistant" => Ok(UserRole::OfficeAssistant),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Resolve the role an email address is entitled to.
///
/// Any configured suffix matching the end of the address (case-insensitive)
/// grants the office assistant role; suffixes are expected pre-normalized.
pub fn role_for_email(email: &str, office_assistant_suffixes: &[String]) -> UserRole {
    let email = email.trim().to_lowercase();
    if office_assistant_suffixes
        .iter()
        .any(|suffix| !suffix.is_empty() && email.ends_with(suffix.as_str()))
    {
        UserRole::OfficeAssistant
    } else {
        UserRole::User
    }
}

/// Roles are only ever upgraded at login, never downgraded
pub fn should_upgrade_role(current: UserRole, entitled: UserRole) -> bool {
    current != entitled && entitled == UserRole::OfficeAssistant
}

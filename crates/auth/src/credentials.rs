//! Presence checks for credential payloads.
//!
//! Credentials are accepted from the request body only. Fields arrive as
//! optionals so a missing field and an empty string are rejected the same way.

use serde::Deserialize;

/// Body of `POST /register`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginCredentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A registration with every field present and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login credentials with both fields present and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteLogin {
    pub email: String,
    pub password: String,
}

impl Registration {
    /// `None` when any field is missing or blank.
    pub fn complete(self) -> Option<CompleteRegistration> {
        Some(CompleteRegistration {
            username: present(self.username)?,
            email: present(self.email)?,
            password: present(self.password)?,
        })
    }
}

impl LoginCredentials {
    /// `None` when any field is missing or blank.
    pub fn complete(self) -> Option<CompleteLogin> {
        Some(CompleteLogin {
            email: present(self.email)?,
            password: present(self.password)?,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

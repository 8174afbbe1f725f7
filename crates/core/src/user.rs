//! Registered users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::UserId;

/// A registered user as held by the record store.
///
/// Only the password hash is ever stored; it is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public projection returned by the registration and login endpoints.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// `{id, username, email}` as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Input for creating a user. The password has already been hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> DomainResult<Self> {
        let username = username.into();
        let email = email.into();
        let password_hash = password_hash.into();

        if username.trim().is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if email.trim().is_empty() {
            return Err(DomainError::validation("email must not be empty"));
        }
        if password_hash.is_empty() {
            return Err(DomainError::validation("password hash must not be empty"));
        }

        Ok(Self {
            username,
            email,
            password_hash,
        })
    }

    /// Materialize the stored entity once the store has issued an id.
    pub fn into_user(self, id: UserId, created_at: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_fields() {
        assert!(NewUser::new("", "e@x.com", "h").is_err());
        assert!(NewUser::new("u", "  ", "h").is_err());
        assert!(NewUser::new("u", "e@x.com", "").is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = NewUser::new("u", "e@x.com", "$2b$hash")
            .unwrap()
            .into_user(UserId::new(1), Utc::now());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "e@x.com");
    }
}

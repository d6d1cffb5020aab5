//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{validate_email, validate_username};

/// User entity
///
/// Exactly one of `password_hash` and `oauth_id` is set. Neither is ever
/// serialized into a response.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub oauth_id: Option<String>,
    pub avatar: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a new account proves its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMethod {
    /// Local credentials; holds the argon2 verifier, never the plaintext
    Password { verifier: String },
    /// External identity provider account id
    OAuth { oauth_id: String },
}

/// New user creation payload
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Pre-assigned id; the repository generates one when absent
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub login: LoginMethod,
}

impl NewUser {
    pub fn password_hash(&self) -> Option<&str> {
        match &self.login {
            LoginMethod::Password { verifier } => Some(verifier),
            LoginMethod::OAuth { .. } => None,
        }
    }

    pub fn oauth_id(&self) -> Option<&str> {
        match &self.login {
            LoginMethod::OAuth { oauth_id } => Some(oauth_id),
            LoginMethod::Password { .. } => None,
        }
    }
}

/// Full overwrite of the mutable profile fields
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UpdateUser {
    pub fn validate(&self) -> Result<(), String> {
        validate_username(&self.username)?;
        validate_email(&self.email)
    }
}

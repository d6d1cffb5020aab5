//! Error types for the snipnet service
//!
//! Repositories and the session store return typed outcomes
//! ([`StoreError`], [`SessionError`]); handlers convert them into an
//! [`ApiError`], which renders the JSON envelope and HTTP status. Driver
//! errors are logged in full but never echoed to the client.

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::CacheError;
use thiserror::Error;
use tracing::error;

use crate::response::Envelope;

/// Failures of the password hashing primitive
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The hasher could not produce a verifier
    #[error("failed to hash password: {0}")]
    Hashing(String),

    /// A stored verifier is not a valid PHC string
    #[error("malformed password verifier: {0}")]
    MalformedVerifier(String),
}

/// Outcome of a repository call
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row matched
    #[error("record not found")]
    NotFound,

    /// A unique constraint was violated
    #[error("{field} already exists")]
    Conflict { field: &'static str },

    /// The field name is not on the allow-list for this operation
    #[error("field `{0}` cannot be used here")]
    InvalidField(String),

    /// A value was rejected before reaching storage
    #[error("{0}")]
    Validation(String),

    /// The referenced owner account no longer exists
    #[error("owning account does not exist")]
    MissingOwner,

    /// The storage call did not finish inside its deadline
    #[error("storage deadline of {0:?} elapsed")]
    Timeout(Duration),

    /// The database could not be reached
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// Any other driver error
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return StoreError::NotFound;
        }

        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::Conflict {
                    field: conflicting_field(db_err.constraint()),
                };
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingOwner;
            }
            if db_err.is_check_violation() {
                return StoreError::Validation(
                    "An account signs in either with a password or through OAuth".to_string(),
                );
            }
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err),
            other => StoreError::Database(other),
        }
    }
}

/// Map a unique constraint name onto the user-facing field it protects
fn conflicting_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.contains("username") => "username",
        Some(name) if name.contains("email") => "email",
        Some(name) if name.contains("oauth_id") => "oauth_id",
        Some(name) if name.ends_with("pkey") => "id",
        _ => "record",
    }
}

/// Outcome of a session store call
#[derive(Error, Debug)]
pub enum SessionError {
    /// The token was never issued, was deleted or has expired
    #[error("session not found")]
    NotFound,

    /// The backing cache could not be reached
    #[error("session store unavailable: {0}")]
    Unavailable(#[source] CacheError),

    /// The cache call did not finish inside its deadline
    #[error("session store deadline of {0:?} elapsed")]
    Timeout(Duration),

    /// The stored payload is not a session record
    #[error("stored session could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),

    /// The session record could not be serialized
    #[error("session could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Type alias for Result with SessionError
pub type SessionResult<T> = Result<T, SessionError>;

/// Error type returned by handlers and middleware
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Unique constraint violation (409)
    #[error("{0}")]
    Conflict(String),

    /// Missing row (404)
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credentials, or not the owner (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Infrastructure fault (500); `detail` is a fixed, sanitized string
    #[error("{message}")]
    Internal {
        message: String,
        detail: &'static str,
    },
}

impl ApiError {
    /// Build an internal error with a generic detail
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            detail: "internal error",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Internal { detail, .. } => Some(*detail),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Conflict { field } => ApiError::Conflict(format!("{field} already exists")),
            StoreError::InvalidField(field) => {
                ApiError::Validation(format!("You can't update the `{field}` parameter"))
            }
            StoreError::Validation(message) => ApiError::Validation(message),
            StoreError::MissingOwner => {
                ApiError::Unauthorized("Account no longer exists".to_string())
            }
            StoreError::Timeout(deadline) => {
                error!(?deadline, "Storage call timed out");
                ApiError::Internal {
                    message: "The request timed out, please try again".to_string(),
                    detail: "storage deadline elapsed",
                }
            }
            StoreError::Unavailable(e) | StoreError::Database(e) => {
                error!(error = %e, "Storage call failed");
                ApiError::Internal {
                    message: "An internal error occurred".to_string(),
                    detail: "storage backend error",
                }
            }
            StoreError::Credential(e) => {
                error!(error = %e, "Credential verifier failed");
                ApiError::Internal {
                    message: "An internal error occurred".to_string(),
                    detail: "credential error",
                }
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => ApiError::Unauthorized("Invalid session token".to_string()),
            SessionError::Unavailable(e) => {
                error!(error = %e, "Session store unavailable");
                ApiError::Internal {
                    message: "Unable to reach the session store, please try again".to_string(),
                    detail: "session store error",
                }
            }
            SessionError::Timeout(deadline) => {
                error!(?deadline, "Session store call timed out");
                ApiError::Internal {
                    message: "Unable to reach the session store, please try again".to_string(),
                    detail: "session store deadline elapsed",
                }
            }
            SessionError::Decode(e) => {
                error!(error = %e, "Stored session payload is unreadable");
                ApiError::Internal {
                    message: "An error occurred while validating token".to_string(),
                    detail: "malformed session",
                }
            }
            SessionError::Encode(e) => {
                error!(error = %e, "Session payload could not be encoded");
                ApiError::Internal {
                    message: "An error occurred while creating a new session".to_string(),
                    detail: "session encoding error",
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Envelope::failure(self.to_string(), self.detail().map(str::to_string));
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_field_comes_from_constraint_name() {
        assert_eq!(conflicting_field(Some("users_username_key")), "username");
        assert_eq!(conflicting_field(Some("users_email_key")), "email");
        assert_eq!(conflicting_field(Some("users_oauth_id_key")), "oauth_id");
        assert_eq!(conflicting_field(Some("snippets_pkey")), "id");
        assert_eq!(conflicting_field(None), "record");
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound, StatusCode::NOT_FOUND),
            (
                StoreError::Conflict { field: "email" },
                StatusCode::CONFLICT,
            ),
            (
                StoreError::InvalidField("is_admin".into()),
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::MissingOwner, StatusCode::UNAUTHORIZED),
            (
                StoreError::Timeout(Duration::from_secs(3)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StoreError::Unavailable(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn sqlx_errors_are_classified() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::ColumnNotFound("id".into())),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn missing_session_is_unauthorized() {
        let err = ApiError::from(SessionError::NotFound);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_errors_hide_driver_messages() {
        let err = ApiError::from(StoreError::Database(sqlx::Error::ColumnNotFound(
            "secret_column".into(),
        )));
        assert_eq!(err.detail(), Some("storage backend error"));
        assert!(!err.to_string().contains("secret_column"));
    }
}

//! HTTP handlers

pub mod auth;
pub mod health;
pub mod snippets;
pub mod users;

use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, models::Session};

/// JSON body whose rejection renders as the standard envelope
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                warn!(error = %rejection.body_text(), "Rejected request body");
                ApiError::Validation("No payload attached to req".to_string())
            })?;
        Ok(JsonBody(value))
    }
}

/// Parse a path id; ids that are not UUIDs name nothing that exists
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{resource} with id {raw} not found")))
}

/// Only the owner of a resource may touch it
pub(crate) fn ensure_owner(session: &Session, owner: Uuid) -> Result<(), ApiError> {
    if session.user_id != owner {
        warn!(user_id = %session.user_id, owner = %owner, "Rejected access to another user's resource");
        return Err(ApiError::Unauthorized(
            "You are not authorized to access this resource".to_string(),
        ));
    }
    Ok(())
}

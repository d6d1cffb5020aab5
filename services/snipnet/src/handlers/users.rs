//! User account endpoints; every route here sits behind the auth gate

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use super::{JsonBody, ensure_owner, parse_id};
use crate::{
    AppState,
    error::ApiError,
    listing::{ListParams, ListQuery},
    middleware::AuthSession,
    models::{FieldUpdate, UpdateUser},
    repositories::{UserFieldUpdate, UserLookup},
    response::respond,
};

/// `GET /users`
pub async fn list_users(
    State(state): State<AppState>,
    AuthSession(_session): AuthSession,
) -> Result<Response, ApiError> {
    let users = state.users.list().await?;
    Ok(respond(StatusCode::OK, "Users found", users))
}

/// `GET /users/:id`
pub async fn get_user(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    let user = state.users.get_by_field(UserLookup::Id(id)).await?;
    ensure_owner(&session, user.id)?;

    Ok(respond(StatusCode::OK, "User found", user))
}

/// `PUT /users/:id`
pub async fn update_user(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<UpdateUser>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    ensure_owner(&session, id)?;
    changes.validate().map_err(ApiError::Validation)?;

    let user = state.users.update(id, changes).await?;
    Ok(respond(StatusCode::OK, "User updated", user))
}

/// `PATCH /users/:id` with `{field, value}`
pub async fn update_user_field(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<FieldUpdate>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    ensure_owner(&session, id)?;
    body.validate().map_err(ApiError::Validation)?;

    let update = UserFieldUpdate::parse(&body.field, &body.value, &state.verifier)?;
    let user = state.users.update_field(id, update).await?;
    Ok(respond(StatusCode::OK, "User updated", user))
}

/// `DELETE /users/:id`
///
/// Removes the account with its snippets and revokes every session issued
/// to it.
pub async fn delete_user(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    ensure_owner(&session, id)?;

    state.users.delete(id).await?;
    if let Err(e) = state.sessions.revoke_user(id).await {
        warn!(error = %e, "Account deleted but its sessions could not be revoked");
    }

    info!(user_id = %id, "Account deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `GET /users/:id/snippets`
pub async fn list_user_snippets(
    State(state): State<AppState>,
    AuthSession(_session): AuthSession,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "User")?;
    let query = ListQuery::from_params(&params);

    let snippets = state.snippets.list_for_user(id, &query).await?;
    Ok(respond(StatusCode::OK, "User's snippets found", snippets))
}

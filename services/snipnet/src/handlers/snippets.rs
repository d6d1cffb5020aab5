//! Snippet endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::{JsonBody, ensure_owner, parse_id};
use crate::{
    AppState,
    error::ApiError,
    listing::{ListParams, ListQuery},
    middleware::{AuthSession, MaybeSession},
    models::{FieldUpdate, Session, SnippetPayload, SnippetUpdate, SnippetWithOwner},
    repositories::SnippetField,
    response::respond,
};

/// Fetch a snippet the caller is about to modify
async fn owned_snippet(
    state: &AppState,
    session: &Session,
    raw_id: &str,
) -> Result<SnippetWithOwner, ApiError> {
    let id = parse_id(raw_id, "Snippet")?;
    let existing = state.snippets.get(id).await?;
    ensure_owner(session, existing.snippet.user_id)?;
    Ok(existing)
}

/// `GET /snippets?page=&param=&lang=`
pub async fn list_snippets(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let query = ListQuery::from_params(&params);
    let snippets = state.snippets.list_public(&query).await?;

    if snippets.is_empty() {
        return Err(ApiError::NotFound("No Snippets found".to_string()));
    }

    Ok(respond(StatusCode::OK, "Snippets found", snippets))
}

/// `GET /snippets/:id`
///
/// Private snippets are only shown to their owner. Anonymous callers are
/// told the snippet does not exist.
pub async fn get_snippet(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Snippet")?;
    let snippet = state.snippets.get(id).await?;

    if !snippet.snippet.is_public {
        match &session {
            None => return Err(ApiError::NotFound(format!("Snippet with id {id} not found"))),
            Some(session) => ensure_owner(session, snippet.snippet.user_id)?,
        }
    }

    Ok(respond(StatusCode::OK, "Snippet found", snippet))
}

/// `POST /snippets`
pub async fn create_snippet(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    JsonBody(payload): JsonBody<SnippetPayload>,
) -> Result<Response, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let snippet = state
        .snippets
        .create(payload.into_new(session.user_id))
        .await?;

    info!(snippet_id = %snippet.id, user_id = %session.user_id, "Snippet created");
    Ok(respond(StatusCode::CREATED, "Snippet created", snippet))
}

/// `PUT /snippets/:id`
pub async fn update_snippet(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<SnippetPayload>,
) -> Result<Response, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;
    let existing = owned_snippet(&state, &session, &id).await?;

    let update = SnippetUpdate::from_existing(&existing.snippet, payload);
    let snippet = state.snippets.update(update).await?;
    Ok(respond(StatusCode::OK, "Updated snippet", snippet))
}

/// `PATCH /snippets/:id` with `{field, value}`
pub async fn update_snippet_field(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<FieldUpdate>,
) -> Result<Response, ApiError> {
    body.validate().map_err(ApiError::Validation)?;
    let field: SnippetField = body.field.parse()?;
    let existing = owned_snippet(&state, &session, &id).await?;

    let snippet = state
        .snippets
        .update_field(existing.snippet.id, field, &body.value)
        .await?;
    Ok(respond(StatusCode::OK, "Updated snippet", snippet))
}

/// `DELETE /snippets/:id`
pub async fn delete_snippet(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let existing = owned_snippet(&state, &session, &id).await?;
    state.snippets.delete(existing.snippet.id).await?;

    info!(snippet_id = %existing.snippet.id, "Snippet deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

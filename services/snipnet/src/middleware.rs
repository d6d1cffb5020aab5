//! Bearer session authentication
//!
//! [`auth_gate`] rejects any request without a live session before the
//! wrapped handler runs. [`session_if_present`] attaches a session when one is
//! presented and otherwise lets the request through anonymously. Handlers
//! read the result with the [`AuthSession`] and [`MaybeSession`] extractors.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use crate::{AppState, error::ApiError, error::SessionError, models::Session, sessions};

/// What the `Authorization` header carries
#[derive(Debug, PartialEq, Eq)]
pub enum Bearer<'a> {
    Missing,
    Malformed,
    Token(&'a str),
}

impl<'a> Bearer<'a> {
    pub fn from_headers(headers: &'a HeaderMap) -> Self {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Bearer::Missing;
        };

        match value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
            Some(token) if !token.is_empty() => Bearer::Token(token),
            _ => Bearer::Malformed,
        }
    }

    pub fn token(&self) -> Option<&'a str> {
        match *self {
            Bearer::Token(token) => Some(token),
            _ => None,
        }
    }
}

/// Require a valid session token
pub async fn auth_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match Bearer::from_headers(req.headers()) {
        Bearer::Token(token) => token.to_owned(),
        Bearer::Missing => {
            warn!(path = %req.uri().path(), "Request without Authorization header");
            return Err(ApiError::Unauthorized(
                "Authorization header is required".to_string(),
            ));
        }
        Bearer::Malformed => {
            warn!(path = %req.uri().path(), "Malformed Authorization header");
            return Err(ApiError::Unauthorized(
                "Authorization header must be `Bearer <token>`".to_string(),
            ));
        }
    };

    let session = sessions::lookup(state.sessions.as_ref(), &token).await.inspect_err(|e| {
        if matches!(e, SessionError::NotFound) {
            warn!(path = %req.uri().path(), "Unknown or expired session token");
        }
    })?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Attach a session when a valid token is presented
pub async fn session_if_present(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = Bearer::from_headers(req.headers())
        .token()
        .map(str::to_owned);

    if let Some(token) = token {
        match sessions::lookup(state.sessions.as_ref(), &token).await {
            Ok(session) => {
                req.extensions_mut().insert(session);
            }
            Err(SessionError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(next.run(req).await)
}

/// Session attached by [`auth_gate`]
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AuthSession)
            .ok_or_else(|| {
                error!(path = %parts.uri.path(), "Handler requires a session but the route is not gated");
                ApiError::internal("Session missing from request context")
            })
    }
}

/// Session attached by [`session_if_present`], if any
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<Session>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(Bearer::from_headers(&headers(None)), Bearer::Missing);
        assert_eq!(
            Bearer::from_headers(&headers(Some("Bearer abc123"))),
            Bearer::Token("abc123")
        );
        for malformed in ["Bearer ", "Bearer", "bearer abc123", "Basic dXNlcjpwYXNz", "abc123"] {
            assert_eq!(
                Bearer::from_headers(&headers(Some(malformed))),
                Bearer::Malformed,
                "{malformed:?}"
            );
        }
    }

    #[test]
    fn test_token_is_taken_verbatim() {
        let headers = headers(Some("Bearer  padded "));
        assert_eq!(Bearer::from_headers(&headers).token(), Some(" padded "));
    }
}

//! Account creation, sign-in and sign-out

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::JsonBody;
use crate::{
    AppState,
    error::{ApiError, StoreError},
    middleware::{AuthSession, Bearer},
    models::{LoginMethod, NewUser, Session, User},
    repositories::UserLookup,
    response::{acknowledge, respond},
    sessions::generate_session_token,
    validation::{validate_email, validate_password, validate_required, validate_username},
};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl SignupRequest {
    fn validate(&self) -> Result<(), String> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
}

/// A user together with a freshly issued session token
#[derive(Debug, Serialize)]
pub struct SignedIn {
    #[serde(flatten)]
    pub user: User,
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeUrl {
    pub url: String,
}

/// Mint a token and store its session
async fn open_session(state: &AppState, user_id: Uuid, ttl_seconds: u64) -> Result<String, ApiError> {
    let token = generate_session_token();
    let session = Session::new(user_id, token.clone(), ttl_seconds);
    state.sessions.put(&token, &session, ttl_seconds).await?;

    info!(user_id = %user_id, ttl_seconds, "Session opened");
    Ok(token)
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

/// `POST /signup`
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SignupRequest>,
) -> Result<Response, ApiError> {
    body.validate().map_err(ApiError::Validation)?;

    match state.users.check_exists(&body.username, &body.email).await {
        Ok(existing) => {
            let taken = if existing.username == body.username {
                &body.username
            } else {
                &body.email
            };
            return Err(ApiError::Conflict(format!("{taken} already exists")));
        }
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let verifier = state
        .verifier
        .hash(&body.password)
        .map_err(StoreError::from)?;

    let user = state
        .users
        .create(NewUser {
            id: None,
            username: body.username,
            email: body.email,
            avatar: body.avatar,
            login: LoginMethod::Password { verifier },
        })
        .await?;

    info!(user_id = %user.id, "Account created");
    Ok(respond(StatusCode::CREATED, "Account created successfully", user))
}

/// `POST /signin`
///
/// A bearer token presented alongside the credentials is revoked first.
pub async fn signin(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<SigninRequest>,
) -> Result<Response, ApiError> {
    if let Some(previous) = Bearer::from_headers(&headers).token() {
        if let Err(e) = state.sessions.delete(previous).await {
            warn!(error = %e, "Failed to revoke the previous session");
        }
    }

    validate_required("username", &body.username).map_err(ApiError::Validation)?;
    validate_required("password", &body.password).map_err(ApiError::Validation)?;

    let user = match state
        .users
        .get_by_field(UserLookup::Username(&body.username))
        .await
    {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(invalid_credentials()),
        Err(e) => return Err(e.into()),
    };

    let Some(stored) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "Password sign-in attempted on an OAuth account");
        return Err(invalid_credentials());
    };

    let matches = state
        .verifier
        .verify(&body.password, stored)
        .map_err(StoreError::from)?;
    if !matches {
        warn!(user_id = %user.id, "Password mismatch");
        return Err(invalid_credentials());
    }

    let auth_token = open_session(&state, user.id, state.session_config.ttl_seconds).await?;
    Ok(respond(
        StatusCode::OK,
        "Account signed-in successfully",
        SignedIn { user, auth_token },
    ))
}

/// `POST /signout`
pub async fn signout(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Response, ApiError> {
    state.sessions.delete(&session.session_id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to delete session");
        ApiError::internal("Unable to log you out, please try again")
    })?;

    info!(user_id = %session.user_id, "Session closed");
    Ok(acknowledge(StatusCode::OK, "Account logged out successfully"))
}

fn oauth_disabled() -> ApiError {
    ApiError::NotFound("GitHub sign-in is not enabled".to_string())
}

/// `GET /oauth/github`
pub async fn github_authorize(State(state): State<AppState>) -> Result<Response, ApiError> {
    let oauth = state.oauth.as_ref().ok_or_else(oauth_disabled)?;
    Ok(respond(
        StatusCode::OK,
        "Authorize with GitHub",
        AuthorizeUrl {
            url: oauth.authorize_url(),
        },
    ))
}

/// `POST /oauth/github?code=`
///
/// Finds the account linked to the GitHub id, creating it on first sign-in.
pub async fn github_callback(
    State(state): State<AppState>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Response, ApiError> {
    let oauth = state.oauth.clone().ok_or_else(oauth_disabled)?;
    let code = callback
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("Invalid Code".to_string()))?;

    let profile = oauth.exchange(&code).await?;

    let user = match state
        .users
        .get_by_field(UserLookup::OauthId(&profile.id))
        .await
    {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            let user = state
                .users
                .create(NewUser {
                    id: None,
                    username: profile.login,
                    email: profile.email,
                    avatar: profile.avatar,
                    login: LoginMethod::OAuth {
                        oauth_id: profile.id,
                    },
                })
                .await?;
            info!(user_id = %user.id, "Account created from GitHub profile");
            user
        }
        Err(e) => return Err(e.into()),
    };

    let auth_token = open_session(&state, user.id, state.session_config.oauth_ttl_seconds).await?;
    Ok(respond(
        StatusCode::OK,
        "Account signed-in successfully",
        SignedIn { user, auth_token },
    ))
}

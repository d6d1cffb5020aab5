//! GitHub OAuth2 integration

use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl, basic::BasicClient, reqwest::async_http_client,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::error::ApiError;

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";
const USER_AGENT: &str = concat!("snipnet/", env!("CARGO_PKG_VERSION"));

/// OAuth failures
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("invalid OAuth configuration: {0}")]
    Configuration(String),

    /// The provider refused the authorization code
    #[error("authorization code exchange failed: {0}")]
    Exchange(String),

    /// The profile endpoint failed or returned something unexpected
    #[error("failed to fetch the provider profile: {0}")]
    Profile(String),
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Exchange(e) => {
                tracing::warn!(error = %e, "OAuth code exchange rejected");
                ApiError::Validation("Invalid Code".to_string())
            }
            other => {
                tracing::error!(error = %other, "OAuth provider call failed");
                ApiError::Internal {
                    message: "Invalid Code".to_string(),
                    detail: "oauth provider error",
                }
            }
        }
    }
}

/// Identity returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    /// Provider account id, stable across renames
    pub id: String,
    pub login: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// Turns an authorization code into a provider profile
#[async_trait]
pub trait ProfileExchange: Send + Sync {
    /// URL the client should send the user to
    fn authorize_url(&self) -> String;

    async fn exchange(&self, code: &str) -> Result<OAuthProfile, OAuthError>;
}

/// GitHub OAuth application settings
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: Option<String>,
}

impl GitHubConfig {
    /// Load from the environment
    ///
    /// # Environment Variables
    /// - `GH_CLIENT_ID` and `GH_CLIENT_SECRET`: OAuth application credentials
    /// - `GH_REDIRECT_URL`: optional callback URL
    ///
    /// Returns `None` when the credentials are not set, which disables the
    /// OAuth routes.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GH_CLIENT_ID").ok().filter(|v| !v.is_empty())?;
        let client_secret = std::env::var("GH_CLIENT_SECRET")
            .ok()
            .filter(|v| !v.is_empty())?;
        let redirect_url = std::env::var("GH_REDIRECT_URL")
            .ok()
            .filter(|v| !v.is_empty());

        Some(Self {
            client_id,
            client_secret,
            redirect_url,
        })
    }
}

/// Profile as served by `GET /user`
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    email: Option<String>,
    avatar_url: Option<String>,
}

impl From<GitHubUser> for OAuthProfile {
    fn from(user: GitHubUser) -> Self {
        let email = user
            .email
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("{}@users.noreply.github.com", user.login));
        Self {
            id: user.id.to_string(),
            login: user.login,
            email,
            avatar: user.avatar_url,
        }
    }
}

/// GitHub OAuth client
#[derive(Clone)]
pub struct GitHubOAuth {
    client: BasicClient,
    http: reqwest::Client,
}

impl GitHubOAuth {
    pub fn new(config: GitHubConfig) -> Result<Self, OAuthError> {
        let invalid = |e: oauth2::url::ParseError| OAuthError::Configuration(e.to_string());

        let mut client = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            AuthUrl::new(GITHUB_AUTH_URL.to_string()).map_err(invalid)?,
            Some(TokenUrl::new(GITHUB_TOKEN_URL.to_string()).map_err(invalid)?),
        );
        if let Some(url) = config.redirect_url {
            client = client.set_redirect_uri(RedirectUrl::new(url).map_err(invalid)?);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OAuthError::Configuration(e.to_string()))?;

        Ok(Self { client, http })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let response = self
            .http
            .get(GITHUB_USER_URL)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::Profile(format!(
                "GitHub answered {}",
                response.status()
            )));
        }

        let user: GitHubUser = response
            .json()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;
        Ok(user.into())
    }
}

#[async_trait]
impl ProfileExchange for GitHubOAuth {
    fn authorize_url(&self) -> String {
        let (url, _csrf) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("read:user".to_string()))
            .add_scope(Scope::new("user:email".to_string()))
            .url();
        url.to_string()
    }

    async fn exchange(&self, code: &str) -> Result<OAuthProfile, OAuthError> {
        info!("Exchanging GitHub authorization code");

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        self.fetch_profile(token.access_token().secret()).await
    }
}

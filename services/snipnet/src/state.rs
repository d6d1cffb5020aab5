//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    config::SessionConfig,
    credentials::CredentialVerifier,
    memory::{MemorySessionStore, MemorySnippetStore, MemoryUserStore},
    oauth::ProfileExchange,
    repositories::{SnippetStore, UserStore},
    sessions::SessionStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub snippets: Arc<dyn SnippetStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub verifier: CredentialVerifier,
    /// Absent when GitHub OAuth is not configured
    pub oauth: Option<Arc<dyn ProfileExchange>>,
    pub session_config: SessionConfig,
}

impl AppState {
    /// State backed entirely by in-process stores
    pub fn in_memory(verifier: CredentialVerifier, session_config: SessionConfig) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        Self {
            snippets: Arc::new(MemorySnippetStore::new(users.clone())),
            users,
            sessions: Arc::new(MemorySessionStore::new()),
            verifier,
            oauth: None,
            session_config,
        }
    }

    pub fn with_oauth(mut self, oauth: Arc<dyn ProfileExchange>) -> Self {
        self.oauth = Some(oauth);
        self
    }
}

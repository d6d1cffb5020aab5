//! Repositories for database operations

pub mod snippet;
pub mod user;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{StoreError, StoreResult},
    listing::ListQuery,
    models::{NewSnippet, NewUser, Snippet, SnippetUpdate, SnippetWithOwner, UpdateUser, User},
};

pub use snippet::{SnippetField, SnippetRepository};
pub use user::{UserFieldUpdate, UserLookup, UserRepository};

/// Deadline applied to every storage call
pub const STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Run a storage call under [`STORE_TIMEOUT`]
pub(crate) async fn bounded<T, F>(call: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::time::timeout(STORE_TIMEOUT, call)
        .await
        .map_err(|_| StoreError::Timeout(STORE_TIMEOUT))?
        .map_err(StoreError::from)
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_field(&self, lookup: UserLookup<'_>) -> StoreResult<User>;

    /// First user whose username or email collides with the given values
    async fn check_exists(&self, username: &str, email: &str) -> StoreResult<User>;

    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn list(&self) -> StoreResult<Vec<User>>;

    async fn update_field(&self, id: Uuid, update: UserFieldUpdate) -> StoreResult<User>;

    async fn update(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Snippet persistence
#[async_trait]
pub trait SnippetStore: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<SnippetWithOwner>;

    /// Public snippets, newest first
    async fn list_public(&self, query: &ListQuery) -> StoreResult<Vec<SnippetWithOwner>>;

    /// Public snippets of one owner, newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        query: &ListQuery,
    ) -> StoreResult<Vec<SnippetWithOwner>>;

    async fn create(&self, snippet: NewSnippet) -> StoreResult<Snippet>;

    async fn update_field(&self, id: Uuid, field: SnippetField, value: &str)
    -> StoreResult<Snippet>;

    async fn update(&self, update: SnippetUpdate) -> StoreResult<Snippet>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<bool>;
}

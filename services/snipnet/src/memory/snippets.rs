use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::MemoryUserStore;
use crate::{
    error::{StoreError, StoreResult},
    listing::ListQuery,
    models::{NewSnippet, Snippet, SnippetUpdate, SnippetWithOwner, User},
    repositories::{SnippetField, SnippetStore},
};

struct Entry {
    snippet: Snippet,
    /// Write sequence number, breaks ties between equal timestamps
    revision: u64,
}

#[derive(Default)]
struct Table {
    rows: HashMap<Uuid, Entry>,
    next_revision: u64,
}

impl Table {
    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }
}

/// Snippet store held in process memory
///
/// Owners are resolved through the shared [`MemoryUserStore`]. A snippet
/// whose owner is gone is never returned and is dropped on the next write.
pub struct MemorySnippetStore {
    users: Arc<MemoryUserStore>,
    table: RwLock<Table>,
}

impl MemorySnippetStore {
    pub fn new(users: Arc<MemoryUserStore>) -> Self {
        Self {
            users,
            table: RwLock::new(Table::default()),
        }
    }

    async fn with_owner(&self, snippet: Snippet) -> Option<SnippetWithOwner> {
        let owner = self.users.find(snippet.user_id).await?;
        Some(joined(snippet, &owner))
    }

    async fn listing(
        &self,
        owner: Option<Uuid>,
        query: &ListQuery,
    ) -> StoreResult<Vec<SnippetWithOwner>> {
        let terms: Vec<String> = query.terms().collect();
        let users = self.users.all().await;
        let table = self.table.read().await;

        let mut matches: Vec<(&Entry, &User)> = table
            .rows
            .values()
            .filter(|e| e.snippet.is_public)
            .filter(|e| owner.is_none_or(|id| e.snippet.user_id == id))
            .filter(|e| query.language.is_empty() || e.snippet.language == query.language)
            .filter(|e| terms.iter().all(|t| document_contains(&e.snippet, t)))
            .filter_map(|e| users.get(&e.snippet.user_id).map(|u| (e, u)))
            .collect();
        matches.sort_by(|(a, _), (b, _)| {
            (b.snippet.updated_at, b.revision).cmp(&(a.snippet.updated_at, a.revision))
        });

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(0);

        Ok(matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(entry, user)| joined(entry.snippet.clone(), user))
            .collect())
    }

    /// Drop rows whose owner has been deleted, as `ON DELETE CASCADE` does
    async fn purge_orphans(&self) {
        let users = self.users.all().await;
        let mut table = self.table.write().await;
        table.rows.retain(|_, e| users.contains_key(&e.snippet.user_id));
    }
}

fn joined(snippet: Snippet, owner: &User) -> SnippetWithOwner {
    SnippetWithOwner {
        snippet,
        username: owner.username.clone(),
        email: owner.email.clone(),
        avatar: owner.avatar.clone(),
    }
}

/// Whole-word, case-insensitive match against the searchable text
fn document_contains(snippet: &Snippet, term: &str) -> bool {
    [&snippet.title, &snippet.description, &snippet.code]
        .into_iter()
        .flat_map(|text| text.split(|c: char| !c.is_alphanumeric()))
        .any(|word| word.to_lowercase() == term)
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn get(&self, id: Uuid) -> StoreResult<SnippetWithOwner> {
        let snippet = self
            .table
            .read()
            .await
            .rows
            .get(&id)
            .map(|e| e.snippet.clone())
            .ok_or(StoreError::NotFound)?;

        self.with_owner(snippet).await.ok_or(StoreError::NotFound)
    }

    async fn list_public(&self, query: &ListQuery) -> StoreResult<Vec<SnippetWithOwner>> {
        self.listing(None, query).await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        query: &ListQuery,
    ) -> StoreResult<Vec<SnippetWithOwner>> {
        self.listing(Some(user_id), query).await
    }

    async fn create(&self, snippet: NewSnippet) -> StoreResult<Snippet> {
        self.purge_orphans().await;
        if self.users.find(snippet.user_id).await.is_none() {
            return Err(StoreError::MissingOwner);
        }

        let now = Utc::now();
        let record = Snippet {
            id: Uuid::new_v4(),
            user_id: snippet.user_id,
            title: snippet.title,
            description: snippet.description,
            language: snippet.language,
            code: snippet.code,
            is_public: snippet.is_public,
            created_at: now,
            updated_at: now,
        };

        let mut table = self.table.write().await;
        let revision = table.bump();
        table.rows.insert(
            record.id,
            Entry {
                snippet: record.clone(),
                revision,
            },
        );
        Ok(record)
    }

    async fn update_field(
        &self,
        id: Uuid,
        field: SnippetField,
        value: &str,
    ) -> StoreResult<Snippet> {
        let mut table = self.table.write().await;
        let revision = table.bump();
        let entry = table.rows.get_mut(&id).ok_or(StoreError::NotFound)?;

        let target = match field {
            SnippetField::Title => &mut entry.snippet.title,
            SnippetField::Description => &mut entry.snippet.description,
            SnippetField::Code => &mut entry.snippet.code,
        };
        *target = value.to_string();
        entry.snippet.updated_at = Utc::now();
        entry.revision = revision;

        Ok(entry.snippet.clone())
    }

    async fn update(&self, update: SnippetUpdate) -> StoreResult<Snippet> {
        let mut table = self.table.write().await;
        let revision = table.bump();
        let entry = table
            .rows
            .get_mut(&update.id)
            .filter(|e| e.snippet.user_id == update.user_id)
            .ok_or(StoreError::NotFound)?;

        entry.snippet.title = update.title;
        entry.snippet.description = update.description;
        entry.snippet.language = update.language;
        entry.snippet.code = update.code;
        entry.snippet.updated_at = Utc::now();
        entry.revision = revision;

        Ok(entry.snippet.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

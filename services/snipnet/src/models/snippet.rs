//! Snippet model and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{validate_language, validate_required};

/// Snippet entity
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Snippet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub language: String,
    pub code: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snippet joined with its owner's public profile
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SnippetWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub snippet: Snippet,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// New snippet as handed to the repository; the id is assigned there
#[derive(Debug, Clone)]
pub struct NewSnippet {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub language: String,
    pub code: String,
    pub is_public: bool,
}

/// Multi-field overwrite of a snippet
///
/// `id` and `user_id` are taken from the stored record, never from the
/// request body.
#[derive(Debug, Clone)]
pub struct SnippetUpdate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub language: String,
    pub code: String,
}

impl SnippetUpdate {
    pub fn from_existing(existing: &Snippet, payload: SnippetPayload) -> Self {
        Self {
            id: existing.id,
            user_id: existing.user_id,
            title: payload.title,
            description: payload.description,
            language: payload.language,
            code: payload.code,
        }
    }
}

/// Request body for creating or fully updating a snippet
#[derive(Debug, Clone, Deserialize)]
pub struct SnippetPayload {
    pub title: String,
    pub description: String,
    pub language: String,
    pub code: String,
    /// Only honoured on creation; snippets are public unless stated otherwise
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl SnippetPayload {
    pub fn validate(&self) -> Result<(), String> {
        validate_required("title", &self.title)?;
        validate_required("description", &self.description)?;
        validate_language(&self.language)?;
        validate_required("code", &self.code)
    }

    pub fn into_new(self, user_id: Uuid) -> NewSnippet {
        NewSnippet {
            user_id,
            title: self.title,
            description: self.description,
            language: self.language,
            code: self.code,
            is_public: self.is_public.unwrap_or(true),
        }
    }
}

/// Request body for a single-field update
#[derive(Debug, Clone, Deserialize)]
pub struct FieldUpdate {
    pub field: String,
    pub value: String,
}

impl FieldUpdate {
    pub fn validate(&self) -> Result<(), String> {
        validate_required("field", &self.field)?;
        validate_required("value", &self.value)
    }
}

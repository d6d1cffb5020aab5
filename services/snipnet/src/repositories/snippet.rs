//! Snippet repository for database operations

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{STORE_TIMEOUT, SnippetStore, bounded};
use crate::{
    error::{StoreError, StoreResult},
    listing::ListQuery,
    models::{NewSnippet, Snippet, SnippetUpdate, SnippetWithOwner},
};

const SNIPPET_COLUMNS: &str =
    "id, user_id, title, description, language, code, is_public, created_at, updated_at";

const JOINED_COLUMNS: &str = "s.id, s.user_id, s.title, s.description, s.language, s.code, \
     s.is_public, s.created_at, s.updated_at, u.username, u.email, u.avatar";

/// Snippet columns that may be changed one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetField {
    Title,
    Description,
    Code,
}

impl SnippetField {
    pub fn column(&self) -> &'static str {
        match self {
            SnippetField::Title => "title",
            SnippetField::Description => "description",
            SnippetField::Code => "code",
        }
    }
}

impl FromStr for SnippetField {
    type Err = StoreError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        match field {
            "title" => Ok(SnippetField::Title),
            "description" => Ok(SnippetField::Description),
            "code" => Ok(SnippetField::Code),
            other => Err(StoreError::InvalidField(other.to_string())),
        }
    }
}

/// PostgreSQL snippet repository
#[derive(Clone)]
pub struct SnippetRepository {
    pool: PgPool,
}

impl SnippetRepository {
    /// Create a new snippet repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for SnippetRepository {
    async fn get(&self, id: Uuid) -> StoreResult<SnippetWithOwner> {
        let sql = format!(
            "SELECT {JOINED_COLUMNS} FROM snippets s JOIN users u ON u.id = s.user_id WHERE s.id = $1"
        );
        bounded(
            sqlx::query_as::<_, SnippetWithOwner>(&sql)
                .bind(id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn list_public(&self, query: &ListQuery) -> StoreResult<Vec<SnippetWithOwner>> {
        let sql = format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM snippets s
            JOIN users u ON u.id = s.user_id
            WHERE s.is_public
              AND ($1::text = '' OR s.document @@ to_tsquery('english', $1))
              AND ($2::text = '' OR s.language = $2)
            ORDER BY s.updated_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        bounded(
            sqlx::query_as::<_, SnippetWithOwner>(&sql)
                .bind(&query.search)
                .bind(&query.language)
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        query: &ListQuery,
    ) -> StoreResult<Vec<SnippetWithOwner>> {
        let sql = format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM snippets s
            JOIN users u ON u.id = s.user_id
            WHERE s.is_public
              AND s.user_id = $1
              AND ($2::text = '' OR s.document @@ to_tsquery('english', $2))
              AND ($3::text = '' OR s.language = $3)
            ORDER BY s.updated_at DESC
            LIMIT $4 OFFSET $5
            "#
        );
        bounded(
            sqlx::query_as::<_, SnippetWithOwner>(&sql)
                .bind(user_id)
                .bind(&query.search)
                .bind(&query.language)
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn create(&self, snippet: NewSnippet) -> StoreResult<Snippet> {
        let id = Uuid::new_v4();
        info!(snippet_id = %id, user_id = %snippet.user_id, "Creating snippet");

        let sql = format!(
            r#"
            INSERT INTO snippets (id, user_id, title, description, language, code, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SNIPPET_COLUMNS}
            "#
        );
        bounded(
            sqlx::query_as::<_, Snippet>(&sql)
                .bind(id)
                .bind(snippet.user_id)
                .bind(&snippet.title)
                .bind(&snippet.description)
                .bind(&snippet.language)
                .bind(&snippet.code)
                .bind(snippet.is_public)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn update_field(
        &self,
        id: Uuid,
        field: SnippetField,
        value: &str,
    ) -> StoreResult<Snippet> {
        info!(snippet_id = %id, field = field.column(), "Updating snippet field");

        let sql = format!(
            "UPDATE snippets SET {} = $1, updated_at = NOW() WHERE id = $2 RETURNING {SNIPPET_COLUMNS}",
            field.column()
        );
        bounded(
            sqlx::query_as::<_, Snippet>(&sql)
                .bind(value)
                .bind(id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn update(&self, update: SnippetUpdate) -> StoreResult<Snippet> {
        info!(snippet_id = %update.id, "Updating snippet");

        let sql = format!(
            r#"
            UPDATE snippets
            SET title = $1, description = $2, language = $3, code = $4, updated_at = NOW()
            WHERE id = $5 AND user_id = $6
            RETURNING {SNIPPET_COLUMNS}
            "#
        );
        bounded(
            sqlx::query_as::<_, Snippet>(&sql)
                .bind(&update.title)
                .bind(&update.description)
                .bind(&update.language)
                .bind(&update.code)
                .bind(update.id)
                .bind(update.user_id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = bounded(
            sqlx::query("DELETE FROM snippets WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        info!(snippet_id = %id, "Snippet deleted");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        let healthy = tokio::time::timeout(STORE_TIMEOUT, common::database::health_check(&self.pool))
            .await
            .map_err(|_| StoreError::Timeout(STORE_TIMEOUT))?;
        Ok(matches!(healthy, Ok(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_content_fields_are_updatable() {
        assert_eq!("title".parse::<SnippetField>().unwrap(), SnippetField::Title);
        assert_eq!("code".parse::<SnippetField>().unwrap().column(), "code");

        for field in ["is_public", "user_id", "language", "id", "title; DROP TABLE"] {
            assert!(matches!(
                field.parse::<SnippetField>(),
                Err(StoreError::InvalidField(f)) if f == field
            ));
        }
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL at DATABASE_URL"]
    async fn postgres_search_and_pagination() {
        use crate::{
            listing::{ListParams, ListQuery},
            models::{LoginMethod, NewUser},
            repositories::{UserRepository, UserStore},
        };
        use common::database::{DatabaseConfig, init_pool};

        let pool = init_pool(&DatabaseConfig::from_env().unwrap())
            .await
            .unwrap();
        let users = UserRepository::new(pool.clone());
        let snippets = SnippetRepository::new(pool);

        let suffix = Uuid::new_v4().simple().to_string();
        let owner = users
            .create(NewUser {
                id: None,
                username: format!("s-{}", &suffix[..8]),
                email: format!("s-{}@example.com", &suffix[..8]),
                avatar: None,
                login: LoginMethod::OAuth {
                    oauth_id: suffix.clone(),
                },
            })
            .await
            .unwrap();

        let language = format!("lang{}", &suffix[..6]);
        snippets
            .create(NewSnippet {
                user_id: owner.id,
                title: "foo bar".into(),
                description: "demo".into(),
                language: language.clone(),
                code: "print()".into(),
                is_public: true,
            })
            .await
            .unwrap();

        let search = |text: &str| {
            ListQuery::from_params(&ListParams {
                page: None,
                param: Some(text.into()),
                lang: Some(language.clone()),
            })
        };
        assert_eq!(snippets.list_public(&search("foo")).await.unwrap().len(), 1);
        assert_eq!(snippets.list_public(&search("bar")).await.unwrap().len(), 1);
        assert!(snippets.list_public(&search("baz")).await.unwrap().is_empty());
        assert!(snippets.list_public(&search("(foo")).await.is_ok());

        users.delete(owner.id).await.unwrap();
    }
}

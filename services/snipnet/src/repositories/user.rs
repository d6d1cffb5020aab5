//! User repository for database operations

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{UserStore, bounded};
use crate::{
    credentials::CredentialVerifier,
    error::{StoreError, StoreResult},
    models::{NewUser, UpdateUser, User},
    validation::{validate_email, validate_password, validate_username},
};

const USER_COLUMNS: &str =
    "id, username, email, oauth_id, avatar, password_hash, created_at, updated_at";

/// A unique user attribute to look a record up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup<'a> {
    Id(Uuid),
    Username(&'a str),
    Email(&'a str),
    OauthId(&'a str),
}

impl<'a> UserLookup<'a> {
    /// Build a lookup from a caller-supplied field name
    ///
    /// An id that is not a UUID cannot match any row and is reported as
    /// `NotFound`.
    pub fn parse(field: &str, value: &'a str) -> StoreResult<Self> {
        match field {
            "id" => Uuid::parse_str(value)
                .map(UserLookup::Id)
                .map_err(|_| StoreError::NotFound),
            "username" => Ok(UserLookup::Username(value)),
            "email" => Ok(UserLookup::Email(value)),
            "oauth_id" => Ok(UserLookup::OauthId(value)),
            other => Err(StoreError::InvalidField(other.to_string())),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            UserLookup::Id(_) => "id",
            UserLookup::Username(_) => "username",
            UserLookup::Email(_) => "email",
            UserLookup::OauthId(_) => "oauth_id",
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        match *self {
            UserLookup::Id(id) => user.id == id,
            UserLookup::Username(username) => user.username == username,
            UserLookup::Email(email) => user.email == email,
            UserLookup::OauthId(oauth_id) => user.oauth_id.as_deref() == Some(oauth_id),
        }
    }
}

/// A validated single-field change to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFieldUpdate {
    Email(String),
    Username(String),
    /// Holds the new verifier, never the plaintext
    Password(String),
}

impl UserFieldUpdate {
    /// Check `field` against the allow-list and prepare `value` for storage
    pub fn parse(field: &str, value: &str, verifier: &CredentialVerifier) -> StoreResult<Self> {
        match field {
            "email" => {
                validate_email(value).map_err(StoreError::Validation)?;
                Ok(UserFieldUpdate::Email(value.to_string()))
            }
            "username" => {
                validate_username(value).map_err(StoreError::Validation)?;
                Ok(UserFieldUpdate::Username(value.to_string()))
            }
            "password" => {
                validate_password(value).map_err(StoreError::Validation)?;
                Ok(UserFieldUpdate::Password(verifier.hash(value)?))
            }
            other => Err(StoreError::InvalidField(other.to_string())),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            UserFieldUpdate::Email(_) => "email",
            UserFieldUpdate::Username(_) => "username",
            UserFieldUpdate::Password(_) => "password_hash",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            UserFieldUpdate::Email(v) | UserFieldUpdate::Username(v) | UserFieldUpdate::Password(v) => v,
        }
    }
}

/// PostgreSQL user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_by_field(&self, lookup: UserLookup<'_>) -> StoreResult<User> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} = $1",
            lookup.column()
        );
        let query = sqlx::query_as::<_, User>(&sql);
        let query = match lookup {
            UserLookup::Id(id) => query.bind(id),
            UserLookup::Username(v) | UserLookup::Email(v) | UserLookup::OauthId(v) => {
                query.bind(v)
            }
        };

        bounded(query.fetch_one(&self.pool)).await
    }

    async fn check_exists(&self, username: &str, email: &str) -> StoreResult<User> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 LIMIT 1"
        );
        bounded(
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let id = user.id.unwrap_or_else(Uuid::new_v4);
        info!(user_id = %id, username = %user.username, "Creating new user");

        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, oauth_id, avatar, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        bounded(
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(user.oauth_id())
                .bind(&user.avatar)
                .bind(user.password_hash())
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        bounded(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool)).await
    }

    async fn update_field(&self, id: Uuid, update: UserFieldUpdate) -> StoreResult<User> {
        info!(user_id = %id, field = update.column(), "Updating user field");

        let sql = format!(
            "UPDATE users SET {} = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}",
            update.column()
        );
        bounded(
            sqlx::query_as::<_, User>(&sql)
                .bind(update.value())
                .bind(id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User> {
        info!(user_id = %id, "Updating user profile");

        let sql = format!(
            r#"
            UPDATE users
            SET username = $1, email = $2, avatar = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {USER_COLUMNS}
            "#
        );
        bounded(
            sqlx::query_as::<_, User>(&sql)
                .bind(&changes.username)
                .bind(&changes.email)
                .bind(&changes.avatar)
                .bind(id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = bounded(
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::with_cost(64, 1).unwrap()
    }

    #[test]
    fn lookup_rejects_unknown_fields() {
        assert!(matches!(
            UserLookup::parse("password_hash", "x"),
            Err(StoreError::InvalidField(f)) if f == "password_hash"
        ));
        assert!(matches!(
            UserLookup::parse("id", "not-a-uuid"),
            Err(StoreError::NotFound)
        ));

        let lookup = UserLookup::parse("email", "dev@example.com").unwrap();
        assert_eq!(lookup, UserLookup::Email("dev@example.com"));
        assert_eq!(lookup.column(), "email");
    }

    #[test]
    fn field_update_allow_list() {
        let verifier = verifier();

        assert!(matches!(
            UserFieldUpdate::parse("is_admin", "true", &verifier),
            Err(StoreError::InvalidField(f)) if f == "is_admin"
        ));
        assert!(matches!(
            UserFieldUpdate::parse("id", "00000000-0000-0000-0000-000000000000", &verifier),
            Err(StoreError::InvalidField(_))
        ));
        assert!(matches!(
            UserFieldUpdate::parse("email", "nope", &verifier),
            Err(StoreError::Validation(_))
        ));

        let update = UserFieldUpdate::parse("username", "new-name", &verifier).unwrap();
        assert_eq!(update.column(), "username");
        assert_eq!(update.value(), "new-name");
    }

    #[test]
    fn password_updates_store_a_verifier() {
        let verifier = verifier();
        let update = UserFieldUpdate::parse("password", "N3w!password", &verifier).unwrap();

        assert_eq!(update.column(), "password_hash");
        assert_ne!(update.value(), "N3w!password");
        assert!(verifier.verify("N3w!password", update.value()).unwrap());

        assert!(matches!(
            UserFieldUpdate::parse("password", "weak", &verifier),
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL at DATABASE_URL"]
    async fn postgres_create_lookup_and_conflict() {
        use crate::models::LoginMethod;
        use common::database::{DatabaseConfig, init_pool};

        let pool = init_pool(&DatabaseConfig::from_env().unwrap())
            .await
            .unwrap();
        let repo = UserRepository::new(pool);
        let verifier = verifier();

        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        let username = format!("pg-{suffix}");
        let new_user = NewUser {
            id: None,
            username: username.clone(),
            email: format!("{username}@example.com"),
            avatar: None,
            login: LoginMethod::Password {
                verifier: verifier.hash("S3cret!pass").unwrap(),
            },
        };

        let created = repo.create(new_user.clone()).await.unwrap();
        let found = repo
            .get_by_field(UserLookup::Username(&username))
            .await
            .unwrap();
        assert_eq!(found.id, created.id);

        assert!(matches!(
            repo.create(new_user).await,
            Err(StoreError::Conflict { .. })
        ));

        repo.delete(created.id).await.unwrap();
        assert!(matches!(
            repo.delete(created.id).await,
            Err(StoreError::NotFound)
        ));
    }
}

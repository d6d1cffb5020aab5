use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::{
    error::{StoreError, StoreResult},
    models::{NewUser, UpdateUser, User},
    repositories::{UserFieldUpdate, UserLookup, UserStore},
};

/// User store held in process memory
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn find(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    /// Read access to every stored user, keyed by id
    pub(crate) async fn all(&self) -> RwLockReadGuard<'_, HashMap<Uuid, User>> {
        self.users.read().await
    }
}

/// Field of the first record, other than `skip`, that `candidate` collides with
fn unique_violation<'a>(
    users: impl Iterator<Item = &'a User>,
    skip: Option<Uuid>,
    candidate: &User,
) -> Option<&'static str> {
    users.filter(|u| Some(u.id) != skip).find_map(|u| {
        if u.id == candidate.id {
            Some("id")
        } else if u.username == candidate.username {
            Some("username")
        } else if u.email == candidate.email {
            Some("email")
        } else if u.oauth_id.is_some() && u.oauth_id == candidate.oauth_id {
            Some("oauth_id")
        } else {
            None
        }
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_field(&self, lookup: UserLookup<'_>) -> StoreResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| lookup.matches(u))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn check_exists(&self, username: &str, email: &str) -> StoreResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let now = Utc::now();
        let record = User {
            id: user.id.unwrap_or_else(Uuid::new_v4),
            username: user.username.clone(),
            email: user.email.clone(),
            oauth_id: user.oauth_id().map(str::to_string),
            avatar: user.avatar.clone(),
            password_hash: user.password_hash().map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        let mut users = self.users.write().await;
        if let Some(field) = unique_violation(users.values(), None, &record) {
            return Err(StoreError::Conflict { field });
        }
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update_field(&self, id: Uuid, update: UserFieldUpdate) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let mut record = users.get(&id).cloned().ok_or(StoreError::NotFound)?;

        match update {
            UserFieldUpdate::Email(email) => record.email = email,
            UserFieldUpdate::Username(username) => record.username = username,
            UserFieldUpdate::Password(verifier) => {
                if record.oauth_id.is_some() {
                    return Err(StoreError::Validation(
                        "An account signs in either with a password or through OAuth".to_string(),
                    ));
                }
                record.password_hash = Some(verifier);
            }
        }
        record.updated_at = Utc::now();

        if let Some(field) = unique_violation(users.values(), Some(id), &record) {
            return Err(StoreError::Conflict { field });
        }
        users.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let mut record = users.get(&id).cloned().ok_or(StoreError::NotFound)?;

        record.username = changes.username;
        record.email = changes.email;
        record.avatar = changes.avatar;
        record.updated_at = Utc::now();

        if let Some(field) = unique_violation(users.values(), Some(id), &record) {
            return Err(StoreError::Conflict { field });
        }
        users.insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

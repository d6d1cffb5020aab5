use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{sync::RwLock, time::Instant};
use uuid::Uuid;

use crate::{
    error::{SessionError, SessionResult},
    models::Session,
    sessions::{SessionStore, session_key},
};

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// Session store held in process memory
///
/// Entries keep the serialized payload, as the Redis store does, and expire
/// on the tokio clock. Expired entries are swept on every write.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary payload under `token`
    pub async fn put_raw(&self, token: &str, payload: String, ttl_seconds: u64) {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(ttl_seconds);

        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(session_key(token), Entry { payload, expires_at });
    }

    /// Number of entries held, live or not
    pub async fn stored(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, token: &str, session: &Session, ttl_seconds: u64) -> SessionResult<()> {
        let payload = serde_json::to_string(session).map_err(SessionError::Encode)?;
        self.put_raw(token, payload, ttl_seconds).await;
        Ok(())
    }

    async fn get(&self, token: &str) -> SessionResult<Session> {
        let key = session_key(token);
        let mut entries = self.entries.write().await;

        let payload = match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => entry.payload.clone(),
            Some(_) => {
                entries.remove(&key);
                return Err(SessionError::NotFound);
            }
            None => return Err(SessionError::NotFound),
        };
        drop(entries);

        serde_json::from_str(&payload).map_err(SessionError::Decode)
    }

    async fn delete(&self, token: &str) -> SessionResult<()> {
        self.entries.write().await.remove(&session_key(token));
        Ok(())
    }

    async fn revoke_user(&self, user_id: Uuid) -> SessionResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);

        let before = entries.len();
        entries.retain(|_, e| {
            serde_json::from_str::<Session>(&e.payload)
                .map_or(true, |session| session.user_id != user_id)
        });
        Ok((before - entries.len()) as u64)
    }

    async fn health_check(&self) -> SessionResult<bool> {
        Ok(true)
    }
}

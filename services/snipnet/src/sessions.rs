//! Session storage
//!
//! A session token is an opaque bearer credential. The store maps it to a
//! [`Session`] record that expires on its own once its TTL runs out; an
//! expired, deleted or never-issued token all look the same to callers
//! ([`SessionError::NotFound`]).

use std::time::Duration;

use async_trait::async_trait;
use common::cache::RedisPool;
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{SessionError, SessionResult},
    models::Session,
};

/// Prefix of every session key in the cache
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Deadline applied to every cache round trip
pub const SESSION_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// 43 alphanumeric characters carry just over 256 bits of entropy
const TOKEN_LENGTH: usize = 43;

/// Draw a fresh session token from the OS random source
pub fn generate_session_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

/// Key of the set holding every token issued to `user_id`
pub fn user_sessions_key(user_id: Uuid) -> String {
    format!("user_sessions:{user_id}")
}

/// Resolve `token` under [`SESSION_STORE_TIMEOUT`], whatever the store
pub async fn lookup(store: &dyn SessionStore, token: &str) -> SessionResult<Session> {
    tokio::time::timeout(SESSION_STORE_TIMEOUT, store.get(token))
        .await
        .map_err(|_| SessionError::Timeout(SESSION_STORE_TIMEOUT))?
}

/// Token to session mapping with per-entry expiry
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `session` under `token` for `ttl_seconds`, overwriting any
    /// previous entry
    async fn put(&self, token: &str, session: &Session, ttl_seconds: u64) -> SessionResult<()>;

    /// Resolve a token
    async fn get(&self, token: &str) -> SessionResult<Session>;

    /// Remove a token; absent tokens are not an error
    async fn delete(&self, token: &str) -> SessionResult<()>;

    /// Remove every token issued to `user_id`, returning how many were live
    async fn revoke_user(&self, user_id: Uuid) -> SessionResult<u64>;

    async fn health_check(&self) -> SessionResult<bool>;
}

/// Redis-backed session store
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: RedisPool,
    timeout: Duration,
}

impl RedisSessionStore {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            timeout: SESSION_STORE_TIMEOUT,
        }
    }

    async fn bounded<T, F>(&self, call: F) -> SessionResult<T>
    where
        F: Future<Output = common::error::CacheResult<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| SessionError::Timeout(self.timeout))?
            .map_err(SessionError::Unavailable)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, token: &str, session: &Session, ttl_seconds: u64) -> SessionResult<()> {
        let payload = serde_json::to_string(session).map_err(SessionError::Encode)?;
        let key = session_key(token);
        self.bounded(self.pool.set(&key, &payload, Some(ttl_seconds)))
            .await?;
        self.bounded(
            self.pool
                .set_add(&user_sessions_key(session.user_id), token, ttl_seconds),
        )
        .await?;

        info!(user_id = %session.user_id, ttl_seconds, "Session stored");
        Ok(())
    }

    async fn get(&self, token: &str) -> SessionResult<Session> {
        let key = session_key(token);
        let payload = self
            .bounded(self.pool.get(&key))
            .await?
            .ok_or(SessionError::NotFound)?;

        let session: Session = serde_json::from_str(&payload).map_err(SessionError::Decode)?;

        // Redis expires the key itself; the timestamp guards against clock
        // skew between the cache and this process
        if session.is_expired() {
            debug!(user_id = %session.user_id, "Session past its expiry time");
            return Err(SessionError::NotFound);
        }

        Ok(session)
    }

    async fn delete(&self, token: &str) -> SessionResult<()> {
        let key = session_key(token);
        let existed = self.bounded(self.pool.delete(&key)).await?;
        debug!(existed, "Session deleted");
        Ok(())
    }

    async fn revoke_user(&self, user_id: Uuid) -> SessionResult<u64> {
        let tokens = self
            .bounded(self.pool.set_take(&user_sessions_key(user_id)))
            .await?;
        let keys: Vec<String> = tokens.iter().map(|t| session_key(t)).collect();
        let revoked = self.bounded(self.pool.delete_many(&keys)).await?;

        info!(%user_id, revoked, "Sessions revoked");
        Ok(revoked)
    }

    async fn health_check(&self) -> SessionResult<bool> {
        self.bounded(self.pool.health_check()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_long_alphanumeric_and_distinct() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_session_token()).collect();
        assert_eq!(tokens.len(), 256);

        for token in &tokens {
            assert_eq!(token.len(), TOKEN_LENGTH);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(session_key("abc"), "session:abc");
        let user_id = Uuid::nil();
        assert_eq!(
            user_sessions_key(user_id),
            format!("user_sessions:{user_id}")
        );
    }

    /// Store whose calls never complete
    struct Stalled;

    #[async_trait]
    impl SessionStore for Stalled {
        async fn put(&self, _: &str, _: &Session, _: u64) -> SessionResult<()> {
            std::future::pending().await
        }

        async fn get(&self, _: &str) -> SessionResult<Session> {
            std::future::pending().await
        }

        async fn delete(&self, _: &str) -> SessionResult<()> {
            std::future::pending().await
        }

        async fn revoke_user(&self, _: Uuid) -> SessionResult<u64> {
            std::future::pending().await
        }

        async fn health_check(&self) -> SessionResult<bool> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_gives_up_after_the_deadline() {
        let started = tokio::time::Instant::now();
        let result = lookup(&Stalled, "tok").await;

        assert!(matches!(result, Err(SessionError::Timeout(d)) if d == SESSION_STORE_TIMEOUT));
        assert!(started.elapsed() >= SESSION_STORE_TIMEOUT);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn redis_round_trip() {
        use common::cache::RedisConfig;

        let pool = RedisPool::new(&RedisConfig::from_env().unwrap())
            .await
            .unwrap();
        let store = RedisSessionStore::new(pool);

        let token = generate_session_token();
        let session = Session::new(Uuid::new_v4(), token.clone(), 60);

        store.put(&token, &session, 60).await.unwrap();
        assert_eq!(store.get(&token).await.unwrap(), session);

        store.delete(&token).await.unwrap();
        store.delete(&token).await.unwrap();
        assert!(matches!(
            store.get(&token).await,
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn redis_revokes_every_token_of_a_user() {
        use common::cache::RedisConfig;

        let pool = RedisPool::new(&RedisConfig::from_env().unwrap())
            .await
            .unwrap();
        let store = RedisSessionStore::new(pool);

        let user_id = Uuid::new_v4();
        let tokens: Vec<String> = (0..3).map(|_| generate_session_token()).collect();
        for token in &tokens {
            store
                .put(token, &Session::new(user_id, token.clone(), 60), 60)
                .await
                .unwrap();
        }

        assert_eq!(store.revoke_user(user_id).await.unwrap(), 3);
        for token in &tokens {
            assert!(matches!(store.get(token).await, Err(SessionError::NotFound)));
        }
        assert_eq!(store.revoke_user(user_id).await.unwrap(), 0);
    }
}

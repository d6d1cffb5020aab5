//! Session model and related functionality

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session record stored in the cache under its token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expiry_time: DateTime<Utc>,
}

impl Session {
    /// Build a session for `user_id` that lives for `ttl_seconds`
    pub fn new(user_id: Uuid, session_id: String, ttl_seconds: u64) -> Self {
        let created_at = Utc::now();
        let ttl = Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX / 1_000));
        Self {
            user_id,
            session_id,
            created_at,
            expiry_time: created_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_time
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

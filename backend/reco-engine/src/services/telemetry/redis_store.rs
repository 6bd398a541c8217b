// ============================================
// Redis Session Store
// ============================================
//
// Redis keys:
// - telemetry:sessions - Set of session ids with live signals
// - telemetry:{session_id}:signals - Sorted set of signals scored by capture time (ms)
//
// Members carry a random record id so identical events captured in the
// same millisecond stay distinct.

use super::events::SessionSignal;
use super::store::SessionStore;
use super::{Result, TelemetryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSignal {
    record_id: Uuid,
    signal: SessionSignal,
}

pub struct RedisSessionStore {
    redis: redis::Client,
    /// Key TTL in seconds, refreshed on every write
    session_ttl: u64,
    key_prefix: String,
}

impl RedisSessionStore {
    pub fn new(redis: redis::Client) -> Self {
        Self {
            redis,
            session_ttl: 1800, // 30 minutes
            key_prefix: "telemetry".to_string(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.session_ttl = ttl_seconds;
        self
    }

    fn sessions_key(&self) -> String {
        format!("{}:sessions", self.key_prefix)
    }

    fn signals_key(&self, session_id: &str) -> String {
        format!("{}:{}:signals", self.key_prefix, session_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TelemetryError::RedisError(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, session_id: &str, signal: &SessionSignal) -> Result<()> {
        let mut conn = self.connection().await?;
        let key = self.signals_key(session_id);

        let member = serde_json::to_string(&StoredSignal {
            record_id: Uuid::new_v4(),
            signal: signal.clone(),
        })?;

        let _: () = conn
            .zadd(&key, member, signal.ts().timestamp_millis())
            .await?;
        let _: () = conn.expire(&key, self.session_ttl as i64).await?;
        let _: () = conn.sadd(self.sessions_key(), session_id).await?;

        Ok(())
    }

    async fn query_by_session(&self, session_id: &str) -> Result<Vec<SessionSignal>> {
        let mut conn = self.connection().await?;

        let members: Vec<String> = conn
            .zrange(self.signals_key(session_id), 0, -1)
            .await?;

        let mut signals = Vec::with_capacity(members.len());
        for json in members {
            match serde_json::from_str::<StoredSignal>(&json) {
                Ok(stored) => signals.push(stored.signal),
                Err(e) => debug!(session_id = session_id, error = %e, "Skipping unreadable signal"),
            }
        }

        Ok(signals)
    }

    async fn count_by_session(&self, session_id: &str) -> Result<usize> {
        let mut conn = self.connection().await?;
        let count: usize = conn.zcard(self.signals_key(session_id)).await?;
        Ok(count)
    }

    async fn delete_oldest(&self, session_id: &str, n: usize) -> Result<usize> {
        if n == 0 {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: usize = conn
            .zremrangebyrank(self.signals_key(session_id), 0, n as isize - 1)
            .await?;
        Ok(removed)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.connection().await?;
        let session_ids: Vec<String> = conn.smembers(self.sessions_key()).await?;

        // Scores are inclusive, so stop one millisecond short of the cutoff
        let max_score = cutoff.timestamp_millis() - 1;
        let mut removed = 0usize;

        for session_id in session_ids {
            let key = self.signals_key(&session_id);
            let count: usize = conn.zrembyscore(&key, "-inf", max_score).await?;
            removed += count;

            let left: usize = conn.zcard(&key).await?;
            if left == 0 {
                let _: () = conn.srem(self.sessions_key(), &session_id).await?;
            }
        }

        Ok(removed)
    }
}

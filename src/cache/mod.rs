//! Look-aside cache adapter over Redis (spec.md §4.A).
//!
//! The cache is advisory: every method here swallows transport errors after
//! logging them rather than propagating them to callers, so a Redis outage
//! degrades to cache-miss behavior instead of failing requests.

pub mod keys;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::metrics;

/// Bounded page size for `SCAN` iteration (spec.md §4.A: "cursor of ≤100 keys
/// per round").
const SCAN_COUNT: usize = 100;

#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    default_ttl_secs: u64,
}

impl Cache {
    pub async fn connect(dsn: &str, default_ttl_secs: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(dsn)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, default_ttl_secs })
    }

    /// Read-through helper: returns `None` on MISS or on any transport error
    /// (both fall through to the store per spec.md §4.A).
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    metrics::CACHE_HITS.inc();
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "cache value failed to deserialize");
                    None
                }
            },
            Ok(None) => {
                metrics::CACHE_MISSES.inc();
                None
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, falling through to store");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        self.set_json_ttl(key, value, self.default_ttl_secs).await;
    }

    pub async fn set_json_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "cache value failed to serialize, skipping write");
                return;
            }
        };
        let mut conn = self.conn.clone();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, serialized, ttl_secs)
            .await
        {
            warn!(key, error = %e, "cache write failed");
        }
    }

    pub async fn set_many_json<T: Serialize>(&self, entries: &[(String, T)]) {
        if entries.is_empty() {
            return;
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            match serde_json::to_string(value) {
                Ok(serialized) => {
                    pipe.set_ex(key, serialized, self.default_ttl_secs);
                }
                Err(e) => warn!(key, error = %e, "cache value failed to serialize, skipping"),
            }
        }
        if let Err(e) = pipe.query_async::<()>(&mut conn).await {
            warn!(error = %e, "cache batched write failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(key, error = %e, "cache delete failed");
        }
    }

    pub async fn delete_many(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(keys).await {
            warn!(count = keys.len(), error = %e, "cache batched delete failed");
        }
    }

    /// Delete every key formed by `prefix + "_" + id` for a list of ids
    /// (spec.md §4.A helper).
    pub async fn delete_for_ids(&self, prefix: &str, ids: &[String]) {
        let keys: Vec<String> = ids.iter().map(|id| format!("{prefix}_{id}")).collect();
        self.delete_many(&keys).await;
    }

    pub async fn delete_by_prefix(&self, prefix: &str) {
        self.delete_by_pattern(&format!("{prefix}*")).await;
    }

    /// Iterate the keyspace in bounded `SCAN` batches and pipeline the
    /// deletes, never loading the full keyspace at once (spec.md §4.A).
    pub async fn delete_by_pattern(&self, pattern: &str) {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(pattern, error = %e, "cache scan failed");
                    return;
                }
            };

            if !batch.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&batch).await {
                    warn!(pattern, error = %e, "cache batched delete during scan failed");
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
    }
}

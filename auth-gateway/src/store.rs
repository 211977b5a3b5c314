//! Typed access to the external key-value store (component A).
//!
//! Backed by Redis. Compound operations that need atomicity (`incr_with_ttl`,
//! `fetch_and_delete`) are implemented as Lua scripts evaluated server-side, since a
//! plain `MULTI`/`EXEC` pipeline can't express a second command conditional on the
//! first's result.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands as _, Script};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store is unavailable")]
    Unavailable {
        #[source]
        source: redis::RedisError,
    },
    #[error("key-value store returned an unexpected response")]
    Protocol {
        #[source]
        source: redis::RedisError,
    },
    #[error("operation timed out")]
    Timeout,
}

impl From<redis::RedisError> for StoreError {
    fn from(source: redis::RedisError) -> Self {
        use redis::ErrorKind;

        match source.kind() {
            ErrorKind::IoError | ErrorKind::ClusterDown | ErrorKind::MasterDown | ErrorKind::TryAgain => {
                StoreError::Unavailable { source }
            }
            _ => StoreError::Protocol { source },
        }
    }
}

/// Returns `true` for the subset of [`StoreError`] that the fail-open policy treats
/// as "proceed as if the store were empty" rather than as a hard failure.
impl StoreError {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. } | StoreError::Timeout)
    }
}

const INCR_WITH_TTL_SCRIPT: &str = r#"
local value = redis.call('INCR', KEYS[1])
if value == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return value
"#;

const FETCH_AND_DELETE_SCRIPT: &str = r#"
local value = redis.call('GET', KEYS[1])
if value then
    redis.call('DEL', KEYS[1])
end
return value
"#;

#[derive(Clone)]
pub struct Store {
    conn: ConnectionManager,
    timeout: Duration,
    incr_with_ttl: Script,
    fetch_and_delete: Script,
}

impl Store {
    pub async fn connect(redis_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;

        Ok(Self {
            conn,
            timeout,
            incr_with_ttl: Script::new(INCR_WITH_TTL_SCRIPT),
            fetch_and_delete: Script::new(FETCH_AND_DELETE_SCRIPT),
        })
    }

    async fn bound<T>(&self, fut: impl std::future::Future<Output = redis::RedisResult<T>>) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_elapsed| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        self.bound(conn.get(key)).await
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let ttl_secs = ttl.as_secs().max(1);
        self.bound(conn.set_ex(key, value, ttl_secs)).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.bound(conn.del(key)).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        self.bound(conn.exists(key)).await
    }

    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();
        let secs: i64 = self.bound(conn.ttl(key)).await?;
        Ok(if secs > 0 {
            Some(Duration::from_secs(secs.unsigned_abs()))
        } else {
            None
        })
    }

    /// Atomic `INCR`; applies `EXPIRE key ttl_if_new` in the same round trip when the
    /// key was just created (return value `1`).
    pub async fn incr_with_ttl(&self, key: &str, ttl_if_new: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let script = self
            .incr_with_ttl
            .key(key)
            .arg(ttl_if_new.as_secs().max(1))
            .invoke_async(&mut conn);
        self.bound(script).await
    }

    /// Atomic read-then-delete. Returns `None` if the key did not exist.
    pub async fn fetch_and_delete(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let script = self.fetch_and_delete.key(key).invoke_async(&mut conn);
        self.bound(script).await
    }
}

//! Revoked-token identifiers (component D).
//!
//! Fail-open by design: a key-value store outage makes revocation checks
//! return [`RevocationStatus::Unknown`], which every caller treats as "not revoked".

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    Yes,
    No,
    Unknown,
}

#[derive(Default)]
pub struct DegradedCounter(AtomicU64);

impl DegradedCounter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shares its degraded-decision counter across clones, so the copy handed to
/// [`crate::state::AppState`] and the one owned by `SessionOrchestrator` report the same count.
#[derive(Clone)]
pub struct Blacklist {
    store: Store,
    degraded: Arc<DegradedCounter>,
}

fn key(jti: Uuid) -> String {
    format!("blacklist:jti:{jti}")
}

/// `None` when `expiry` is not strictly after `now` — the caller treats that as a no-op
/// rather than storing a key with a zero or negative TTL.
fn ttl_until(expiry: time::OffsetDateTime, now: time::OffsetDateTime) -> Option<Duration> {
    let remaining = expiry - now;
    if remaining <= time::Duration::ZERO {
        return None;
    }
    Some(Duration::from_secs(remaining.whole_seconds().max(1) as u64))
}

impl Blacklist {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            degraded: Arc::new(DegradedCounter::default()),
        }
    }

    pub fn degraded_decisions(&self) -> u64 {
        self.degraded.get()
    }

    /// Stores `jti` with TTL `expiry - now`; a no-op if that TTL would be non-positive.
    pub async fn revoke(&self, jti: Uuid, expiry: time::OffsetDateTime) -> anyhow::Result<()> {
        let Some(ttl) = ttl_until(expiry, time::OffsetDateTime::now_utc()) else {
            return Ok(());
        };

        match self.store.set_ex(&key(jti), "1", ttl).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_degraded() => {
                self.degraded.increment();
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn is_revoked(&self, jti: Uuid) -> RevocationStatus {
        match self.store.exists(&key(jti)).await {
            Ok(true) => RevocationStatus::Yes,
            Ok(false) => RevocationStatus::No,
            Err(error) if error.is_degraded() => {
                self.degraded.increment();
                RevocationStatus::Unknown
            }
            Err(_) => RevocationStatus::Unknown,
        }
    }

    /// Test-harness only; not reachable from any HTTP route.
    #[cfg(test)]
    pub async fn remove(&self, jti: Uuid) -> anyhow::Result<()> {
        self.store.delete(&key(jti)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_expiry_yields_no_ttl() {
        let now = time::OffsetDateTime::now_utc();
        assert_eq!(ttl_until(now - time::Duration::seconds(5), now), None);
        assert_eq!(ttl_until(now, now), None);
    }

    #[test]
    fn future_expiry_yields_rounded_up_ttl() {
        let now = time::OffsetDateTime::now_utc();
        assert_eq!(ttl_until(now + time::Duration::seconds(30), now), Some(Duration::from_secs(30)));
        // Sub-second remainders still round up to at least one second rather than zero,
        // since a zero-second `SET EX` would be rejected by the store.
        assert_eq!(
            ttl_until(now + time::Duration::milliseconds(500), now),
            Some(Duration::from_secs(1))
        );
    }
}

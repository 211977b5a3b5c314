//! Counter-with-expiry and lockout flag keyed by (client-address, identity) (component E).
//!
//! Fail-open like the blacklist: a key-value store outage lets authentication
//! proceed as if the counters were empty, while a degraded counter tracks how often
//! that happened for `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Ok,
    Locked,
    JustLocked,
}

#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub reason: Reason,
    pub remaining_attempts: u32,
    pub lockout_remaining: Option<Duration>,
}

#[derive(Default)]
pub struct DegradedRateLimitCounter(AtomicU64);

impl DegradedRateLimitCounter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct RateLimiter {
    store: Store,
    window: Duration,
    max_attempts: u32,
    lockout: Duration,
    degraded: DegradedRateLimitCounter,
}

fn counter_key(addr: &str, identity: &str) -> String {
    format!("ratelimit:login:{addr}:{identity}")
}

fn lockout_key(addr: &str, identity: &str) -> String {
    format!("ratelimit:lockout:{addr}:{identity}")
}

impl RateLimiter {
    pub fn new(store: Store, window: Duration, max_attempts: u32, lockout: Duration) -> Self {
        Self {
            store,
            window,
            max_attempts,
            lockout,
            degraded: DegradedRateLimitCounter::default(),
        }
    }

    pub fn degraded_decisions(&self) -> u64 {
        self.degraded.get()
    }

    /// Admission check per the lockout/counter protocol. Does not itself record anything —
    /// callers invoke [`Self::record_failure`]/[`Self::record_success`] afterward.
    ///
    /// Fail-open: a store outage is treated as "no lockout, no prior attempts" rather
    /// than as a hard error, since rejecting every login during a store outage would be
    /// strictly worse than letting the rate limiter go dark.
    pub async fn check(&self, addr: &str, identity: &str) -> anyhow::Result<Decision> {
        let lockout_key = lockout_key(addr, identity);

        let lockout_ttl = match self.store.ttl(&lockout_key).await {
            Ok(ttl) => ttl,
            Err(error) if error.is_degraded() => {
                self.degraded.increment();
                return Ok(Decision {
                    reason: Reason::Ok,
                    remaining_attempts: self.max_attempts,
                    lockout_remaining: None,
                });
            }
            Err(error) => return Err(error.into()),
        };

        if let Some(remaining) = lockout_ttl {
            return Ok(Decision {
                reason: Reason::Locked,
                remaining_attempts: 0,
                lockout_remaining: Some(remaining),
            });
        }

        let counter_key = counter_key(addr, identity);
        let counter: u32 = match self.store.get(&counter_key).await {
            Ok(raw) => raw.and_then(|raw| raw.parse().ok()).unwrap_or(0),
            Err(error) if error.is_degraded() => {
                self.degraded.increment();
                0
            }
            Err(error) => return Err(error.into()),
        };

        if counter >= self.max_attempts {
            if let Err(error) = self.store.set_ex(&lockout_key, "1", self.lockout).await {
                if !error.is_degraded() {
                    return Err(error.into());
                }
                self.degraded.increment();
            }
            let _ = self.store.delete(&counter_key).await;
            return Ok(Decision {
                reason: Reason::JustLocked,
                remaining_attempts: 0,
                lockout_remaining: Some(self.lockout),
            });
        }

        Ok(Decision {
            reason: Reason::Ok,
            remaining_attempts: self.max_attempts - counter,
            lockout_remaining: None,
        })
    }

    pub async fn record_failure(&self, addr: &str, identity: &str) -> anyhow::Result<()> {
        match self.store.incr_with_ttl(&counter_key(addr, identity), self.window).await {
            Ok(_) => Ok(()),
            Err(error) if error.is_degraded() => {
                self.degraded.increment();
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn record_success(&self, addr: &str, identity: &str) -> anyhow::Result<()> {
        match self.store.delete(&counter_key(addr, identity)).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_degraded() => {
                self.degraded.increment();
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_and_lockout_keys_are_distinct() {
        assert_ne!(counter_key("10.0.0.1", "x@y.com"), lockout_key("10.0.0.1", "x@y.com"));
    }
}

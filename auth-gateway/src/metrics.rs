//! Minimal Prometheus-style counter dump behind `GET /metrics`.
//!
//! Not a full metrics pipeline — just the in-process atomic counters the middleware
//! stack and the fail-open paths increment.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::blacklist::Blacklist;

#[derive(Default)]
struct Counter(AtomicU64);

impl Counter {
    fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct Metrics {
    requests_2xx: Counter,
    requests_4xx: Counter,
    requests_5xx: Counter,
}

impl Metrics {
    pub fn record_status(&self, status: u16) {
        match status {
            200..=299 => self.requests_2xx.increment(),
            400..=499 => self.requests_4xx.increment(),
            500..=599 => self.requests_5xx.increment(),
            _ => {}
        }
    }

    /// Renders the text exposition format consumed by `GET /metrics`.
    pub fn render(&self, blacklist: &Blacklist, rate_limit_degraded_decisions: u64) -> String {
        format!(
            "# TYPE auth_gateway_requests_total counter\n\
             auth_gateway_requests_total{{status_class=\"2xx\"}} {}\n\
             auth_gateway_requests_total{{status_class=\"4xx\"}} {}\n\
             auth_gateway_requests_total{{status_class=\"5xx\"}} {}\n\
             # TYPE auth_gateway_degraded_decisions_total counter\n\
             auth_gateway_degraded_decisions_total{{component=\"blacklist\"}} {}\n\
             auth_gateway_degraded_decisions_total{{component=\"rate_limit\"}} {}\n",
            self.requests_2xx.get(),
            self.requests_4xx.get(),
            self.requests_5xx.get(),
            blacklist.degraded_decisions(),
            rate_limit_degraded_decisions,
        )
    }
}

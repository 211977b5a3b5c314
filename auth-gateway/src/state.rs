//! Process-wide shared state, assembled once in `main` and cloned cheaply (an `Arc`
//! of components) into every request.

use std::sync::Arc;

use crate::blacklist::Blacklist;
use crate::config::Conf;
use crate::extract::{LegacySessionAuthenticator, NoLegacySession};
use crate::metrics::Metrics;
use crate::session::SessionOrchestrator;
use crate::token::TokenCodec;

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    pub conf: Conf,
    pub tokens: TokenCodec,
    pub blacklist: Blacklist,
    pub sessions: SessionOrchestrator,
    pub legacy_session: Box<dyn LegacySessionAuthenticator>,
    pub metrics: Metrics,
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AppState {
    pub fn new(conf: Conf, tokens: TokenCodec, blacklist: Blacklist, sessions: SessionOrchestrator, metrics: Metrics) -> Self {
        Self(Arc::new(Inner {
            conf,
            tokens,
            blacklist,
            sessions,
            legacy_session: Box::new(NoLegacySession),
            metrics,
        }))
    }
}

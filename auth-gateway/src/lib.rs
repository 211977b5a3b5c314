//! Library surface for the authentication gateway.
//!
//! `main.rs` wires these modules into a running process; integration tests (`tests/`)
//! exercise the parts that do not require a live Postgres/Redis connection against this
//! same public surface, rather than re-implementing the logic against private internals.

pub mod blacklist;
pub mod client_addr;
pub mod config;
pub mod credential;
pub mod directory;
pub mod error;
pub mod extract;
pub mod http;
pub mod magic_link;
pub mod metrics;
pub mod middleware;
pub mod oauth;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod store;
pub mod token;

//! Cross-cutting middleware stack, applied outer to inner around the router in
//! [`crate::http::make_router`]: panic isolation, request-id propagation,
//! request/response logging, CORS, security headers, and a counters layer.

pub mod cors;
pub mod counters;
pub mod log;
pub mod panic;
pub mod request_id;
pub mod security_headers;

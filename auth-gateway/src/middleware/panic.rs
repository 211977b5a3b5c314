//! Panic isolation: the outermost layer. A panic anywhere downstream is
//! caught, logged, and turned into the same `INTERNAL_ERROR` envelope a handled error
//! would produce — callers can never observe a raw connection reset from an unexpected
//! programming error.

use std::any::Any;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::error::{ApiError, ErrorCode};

/// Installed via `CatchPanicLayer::custom` in [`crate::http::make_router`].
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    };

    error!(panic = %detail, "request handler panicked");

    ApiError::new(ErrorCode::InternalError, "internal error").into_response()
}

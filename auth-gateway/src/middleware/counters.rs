//! Counters layer: feeds every response's status class into [`crate::metrics::Metrics`]
//! so `/metrics` has something to report beyond the fail-open degraded counters.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

pub async fn record_status_middleware(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    state.metrics.record_status(response.status().as_u16());
    response
}

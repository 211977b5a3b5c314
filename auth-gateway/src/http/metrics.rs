//! `GET /metrics`: Prometheus text exposition.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state
        .metrics
        .render(&state.blacklist, state.sessions.rate_limit_degraded_decisions());

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}

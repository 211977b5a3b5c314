//! Request/response logging: method, path, status, latency — truncated to avoid logging
//! credentials or tokens. One tracing span per request, with the request id folded in.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::RequestId;
use tracing::{Instrument as _, debug, error, info, info_span};

pub async fn log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri_path = request.uri().path().to_owned();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .map(ToOwned::to_owned)
        .unwrap_or_default();

    // Truncate to keep the log readable and bound memory on pathological paths; this
    // never touches query parameters, where a token or code could otherwise leak.
    let logged_path = if uri_path.len() > 512 { &uri_path[..512] } else { &uri_path };

    let span = info_span!("request", %method, path = %logged_path, request_id = %request_id);

    async move {
        let start = Instant::now();
        debug!("received request");

        let response = next.run(request).await;

        let status = response.status();
        let elapsed = start.elapsed();

        if status.is_server_error() {
            error!(duration = ?elapsed, %status, "request failed");
        } else if status.is_client_error() {
            debug!(duration = ?elapsed, %status, "request rejected");
        } else {
            info!(duration = ?elapsed, %status, "request completed");
        }

        response
    }
    .instrument(span)
    .await
}

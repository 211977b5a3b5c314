//! `GET /health`: liveness probe. Does not touch the directory or store — a
//! database outage should not make the load balancer pull a gateway instance that is
//! otherwise serving fine (fail-open policy mirrored at the infra level).

use axum::Json;

use crate::http::dto::HealthPayload;

pub async fn health() -> Json<HealthPayload> {
    Json(HealthPayload { status: "healthy" })
}

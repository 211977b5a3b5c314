//! `POST /auth/logout`: revokes the bearer token's `jti`. Idempotent.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::error::{ApiError, ErrorCode, Success};
use crate::http::dto::MessagePayload;
use crate::state::AppState;

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Success<MessagePayload>>, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthorized, "missing bearer token"))?;

    state.sessions.logout(token).await.map_err(ApiError::internal)?;

    Ok(Json(Success::new(MessagePayload { message: "logged out" })))
}

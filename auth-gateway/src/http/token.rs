//! `GET /auth/token`: single-use and permanent magic-link resolution.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::{ApiError, ErrorCode, Success};
use crate::http::dto::AuthPayload;
use crate::session::AuthFailure;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenQuery {
    token: String,
}

pub async fn magic_link(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Success<AuthPayload>>, ApiError> {
    match state
        .sessions
        .authenticate_with_magic_link(&query.token)
        .await
        .map_err(ApiError::internal)?
    {
        Ok(authenticated) => Ok(Json(Success::new(AuthPayload::from(authenticated)))),
        Err(AuthFailure::TokenExpired) => Err(ApiError::new(ErrorCode::TokenExpired, "magic link has expired")),
        Err(_) => Err(ApiError::new(ErrorCode::InvalidToken, "magic link is invalid")),
    }
}

//! `POST /auth/login`: email/password credential verification.

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

use crate::client_addr;
use crate::credential::{email_shape_is_valid, password_shape_is_valid};
use crate::error::{ApiError, ErrorCode, Success};
use crate::http::dto::AuthPayload;
use crate::session::AuthFailure;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Success<AuthPayload>>, ApiError> {
    if !email_shape_is_valid(&body.email) || !password_shape_is_valid(&body.password) {
        return Err(ApiError::new(ErrorCode::ValidationFailed, "email or password has an invalid shape"));
    }

    let client_addr = client_addr::resolve(&headers, peer, state.conf.trust_forwarded_for);

    match state
        .sessions
        .authenticate_with_password(&client_addr, &body.email, &body.password)
        .await
        .map_err(ApiError::internal)?
    {
        Ok(authenticated) => Ok(Json(Success::new(AuthPayload::from(authenticated)))),
        Err(AuthFailure::InvalidCredentials) => Err(ApiError::new(ErrorCode::InvalidCredentials, "invalid email or password")),
        Err(AuthFailure::RateLimited { retry_after }) => Err(ApiError::new(
            ErrorCode::RateLimited,
            "too many failed attempts, try again later",
        )
        .with_extra(json!({ "retry_after_seconds": retry_after.as_secs() }))),
        Err(_) => Err(ApiError::new(ErrorCode::InvalidCredentials, "invalid email or password")),
    }
}

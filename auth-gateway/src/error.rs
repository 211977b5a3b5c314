//! Uniform error envelope for the HTTP boundary.
//!
//! Every internal layer returns its own `thiserror` enum (`TokenError`, `LinkError`,
//! `StoreError`, `OrchestratorError`, ...); only the HTTP boundary converts those into
//! an [`ApiError`] and serializes it as the envelope from the external interface spec.

use core::fmt;
use core::panic::Location;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

/// Stable error code used in envelopes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    InvalidCredentials,
    RateLimited,
    Unauthorized,
    InvalidToken,
    TokenExpired,
    TokenRevoked,
    BadState,
    OauthFailed,
    NoAccount,
    ProviderRoleMismatch,
    ValidationFailed,
    InvalidRequest,
    InternalError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
            ErrorCode::TokenRevoked => StatusCode::UNAUTHORIZED,
            ErrorCode::BadState => StatusCode::UNAUTHORIZED,
            ErrorCode::OauthFailed => StatusCode::UNAUTHORIZED,
            ErrorCode::NoAccount => StatusCode::UNAUTHORIZED,
            ErrorCode::ProviderRoleMismatch => StatusCode::UNAUTHORIZED,
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenRevoked => "TOKEN_REVOKED",
            ErrorCode::BadState => "BAD_STATE",
            ErrorCode::OauthFailed => "OAUTH_FAILED",
            ErrorCode::NoAccount => "NO_ACCOUNT",
            ErrorCode::ProviderRoleMismatch => "PROVIDER_ROLE_MISMATCH",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub struct ApiError {
    code: ErrorCode,
    message: String,
    loc: &'static Location<'static>,
    source: Option<anyhow::Error>,
    /// Extra fields merged into `error.data`, e.g. `retry_after_seconds`.
    extra: Option<serde_json::Value>,
}

impl ApiError {
    #[track_caller]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            loc: Location::caller(),
            source: None,
            extra: None,
        }
    }

    #[track_caller]
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: "internal error".to_owned(),
            loc: Location::caller(),
            source: Some(source.into()),
            extra: None,
        }
    }

    #[must_use]
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.code.as_str(), self.message, self.loc)?;
        if let Some(source) = &self.source {
            write!(f, " [source: {source}")?;
            for cause in source.chain().skip(1) {
                write!(f, ", because {cause}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    extra: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Envelope {
    success: bool,
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.source.is_some() || matches!(self.code, ErrorCode::InternalError) {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, "request rejected");
        }

        let status = self.code.status();
        let body = Envelope {
            success: false,
            error: ErrorBody {
                code: self.code.as_str(),
                message: self.message,
                extra: self.extra,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Wraps a successful payload in the uniform success envelope.
#[derive(Serialize)]
pub struct Success<T: Serialize> {
    success: bool,
    data: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

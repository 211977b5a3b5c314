//! HTTP boundary: request/response shaping plus router assembly.
//!
//! Routes are declared flat here, with middleware layered outer-to-inner around the
//! whole tree.

mod dto;
mod health;
mod login;
mod logout;
mod me;
mod metrics;
mod oauth;
mod token;

use axum::Router;
use axum::extract::Request;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::middleware;
use crate::middleware::request_id::{MakeUuidRequestId, request_id_header};
use crate::state::AppState;

pub fn make_router(state: AppState) -> Router {
    let cors: CorsLayer = middleware::cors::make_middleware(&state.conf.cors_allowed_origins);

    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::metrics))
        .route("/auth/login", post(login::login))
        .route("/auth/token", get(token::magic_link))
        .route("/auth/logout", post(logout::logout))
        .route("/auth/me", get(me::me))
        .route("/auth/P4/callback", post(oauth::p4_callback))
        .route("/auth/{provider}", get(oauth::begin))
        .route("/auth/{provider}/callback", get(oauth::callback))
        .with_state(state.clone());

    routes
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(middleware::panic::handle_panic))
                .layer(SetRequestIdLayer::new(request_id_header(), MakeUuidRequestId))
                .layer(axum::middleware::from_fn(middleware::log::log_middleware))
                .layer(PropagateRequestIdLayer::new(request_id_header()))
                .layer(cors)
                .layer(middleware::security_headers::nosniff())
                .layer(middleware::security_headers::frame_deny())
                .layer(middleware::security_headers::referrer_policy())
                .layer(axum::middleware::from_fn_with_state(state, middleware::counters::record_status_middleware)),
        )
        .fallback(fallback)
}

async fn fallback(_: Request) -> crate::error::ApiError {
    crate::error::ApiError::new(crate::error::ErrorCode::InvalidRequest, "no such route")
}

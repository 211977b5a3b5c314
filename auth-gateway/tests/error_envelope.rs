//! Confirms every rejection crossing the HTTP boundary serializes into the uniform
//! envelope from the external interface spec, regardless of which internal layer raised it.

#![allow(clippy::unwrap_used)]

use auth_gateway::error::{ApiError, ErrorCode, Success};
use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn invalid_credentials_envelope_matches_the_external_interface_shape() {
    let response = ApiError::new(ErrorCode::InvalidCredentials, "email or password is incorrect").into_response();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;

    assert_eq!(
        body,
        json!({
            "success": false,
            "error": {
                "code": "INVALID_CREDENTIALS",
                "message": "email or password is incorrect",
            }
        })
    );
}

#[tokio::test]
async fn rate_limited_envelope_carries_retry_after_in_extra() {
    let response = ApiError::new(ErrorCode::RateLimited, "too many attempts")
        .with_extra(json!({ "retry_after_seconds": 900 }))
        .into_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;

    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("RATE_LIMITED"));
    assert_eq!(body["error"]["retry_after_seconds"], json!(900));
}

#[tokio::test]
async fn internal_error_never_leaks_its_source_into_the_response_body() {
    let response = ApiError::internal(anyhow::anyhow!("connection refused on 10.0.0.5:5432")).into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;

    assert_eq!(body["error"]["code"], json!("INTERNAL_ERROR"));
    assert_eq!(body["error"]["message"], json!("internal error"));
    assert!(!body.to_string().contains("10.0.0.5"));
}

#[tokio::test]
async fn provider_role_mismatch_maps_to_unauthorized() {
    let response = ApiError::new(ErrorCode::ProviderRoleMismatch, "this provider cannot link that role").into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn success_envelope_wraps_the_payload_under_data() {
    #[derive(serde::Serialize)]
    struct Profile {
        email: String,
    }

    let response = Success::new(Profile {
        email: "t@example.com".to_owned(),
    })
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(
        body,
        json!({
            "success": true,
            "data": { "email": "t@example.com" },
        })
    );
}

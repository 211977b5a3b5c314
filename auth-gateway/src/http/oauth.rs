//! `GET /auth/{provider}` and `/auth/{provider}/callback`: the federated-identity
//! redirect dance. P4 uses `response_mode=form_post`, so its callback is routed separately
//! as a `POST` with a form body rather than query parameters.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use serde::Deserialize;

use crate::directory::Provider;
use crate::error::{ApiError, ErrorCode, Success};
use crate::http::dto::FederatedAuthPayload;
use crate::session::AuthFailure;
use crate::state::AppState;

fn parse_provider(raw: &str) -> Result<Provider, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::new(ErrorCode::InvalidRequest, "unknown provider"))
}

#[derive(Deserialize)]
pub struct BeginQuery {
    redirect_url: String,
}

pub async fn begin(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<BeginQuery>,
) -> Result<Redirect, ApiError> {
    let provider = parse_provider(&provider)?;

    let authorization_url = state
        .sessions
        .begin_federated(&state.conf, provider, &query.redirect_url)
        .await
        .map_err(ApiError::internal)?;

    Ok(Redirect::temporary(&authorization_url))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: String,
    state: String,
}

pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<Success<FederatedAuthPayload>>, ApiError> {
    let provider = parse_provider(&provider)?;
    complete(state, provider, &query.code, &query.state).await
}

#[derive(Deserialize)]
pub struct CallbackForm {
    code: String,
    state: String,
}

/// `POST /auth/P4/callback`: same completion logic, form-encoded per P4's `form_post` mode.
pub async fn p4_callback(
    State(state): State<AppState>,
    axum::Form(form): axum::Form<CallbackForm>,
) -> Result<Json<Success<FederatedAuthPayload>>, ApiError> {
    complete(state, Provider::P4, &form.code, &form.state).await
}

async fn complete(
    state: AppState,
    provider: Provider,
    code: &str,
    oauth_state: &str,
) -> Result<Json<Success<FederatedAuthPayload>>, ApiError> {
    match state
        .sessions
        .complete_federated(&state.conf, provider, code, oauth_state)
        .await
        .map_err(ApiError::internal)?
    {
        Ok((authenticated, redirect_url)) => Ok(Json(Success::new(FederatedAuthPayload {
            auth: authenticated.into(),
            redirect_url,
        }))),
        Err(AuthFailure::BadState) => Err(ApiError::new(ErrorCode::BadState, "oauth state is missing or expired")),
        Err(AuthFailure::NoAccount) => Err(ApiError::new(ErrorCode::NoAccount, "no account links to this identity")),
        Err(AuthFailure::ProviderRoleMismatch) => Err(ApiError::new(
            ErrorCode::ProviderRoleMismatch,
            "this provider cannot link the account's role",
        )),
        Err(AuthFailure::OauthFailed(source)) => {
            tracing::warn!(error = %source, "oauth provider exchange failed");
            Err(ApiError::new(ErrorCode::OauthFailed, "federated sign-in failed"))
        }
        Err(_) => Err(ApiError::new(ErrorCode::OauthFailed, "federated sign-in failed")),
    }
}

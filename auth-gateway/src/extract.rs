//! Validator Contract (component K): the 5-step bearer-token verification procedure,
//! exposed in-process as an axum extractor so `GET /auth/me` and any protected route
//! share one code path with the documented downstream contract.

use async_trait::async_trait;
use axum::RequestPartsExt as _;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use tracing::warn;

use crate::blacklist::RevocationStatus;
use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;
use crate::token::AccessClaims;

/// A legacy session mechanism a conformant deployment may bridge in during a bearer-token
/// migration. The default build wires [`NoLegacySession`], which always reports
/// "no session" — dual-mode fallback is then equivalent to having it disabled.
#[async_trait]
pub trait LegacySessionAuthenticator: Send + Sync {
    async fn authenticate(&self, parts: &Parts) -> Option<AccessClaims>;
}

pub struct NoLegacySession;

#[async_trait]
impl LegacySessionAuthenticator for NoLegacySession {
    async fn authenticate(&self, _parts: &Parts) -> Option<AccessClaims> {
        None
    }
}

/// The decoded, verified claims of an inbound bearer token, usable as an axum extractor.
pub struct AccessToken(pub AccessClaims);

#[async_trait]
impl FromRequestParts<AppState> for AccessToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = parts.extract::<TypedHeader<Authorization<Bearer>>>().await;

        let token = match bearer {
            Ok(TypedHeader(Authorization(bearer))) => Some(bearer.token().to_owned()),
            Err(_) => None,
        };

        let Some(token) = token else {
            if state.conf.dual_mode_fallback_enabled {
                if let Some(claims) = state.legacy_session.authenticate(parts).await {
                    return Ok(AccessToken(claims));
                }
            }
            return Err(ApiError::new(ErrorCode::Unauthorized, "missing bearer token"));
        };

        // Step 2-3: signature + algorithm + nbf/exp, enforced inside `verify_access`.
        let claims = state.tokens.verify_access(&token).map_err(|error| match error {
            crate::token::TokenError::Expired => ApiError::new(ErrorCode::TokenExpired, "access token has expired"),
            crate::token::TokenError::WrongAlgorithm => {
                ApiError::new(ErrorCode::InvalidToken, "access token uses a disallowed algorithm")
            }
            _ => ApiError::new(ErrorCode::InvalidToken, "access token is invalid"),
        })?;

        // Step 4: revocation check. Store failures proceed as "not revoked" (fail-open).
        match state.blacklist.is_revoked(claims.jti).await {
            RevocationStatus::Yes => return Err(ApiError::new(ErrorCode::TokenRevoked, "access token has been revoked")),
            RevocationStatus::No => {}
            RevocationStatus::Unknown => {
                warn!(jti = %claims.jti, "revocation check degraded, proceeding as not-revoked");
            }
        }

        Ok(AccessToken(claims))
    }
}

//! `GET /auth/me`: exercises the Validator Contract extractor in-process.

use axum::Json;
use serde::Serialize;

use crate::error::Success;
use crate::extract::AccessToken;
use crate::http::dto::{SessionMetaPayload, UserPayload};

#[derive(Serialize)]
pub struct MePayload {
    user: UserPayload,
    meta: SessionMetaPayload,
}

pub async fn me(AccessToken(claims): AccessToken) -> Json<Success<MePayload>> {
    let expires_in = claims.exp - claims.iat;
    Json(Success::new(MePayload {
        user: UserPayload::from(&claims),
        meta: SessionMetaPayload {
            expires_in,
            token_type: "Bearer",
        },
    }))
}

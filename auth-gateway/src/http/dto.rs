//! Response payloads for the HTTP surface. Internal layers never construct these
//! directly — only the boundary shapes [`crate::session::Authenticated`] into JSON.

use serde::Serialize;

use crate::session::Authenticated;
use crate::token::AccessClaims;

#[derive(Serialize)]
pub struct UserPayload {
    pub id: i64,
    pub boddle_uid: uuid::Uuid,
    pub email: String,
    pub name: String,
    pub meta_type: String,
    pub meta_id: i64,
}

impl From<&AccessClaims> for UserPayload {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            id: claims.user_id,
            boddle_uid: claims.boddle_uid,
            email: claims.email.clone(),
            name: claims.name.clone(),
            meta_type: claims.meta_type.clone(),
            meta_id: claims.meta_id,
        }
    }
}

#[derive(Serialize)]
pub struct MetaPayload {
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

#[derive(Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserPayload,
    pub meta: MetaPayload,
}

impl From<Authenticated> for AuthPayload {
    fn from(authenticated: Authenticated) -> Self {
        Self {
            user: UserPayload::from(&authenticated.access_claims),
            meta: MetaPayload {
                refresh_token: authenticated.refresh_token,
                expires_in: authenticated.access_claims.exp - authenticated.access_claims.iat,
                token_type: "Bearer",
            },
            token: authenticated.access_token,
        }
    }
}

#[derive(Serialize)]
pub struct FederatedAuthPayload {
    #[serde(flatten)]
    pub auth: AuthPayload,
    pub redirect_url: String,
}

#[derive(Serialize)]
pub struct SessionMetaPayload {
    pub expires_in: i64,
    pub token_type: &'static str,
}

#[derive(Serialize)]
pub struct MessagePayload {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthPayload {
    pub status: &'static str,
}

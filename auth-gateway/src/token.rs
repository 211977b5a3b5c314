//! Token Codec (component C): issues and verifies compact signed bearer tokens.
//!
//! Access and refresh tokens both use HMAC-SHA256 with independent secret keys —
//! mis-sharing the keys would let a refresh token masquerade as an access token, so the
//! two secrets are never interchangeable even though they flow through the same codec.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use picky::jose::jws::{Jws, JwsAlg, JwsHeader};
use picky::key::PrivateKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::directory::{Discriminator, DiscriminatorColumn, RoleRecord, Subject};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token uses a disallowed signing algorithm")]
    WrongAlgorithm,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(source: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match source.kind() {
            ErrorKind::InvalidAlgorithm => TokenError::WrongAlgorithm,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Full claim set carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: i64,
    pub boddle_uid: Uuid,
    pub email: String,
    pub name: String,
    pub meta_type: String,
    pub meta_id: i64,
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Refresh tokens carry only the subject identifier plus their own `jti`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: i64,
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: Uuid,
}

fn meta_type_of(discriminator: Discriminator) -> &'static str {
    match discriminator {
        Discriminator::Teacher => "Teacher",
        Discriminator::Student => "Student",
        Discriminator::Parent => "Parent",
        Discriminator::Admin => "Admin",
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_secs() as i64
}

#[derive(Clone)]
pub struct TokenCodec {
    access_secret: String,
    refresh_secret: String,
    issuer: String,
    audience: String,
    access_ttl: time::Duration,
    refresh_ttl: time::Duration,
}

impl TokenCodec {
    pub fn new(
        access_secret: String,
        refresh_secret: String,
        issuer: String,
        audience: String,
        access_ttl: std::time::Duration,
        refresh_ttl: std::time::Duration,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            issuer,
            audience,
            access_ttl: time::Duration::try_from(access_ttl).unwrap_or(time::Duration::hours(6)),
            refresh_ttl: time::Duration::try_from(refresh_ttl).unwrap_or(time::Duration::days(30)),
        }
    }

    pub fn access_ttl(&self) -> time::Duration {
        self.access_ttl
    }

    pub fn issue_access(&self, subject: &Subject, role: &RoleRecord) -> Result<(String, AccessClaims), TokenError> {
        let now = now_unix();
        let claims = AccessClaims {
            user_id: subject.id,
            boddle_uid: subject.external_id,
            email: subject.email.clone(),
            name: subject.name.clone(),
            meta_type: meta_type_of(subject.discriminator()).to_owned(),
            meta_id: role.id(),
            iss: self.issuer.clone(),
            sub: subject.id.to_string(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp: now + self.access_ttl.whole_seconds(),
            jti: Uuid::new_v4(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
        .map_err(|_| TokenError::Malformed)?;

        Ok((token, claims))
    }

    pub fn issue_refresh(&self, subject: &Subject) -> Result<(String, RefreshClaims), TokenError> {
        let now = now_unix();
        let claims = RefreshClaims {
            user_id: subject.id,
            iss: self.issuer.clone(),
            sub: subject.id.to_string(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp: now + self.refresh_ttl.whole_seconds(),
            jti: Uuid::new_v4(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
        .map_err(|_| TokenError::Malformed)?;

        Ok((token, claims))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        validation.validate_exp = true;
        validation.required_spec_claims.clear();
        validation.set_audience(&[self.audience.clone()]);
        validation
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = jsonwebtoken::decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &self.validation(),
        )?;
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let data = jsonwebtoken::decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &self.validation(),
        )?;
        Ok(data.claims)
    }

    /// Parses the token without verifying its signature; used only to recover `jti`
    /// and `exp` during logout, where the caller explicitly accepts unsigned data.
    pub fn peek(token: &str) -> Result<PeekedClaims, TokenError> {
        let payload_segment = token.split('.').nth(1).ok_or(TokenError::Malformed)?;

        let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload_segment)
            .map_err(|_| TokenError::Malformed)?;

        #[derive(Deserialize)]
        struct Peek {
            jti: Uuid,
            exp: i64,
        }

        let peek: Peek = serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed)?;

        Ok(PeekedClaims {
            jti: peek.jti,
            exp: peek.exp,
        })
    }
}

pub struct PeekedClaims {
    pub jti: Uuid,
    pub exp: i64,
}

/// Signs a short-lived ES256 client assertion for the P4 provider's token endpoint.
///
/// Construction fails fast unless the key material parses as ECDSA-P-256 — this check
/// happens once at startup, not deferred to the first OAuth callback.
pub struct ClientAssertionSigner {
    key: PrivateKey,
}

#[derive(Serialize)]
struct ClientAssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    jti: Uuid,
}

impl ClientAssertionSigner {
    pub fn new(key: PrivateKey) -> Self {
        Self { key }
    }

    /// Produces a compact ES256 JWT valid for at most 5 minutes, asserting `service_id`
    /// as the gateway's identity to `token_endpoint`.
    pub fn sign(&self, service_id: &str, token_endpoint: &str, key_id: &str) -> anyhow::Result<String> {
        let now = now_unix();
        let claims = ClientAssertionClaims {
            iss: service_id,
            sub: service_id,
            aud: token_endpoint,
            iat: now,
            exp: now + 300,
            jti: Uuid::new_v4(),
        };

        let mut header = JwsHeader::new(JwsAlg::ES256);
        header.kid = Some(key_id.to_owned());

        let jws = Jws::new(header, serde_json::to_vec(&claims)?);
        let token = jws.encode(&self.key)?;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            "access-secret".to_owned(),
            "refresh-secret".to_owned(),
            "auth-gateway".to_owned(),
            "boddle".to_owned(),
            std::time::Duration::from_secs(21_600),
            std::time::Duration::from_secs(2_592_000),
        )
    }

    fn subject() -> Subject {
        Subject {
            id: 123,
            external_id: Uuid::new_v4(),
            email: "t@example.com".to_owned(),
            name: "Ms. Teacher".to_owned(),
            password_digest: None,
            discriminator: DiscriminatorColumn(Discriminator::Teacher),
            role_id: 456,
            last_login_at: None,
        }
    }

    #[test]
    fn round_trip_access_token() {
        let codec = codec();
        let role = RoleRecord::Teacher {
            id: 456,
            p1_subject: None,
            p2_subject: None,
        };
        let (token, issued) = codec.issue_access(&subject(), &role).expect("issue succeeds");
        let verified = codec.verify_access(&token).expect("verify succeeds");

        assert_eq!(issued.user_id, verified.user_id);
        assert_eq!(issued.jti, verified.jti);
        assert_eq!(verified.exp - verified.iat, 21_600);
    }

    #[test]
    fn wrong_algorithm_is_rejected() {
        let codec = codec();

        #[derive(Serialize)]
        struct NoneClaims {
            sub: String,
        }

        let mut header = Header::new(Algorithm::HS256);
        header.alg = Algorithm::HS384;

        let token = jsonwebtoken::encode(
            &header,
            &NoneClaims { sub: "123".to_owned() },
            &EncodingKey::from_secret(codec.access_secret.as_bytes()),
        )
        .expect("encode with mismatched alg succeeds at the library level");

        let error = codec.verify_access(&token).unwrap_err();
        assert!(matches!(error, TokenError::WrongAlgorithm));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let now = now_unix();
        let claims = AccessClaims {
            user_id: 1,
            boddle_uid: Uuid::new_v4(),
            email: "a@b.com".to_owned(),
            name: "A".to_owned(),
            meta_type: "Teacher".to_owned(),
            meta_id: 1,
            iss: codec.issuer.clone(),
            sub: "1".to_owned(),
            aud: codec.audience.clone(),
            iat: now - 100,
            nbf: now - 100,
            exp: now - 10,
            jti: Uuid::new_v4(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(codec.access_secret.as_bytes()),
        )
        .expect("encode succeeds");

        assert!(matches!(codec.verify_access(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn peek_recovers_jti_without_verifying_signature() {
        let codec = codec();
        let role = RoleRecord::Teacher {
            id: 456,
            p1_subject: None,
            p2_subject: None,
        };
        let (token, issued) = codec.issue_access(&subject(), &role).expect("issue succeeds");

        let peeked = TokenCodec::peek(&token).expect("peek succeeds");
        assert_eq!(peeked.jti, issued.jti);
    }
}

//! Integration-level coverage of the token codec's security properties: round trip,
//! signing-algorithm rigidity, and expiry enforcement. Exercised against the crate's
//! public surface rather than private internals.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use auth_gateway::directory::{Discriminator, DiscriminatorColumn, RoleRecord, Subject};
use auth_gateway::token::TokenCodec;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rstest::rstest;
use serde::Serialize;
use uuid::Uuid;

fn codec() -> TokenCodec {
    TokenCodec::new(
        "integration-access-secret".to_owned(),
        "integration-refresh-secret".to_owned(),
        "auth-gateway".to_owned(),
        "boddle".to_owned(),
        Duration::from_secs(21_600),
        Duration::from_secs(2_592_000),
    )
}

fn teacher_subject() -> Subject {
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

fn teacher_role() -> RoleRecord {
    RoleRecord::Teacher {
        id: 456,
        p1_subject: None,
        p2_subject: None,
    }
}

#[test]
fn access_and_refresh_tokens_round_trip_independently() {
    let codec = codec();
    let subject = teacher_subject();

    let (access_token, access_claims) = codec.issue_access(&subject, &teacher_role()).unwrap();
    let (refresh_token, refresh_claims) = codec.issue_refresh(&subject).unwrap();

    let verified_access = codec.verify_access(&access_token).unwrap();
    let verified_refresh = codec.verify_refresh(&refresh_token).unwrap();

    assert_eq!(verified_access.jti, access_claims.jti);
    assert_eq!(verified_access.exp - verified_access.iat, 21_600);
    assert_eq!(verified_refresh.jti, refresh_claims.jti);
    assert_eq!(verified_refresh.exp - verified_refresh.iat, 2_592_000);

    // A refresh token must never verify as an access token, since the two use
    // independent secrets — mis-sharing them would let a refresh token
    // masquerade as a short-lived access token.
    assert!(codec.verify_access(&refresh_token).is_err());
}

#[rstest]
#[case(Algorithm::HS384)]
#[case(Algorithm::HS512)]
fn non_hs256_hmac_variants_are_rejected(#[case] alg: Algorithm) {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
    }

    let codec = codec();
    let mut header = Header::new(Algorithm::HS256);
    header.alg = alg;

    let token = jsonwebtoken::encode(
        &header,
        &Claims { sub: "123".to_owned() },
        &EncodingKey::from_secret(b"integration-access-secret"),
    )
    .unwrap();

    let error = codec.verify_access(&token).unwrap_err();
    assert!(matches!(error, auth_gateway::token::TokenError::WrongAlgorithm));
}

#[test]
fn not_yet_valid_token_is_rejected() {
    use auth_gateway::token::{AccessClaims, TokenError};

    let codec = codec();
    let now = jsonwebtoken::get_current_timestamp() as i64;

    let claims = AccessClaims {
        user_id: 1,
        boddle_uid: Uuid::new_v4(),
        email: "a@b.com".to_owned(),
        name: "A".to_owned(),
        meta_type: "Teacher".to_owned(),
        meta_id: 1,
        iss: "auth-gateway".to_owned(),
        sub: "1".to_owned(),
        aud: "boddle".to_owned(),
        iat: now,
        nbf: now + 3_600,
        exp: now + 7_200,
        jti: Uuid::new_v4(),
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"integration-access-secret"),
    )
    .unwrap();

    assert!(matches!(codec.verify_access(&token), Err(TokenError::NotYetValid)));
}

#[test]
fn peek_tolerates_a_token_signed_with_a_different_key() {
    // `peek` is used only during logout, where the caller explicitly accepts unsigned
    // data — it must recover `jti`/`exp` even when the signature would not verify.
    let codec = codec();
    let (token, issued) = codec.issue_access(&teacher_subject(), &teacher_role()).unwrap();

    let peeked = TokenCodec::peek(&token).unwrap();
    assert_eq!(peeked.jti, issued.jti);
    assert_eq!(peeked.exp, issued.exp);
}

//! Data-driven per-provider description: one generic orchestrator, no
//! per-provider inheritance hierarchy.

use crate::config::Conf;
use crate::directory::{Discriminator, Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    Secret,
    SignedAssertion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Query,
    FormPost,
}

#[derive(Debug, Clone)]
pub struct ProviderDescription {
    pub provider: Provider,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: Option<String>,
    pub scopes: &'static [&'static str],
    pub response_mode: ResponseMode,
    pub client_auth: ClientAuth,
    pub allowed_roles: &'static [Discriminator],
}

/// Builds the four static provider descriptions from configuration. URLs are the
/// well-known endpoints for each provider; only client id/secret/redirect vary per
/// deployment.
pub fn describe(conf: &Conf, provider: Provider) -> ProviderDescription {
    match provider {
        Provider::P1 => ProviderDescription {
            provider,
            auth_url: "https://accounts.p1.example.com/o/oauth2/v2/auth".to_owned(),
            token_url: "https://oauth2.p1.example.com/token".to_owned(),
            userinfo_url: Some("https://openidconnect.p1.example.com/v1/userinfo".to_owned()),
            scopes: &["openid", "email", "profile"],
            response_mode: ResponseMode::Query,
            client_auth: ClientAuth::Secret,
            allowed_roles: Provider::P1.eligible_discriminators(),
        },
        Provider::P2 => ProviderDescription {
            provider,
            auth_url: "https://login.p2.example.com/oauth/authorize".to_owned(),
            token_url: "https://login.p2.example.com/oauth/tokens".to_owned(),
            userinfo_url: Some("https://graph.p2.example.com/v3.0/me".to_owned()),
            scopes: &["openid", "email", "profile", "User.Read"],
            response_mode: ResponseMode::Query,
            client_auth: ClientAuth::Secret,
            allowed_roles: Provider::P2.eligible_discriminators(),
        },
        Provider::P3 => ProviderDescription {
            provider,
            auth_url: "https://www.p3.example.com/oauth/authorize".to_owned(),
            token_url: "https://www.p3.example.com/oauth/token".to_owned(),
            userinfo_url: Some("https://www.p3.example.com/oauth/userinfo".to_owned()),
            scopes: &["openid", "email"],
            response_mode: ResponseMode::Query,
            client_auth: ClientAuth::Secret,
            allowed_roles: Provider::P3.eligible_discriminators(),
        },
        Provider::P4 => ProviderDescription {
            provider,
            auth_url: format!("https://appleid.p4.example.com/auth/authorize?team={}", conf.p4.team_id),
            token_url: "https://appleid.p4.example.com/auth/token".to_owned(),
            userinfo_url: None,
            scopes: &["name", "email"],
            response_mode: ResponseMode::FormPost,
            client_auth: ClientAuth::SignedAssertion,
            allowed_roles: Provider::P4.eligible_discriminators(),
        },
    }
}

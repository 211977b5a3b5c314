//! Session Orchestrator (component I): the single entry point that turns a credential,
//! magic-link, or federated-identity outcome into an issued token pair.

use time::OffsetDateTime;

use crate::blacklist::Blacklist;
use crate::config::Conf;
use crate::credential::{CredentialVerifier, VerifyOutcome};
use crate::directory::{Directory, Provider, RoleRecord, Subject};
use crate::magic_link::{MagicLinkAuthenticator, MagicLinkOutcome};
use crate::oauth::OAuthEngine;
use crate::rate_limit::{Decision, RateLimiter, Reason};
use crate::token::{AccessClaims, TokenCodec};

#[derive(Debug)]
pub enum AuthFailure {
    InvalidCredentials,
    InvalidToken,
    TokenExpired,
    RateLimited { retry_after: std::time::Duration },
    NoAccount,
    BadState,
    OauthFailed(anyhow::Error),
    ProviderRoleMismatch,
}

pub struct Authenticated {
    pub access_token: String,
    pub refresh_token: String,
    pub access_claims: AccessClaims,
    pub subject: Subject,
    pub role: RoleRecord,
}

pub struct SessionOrchestrator {
    directory: Directory,
    tokens: TokenCodec,
    blacklist: Blacklist,
    rate_limiter: RateLimiter,
    credentials: CredentialVerifier,
    magic_links: MagicLinkAuthenticator,
    oauth: OAuthEngine,
}

impl SessionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Directory,
        tokens: TokenCodec,
        blacklist: Blacklist,
        rate_limiter: RateLimiter,
        credentials: CredentialVerifier,
        magic_links: MagicLinkAuthenticator,
        oauth: OAuthEngine,
    ) -> Self {
        Self {
            directory,
            tokens,
            blacklist,
            rate_limiter,
            credentials,
            magic_links,
            oauth,
        }
    }

    pub async fn authenticate_with_password(
        &self,
        client_addr: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<Result<Authenticated, AuthFailure>> {
        let decision = self.rate_limiter.check(client_addr, email).await?;
        if matches!(decision.reason, Reason::Locked | Reason::JustLocked) {
            return Ok(Err(AuthFailure::RateLimited {
                retry_after: lockout_remaining(decision),
            }));
        }

        let (outcome, resolved) = self.credentials.verify(email, password).await?;

        if !matches!(outcome, VerifyOutcome::Ok) {
            self.rate_limiter.record_failure(client_addr, email).await?;
            let _ = self.directory.append_attempt_log(email, client_addr, false).await;
            return Ok(Err(AuthFailure::InvalidCredentials));
        }

        self.rate_limiter.record_success(client_addr, email).await?;
        let _ = self.directory.append_attempt_log(email, client_addr, true).await;

        let Some((subject, role)) = resolved else {
            return Ok(Err(AuthFailure::InvalidCredentials));
        };

        Ok(Ok(self.issue(subject, role).await?))
    }

    pub async fn authenticate_with_magic_link(&self, secret: &str) -> anyhow::Result<Result<Authenticated, AuthFailure>> {
        let (outcome, resolved) = self.magic_links.resolve(secret).await?;

        match outcome {
            MagicLinkOutcome::Ok => {}
            MagicLinkOutcome::NotFound => return Ok(Err(AuthFailure::InvalidToken)),
            MagicLinkOutcome::Expired => return Ok(Err(AuthFailure::TokenExpired)),
        }

        let Some((subject, role)) = resolved else {
            return Ok(Err(AuthFailure::InvalidToken));
        };

        Ok(Ok(self.issue(subject, role).await?))
    }

    pub fn rate_limit_degraded_decisions(&self) -> u64 {
        self.rate_limiter.degraded_decisions()
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub async fn begin_federated(&self, conf: &Conf, provider: Provider, post_login_redirect: &str) -> anyhow::Result<String> {
        self.oauth.begin(conf, provider, post_login_redirect).await
    }

    pub async fn complete_federated(
        &self,
        conf: &Conf,
        provider: Provider,
        code: &str,
        state: &str,
    ) -> anyhow::Result<Result<(Authenticated, String), AuthFailure>> {
        match self.oauth.complete(conf, provider, code, state).await {
            Ok((subject, role, post_login_redirect)) => {
                let authenticated = self.issue(subject, role).await?;
                Ok(Ok((authenticated, post_login_redirect)))
            }
            Err(error) => Ok(Err(match error {
                crate::oauth::OAuthError::BadState => AuthFailure::BadState,
                crate::oauth::OAuthError::NoAccount => AuthFailure::NoAccount,
                crate::oauth::OAuthError::ProviderRoleMismatch => AuthFailure::ProviderRoleMismatch,
                crate::oauth::OAuthError::OauthFailed(source) => AuthFailure::OauthFailed(source),
            })),
        }
    }

    async fn issue(&self, subject: Subject, role: RoleRecord) -> anyhow::Result<Authenticated> {
        let _ = self.directory.touch_last_login(subject.id).await;

        let (access_token, access_claims) = self.tokens.issue_access(&subject, &role)?;
        let (refresh_token, _) = self.tokens.issue_refresh(&subject)?;

        Ok(Authenticated {
            access_token,
            refresh_token,
            access_claims,
            subject,
            role,
        })
    }

    /// Idempotent: a token that fails to parse is simply not revoked, and this still
    /// reports success.
    pub async fn logout(&self, access_token: &str) -> anyhow::Result<()> {
        let Ok(peeked) = TokenCodec::peek(access_token) else {
            return Ok(());
        };

        if let Ok(expiry) = OffsetDateTime::from_unix_timestamp(peeked.exp) {
            self.blacklist.revoke(peeked.jti, expiry).await?;
        }

        Ok(())
    }
}

fn lockout_remaining(decision: Decision) -> std::time::Duration {
    decision.lockout_remaining.unwrap_or_default()
}

//! Federated-Identity Engine (component H): generic OAuth-code flow plus the four
//! provider-specific adapters described in `providers.rs`.

pub mod providers;

use std::time::Duration;

use rand::RngCore as _;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Conf;
use crate::directory::{Directory, LinkError, Provider, RoleRecord, Subject};
use crate::store::Store;
use crate::token::ClientAssertionSigner;
use providers::{ClientAuth, ProviderDescription, ResponseMode, describe};

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("oauth state is missing or expired")]
    BadState,
    #[error("oauth exchange with the provider failed")]
    OauthFailed(#[source] anyhow::Error),
    #[error("no account links to this identity")]
    NoAccount,
    #[error("provider is not allowed to link this role")]
    ProviderRoleMismatch,
}

impl From<LinkError> for OAuthError {
    fn from(error: LinkError) -> Self {
        match error {
            LinkError::ProviderRoleMismatch => OAuthError::ProviderRoleMismatch,
            LinkError::Conflict => OAuthError::OauthFailed(anyhow::anyhow!("provider subject already linked")),
            LinkError::Other(source) => OAuthError::OauthFailed(source.into()),
        }
    }
}

/// Profile fields normalized across all four providers' differing payload shapes.
pub struct NormalizedProfile {
    pub provider_subject: String,
    pub email: String,
    #[allow(dead_code)]
    pub given_name: Option<String>,
    #[allow(dead_code)]
    pub family_name: Option<String>,
    #[allow(dead_code)]
    pub email_verified: Option<bool>,
}

const STATE_TTL: Duration = Duration::from_secs(600);

pub struct OAuthEngine {
    directory: Directory,
    store: Store,
    http: Client,
    assertion_signer: ClientAssertionSigner,
}

impl OAuthEngine {
    pub fn new(directory: Directory, store: Store, http: Client, assertion_signer: ClientAssertionSigner) -> Self {
        Self {
            directory,
            store,
            http,
            assertion_signer,
        }
    }

    fn state_key(state: &str) -> String {
        format!("oauth:state:{state}")
    }

    pub async fn begin(&self, conf: &Conf, provider: Provider, post_login_redirect: &str) -> anyhow::Result<String> {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let state = hex::encode(raw);

        self.store
            .set_ex(&Self::state_key(&state), post_login_redirect, STATE_TTL)
            .await?;

        let description = describe(conf, provider);
        Ok(authorization_url(conf, &description, &state))
    }

    pub async fn complete(
        &self,
        conf: &Conf,
        provider: Provider,
        code: &str,
        state: &str,
    ) -> Result<(Subject, RoleRecord, String), OAuthError> {
        // Deletion must happen whether or not the rest of this flow succeeds.
        let post_login_redirect = self
            .store
            .fetch_and_delete(&Self::state_key(state))
            .await
            .map_err(|error| OAuthError::OauthFailed(error.into()))?
            .ok_or(OAuthError::BadState)?;

        let description = describe(conf, provider);

        let access_token = self
            .exchange_code(conf, &description, code)
            .await
            .map_err(OAuthError::OauthFailed)?;

        let profile = self
            .fetch_profile(&description, &access_token)
            .await
            .map_err(OAuthError::OauthFailed)?;

        let (subject, role) = self.apply_linking_policy(provider, &profile).await?;

        Ok((subject, role, post_login_redirect))
    }

    async fn exchange_code(&self, conf: &Conf, description: &ProviderDescription, code: &str) -> anyhow::Result<String> {
        let provider_conf = provider_client_conf(conf, description.provider);

        let mut form = vec![
            ("grant_type".to_owned(), "authorization_code".to_owned()),
            ("code".to_owned(), code.to_owned()),
            ("redirect_uri".to_owned(), provider_conf.redirect_url.to_string()),
            ("client_id".to_owned(), provider_conf.client_id.clone()),
        ];

        match description.client_auth {
            ClientAuth::Secret => {
                form.push(("client_secret".to_owned(), provider_conf.client_secret.clone()));
            }
            ClientAuth::SignedAssertion => {
                let assertion =
                    self.assertion_signer
                        .sign(&conf.p4.service_id, &description.token_url, &conf.p4.key_id)?;
                form.push((
                    "client_assertion_type".to_owned(),
                    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer".to_owned(),
                ));
                form.push(("client_assertion".to_owned(), assertion));
            }
        }

        let response = self
            .http
            .post(&description.token_url)
            .timeout(conf.provider_http_timeout)
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
            id_token: Option<String>,
        }

        let body: TokenResponse = response.json().await?;

        match description.response_mode {
            ResponseMode::FormPost => {
                // P4: the userinfo step is replaced entirely by parsing the ID token, so the
                // "access token" carried forward here is really the ID token.
                body.id_token.ok_or_else(|| anyhow::anyhow!("provider did not return an id_token"))
            }
            ResponseMode::Query => body
                .access_token
                .ok_or_else(|| anyhow::anyhow!("provider did not return an access_token")),
        }
    }

    async fn fetch_profile(&self, description: &ProviderDescription, token: &str) -> anyhow::Result<NormalizedProfile> {
        match description.response_mode {
            ResponseMode::FormPost => parse_id_token_unverified(token),
            ResponseMode::Query => {
                let userinfo_url = description
                    .userinfo_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("provider has no userinfo endpoint"))?;

                #[derive(Deserialize)]
                struct Userinfo {
                    sub: Option<String>,
                    id: Option<String>,
                    email: String,
                    given_name: Option<String>,
                    family_name: Option<String>,
                    email_verified: Option<bool>,
                }

                let info: Userinfo = self
                    .http
                    .get(userinfo_url)
                    .bearer_auth(token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;

                let provider_subject = info
                    .sub
                    .or(info.id)
                    .ok_or_else(|| anyhow::anyhow!("provider profile has no stable subject identifier"))?;

                Ok(NormalizedProfile {
                    provider_subject,
                    email: info.email,
                    given_name: info.given_name,
                    family_name: info.family_name,
                    email_verified: info.email_verified,
                })
            }
        }
    }

    /// Resolution order: existing link, then email match plus account link, then
    /// `NoAccount`.
    async fn apply_linking_policy(
        &self,
        provider: Provider,
        profile: &NormalizedProfile,
    ) -> Result<(Subject, RoleRecord), OAuthError> {
        if let Some(pair) = self
            .directory
            .find_role_by_provider_subject(provider, &profile.provider_subject)
            .await
            .map_err(|source| OAuthError::OauthFailed(source.into()))?
        {
            return Ok(pair);
        }

        let subject = self
            .directory
            .find_subject_by_email(&profile.email)
            .await
            .map_err(|source| OAuthError::OauthFailed(source.into()))?
            .ok_or(OAuthError::NoAccount)?;

        self.directory
            .link_provider_subject(subject.discriminator(), subject.role_id, provider, &profile.provider_subject)
            .await?;

        let role = self
            .directory
            .find_role_record(subject.discriminator(), subject.role_id)
            .await
            .map_err(|source| OAuthError::OauthFailed(source.into()))?
            .ok_or(OAuthError::NoAccount)?;

        Ok((subject, role))
    }
}

fn provider_client_conf(conf: &Conf, provider: Provider) -> crate::config::ProviderConf {
    match provider {
        Provider::P1 => conf.p1.clone(),
        Provider::P2 => conf.p2.clone(),
        Provider::P3 => conf.p3.clone(),
        Provider::P4 => crate::config::ProviderConf {
            client_id: conf.p4.service_id.clone(),
            client_secret: String::new(),
            redirect_url: conf.p4.redirect_url.clone(),
        },
    }
}

fn authorization_url(conf: &Conf, description: &ProviderDescription, state: &str) -> String {
    let provider_conf = provider_client_conf(conf, description.provider);
    let response_mode = match description.response_mode {
        ResponseMode::Query => "query",
        ResponseMode::FormPost => "form_post",
    };

    let query = serde_urlencoded::to_string([
        ("client_id", provider_conf.client_id.as_str()),
        ("redirect_uri", provider_conf.redirect_url.as_str()),
        ("response_type", "code"),
        ("response_mode", response_mode),
        ("scope", &description.scopes.join(" ")),
        ("state", state),
    ])
    .unwrap_or_default();

    format!("{}?{query}", description.auth_url)
}

/// Parses the provider-returned ID token without verifying its signature: P4 does not
/// publish a stable signing-key endpoint this gateway depends on, so only the
/// unverified claims are trusted for profile data. A conformant implementation should
/// fetch and cache the provider's public key set and verify the signature instead.
fn parse_id_token_unverified(id_token: &str) -> anyhow::Result<NormalizedProfile> {
    use base64::Engine as _;

    #[derive(Deserialize)]
    struct IdTokenClaims {
        sub: String,
        email: String,
        email_verified: Option<bool>,
    }

    let payload_segment = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("id_token is malformed"))?;
    let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload_segment)?;
    let claims: IdTokenClaims = serde_json::from_slice(&payload_bytes)?;

    Ok(NormalizedProfile {
        provider_subject: claims.sub,
        email: claims.email,
        given_name: None,
        family_name: None,
        email_verified: claims.email_verified,
    })
}

//! Environment-variable driven startup configuration.
//!
//! Parsed once in `main`, wrapped in an `Arc`, and never re-read.

use std::env;
use std::time::Duration;

use anyhow::Context as _;
use camino::Utf8PathBuf;
use picky::key::PrivateKey;
use picky::pem::Pem;
use url::Url;

#[derive(Debug, Clone)]
pub struct ProviderConf {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: Url,
}

#[derive(Debug, Clone)]
pub struct P4Conf {
    pub service_id: String,
    pub team_id: String,
    pub key_id: String,
    pub private_key: PrivateKey,
    pub redirect_url: Url,
}

#[derive(Debug, Clone)]
pub struct Conf {
    pub port: u16,
    pub app_env: String,

    pub database_url: String,
    pub database_pool_size: u32,
    pub redis_url: String,
    pub redis_pool_size: u32,

    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub token_issuer: String,
    pub token_audience: String,

    pub rate_limit_window: Duration,
    pub rate_limit_max_attempts: u32,
    pub rate_limit_lockout: Duration,

    pub cors_allowed_origins: Vec<String>,

    pub p1: ProviderConf,
    pub p2: ProviderConf,
    pub p3: ProviderConf,
    pub p4: P4Conf,

    pub dual_mode_fallback_enabled: bool,
    pub trust_forwarded_for: bool,

    pub log_dir: Utf8PathBuf,
    pub log_filter: String,
    pub shutdown_budget: Duration,

    pub store_timeout: Duration,
    pub provider_http_timeout: Duration,
}

fn env_var(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("missing required environment variable `{name}`"))
}

fn env_var_opt(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_var_parsed<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("environment variable `{name}` is malformed")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(error) => Err(error).with_context(|| format!("environment variable `{name}` is not valid unicode")),
    }
}

fn env_url(name: &str) -> anyhow::Result<Url> {
    let raw = env_var(name)?;
    Url::parse(&raw).with_context(|| format!("environment variable `{name}` is not a valid URL"))
}

fn provider_conf(prefix: &str) -> anyhow::Result<ProviderConf> {
    Ok(ProviderConf {
        client_id: env_var(&format!("{prefix}_CLIENT_ID"))?,
        client_secret: env_var(&format!("{prefix}_CLIENT_SECRET"))?,
        redirect_url: env_url(&format!("{prefix}_REDIRECT_URL"))?,
    })
}

fn load_private_key(path: &str) -> anyhow::Result<PrivateKey> {
    let pem_str = std::fs::read_to_string(path).with_context(|| format!("failed to read private key at {path}"))?;
    let pem: Pem<'_> = pem_str.parse().context("failed to parse PEM structure")?;
    PrivateKey::from_pem(&pem).context("failed to parse ECDSA private key")
}

impl Conf {
    pub fn from_env() -> anyhow::Result<Self> {
        let p4_private_key_path = env_var("P4_PRIVATE_KEY_PATH")?;

        let conf = Self {
            port: env_var_parsed("PORT", 8080u16).context("PORT")?,
            app_env: env_var_opt("APP_ENV", "development"),

            database_url: env_var("DATABASE_URL")?,
            database_pool_size: env_var_parsed("DATABASE_POOL_SIZE", 25u32).context("DATABASE_POOL_SIZE")?,
            redis_url: env_var("REDIS_URL")?,
            redis_pool_size: env_var_parsed("REDIS_POOL_SIZE", 10u32).context("REDIS_POOL_SIZE")?,

            access_token_secret: env_var("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: env_var("REFRESH_TOKEN_SECRET")?,
            access_token_ttl: Duration::from_secs(
                env_var_parsed("ACCESS_TOKEN_TTL_SECONDS", 21_600u64).context("ACCESS_TOKEN_TTL_SECONDS")?,
            ),
            refresh_token_ttl: Duration::from_secs(
                env_var_parsed("REFRESH_TOKEN_TTL_SECONDS", 2_592_000u64).context("REFRESH_TOKEN_TTL_SECONDS")?,
            ),
            token_issuer: env_var("TOKEN_ISSUER")?,
            token_audience: env_var("TOKEN_AUDIENCE")?,

            rate_limit_window: Duration::from_secs(
                env_var_parsed("RATE_LIMIT_WINDOW_SECONDS", 600u64).context("RATE_LIMIT_WINDOW_SECONDS")?,
            ),
            rate_limit_max_attempts: env_var_parsed("RATE_LIMIT_MAX_ATTEMPTS", 5u32)
                .context("RATE_LIMIT_MAX_ATTEMPTS")?,
            rate_limit_lockout: Duration::from_secs(
                env_var_parsed("RATE_LIMIT_LOCKOUT_SECONDS", 900u64).context("RATE_LIMIT_LOCKOUT_SECONDS")?,
            ),

            cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS")?
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),

            p1: provider_conf("P1").context("P1 provider configuration")?,
            p2: provider_conf("P2").context("P2 provider configuration")?,
            p3: provider_conf("P3").context("P3 provider configuration")?,
            p4: P4Conf {
                service_id: env_var("P4_SERVICE_ID")?,
                team_id: env_var("P4_TEAM_ID")?,
                key_id: env_var("P4_KEY_ID")?,
                private_key: load_private_key(&p4_private_key_path).context("P4 private key")?,
                redirect_url: env_url("P4_REDIRECT_URL")?,
            },

            dual_mode_fallback_enabled: env_var_parsed("DUAL_MODE_FALLBACK_ENABLED", false)
                .context("DUAL_MODE_FALLBACK_ENABLED")?,
            trust_forwarded_for: env_var_parsed("TRUST_FORWARDED_FOR", false).context("TRUST_FORWARDED_FOR")?,

            log_dir: Utf8PathBuf::from(env_var_opt("LOG_DIR", "./logs")),
            log_filter: env_var_opt("LOG_FILTER", "info"),
            shutdown_budget: Duration::from_secs(
                env_var_parsed("SHUTDOWN_BUDGET_SECONDS", 5u64).context("SHUTDOWN_BUDGET_SECONDS")?,
            ),

            store_timeout: Duration::from_secs(5),
            provider_http_timeout: Duration::from_secs(10),
        };

        if conf.rate_limit_max_attempts == 0 {
            anyhow::bail!("RATE_LIMIT_MAX_ATTEMPTS must be greater than zero");
        }

        Ok(conf)
    }
}

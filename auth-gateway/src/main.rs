//! Entry point: loads configuration, wires up every component, and serves the HTTP API
//! behind the full middleware stack, with a bounded graceful shutdown.

use std::net::SocketAddr;

use anyhow::Context as _;
use auth_gateway::blacklist::Blacklist;
use auth_gateway::config::Conf;
use auth_gateway::credential::CredentialVerifier;
use auth_gateway::directory::Directory;
use auth_gateway::magic_link::MagicLinkAuthenticator;
use auth_gateway::metrics::Metrics;
use auth_gateway::oauth::OAuthEngine;
use auth_gateway::rate_limit::RateLimiter;
use auth_gateway::session::SessionOrchestrator;
use auth_gateway::state::AppState;
use auth_gateway::store::Store;
use auth_gateway::token::{ClientAssertionSigner, TokenCodec};
use auth_gateway::http;
use gateway_task::{ShutdownHandle, spawn_task};

struct LogConfig;

impl gateway_log::StaticLogConfig for LogConfig {
    const MAX_BYTES_PER_LOG_FILE: u64 = 100 * 1024 * 1024;
    const MAX_LOG_FILES: usize = 30;
    const LOG_FILE_PREFIX: &'static str = "auth-gateway";
}

/// Resolves once an operator-initiated termination signal arrives, on any platform.
async fn wait_for_termination_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let conf = Conf::from_env().context("failed to load configuration")?;

    let _logger_guard = gateway_log::init::<LogConfig>(&conf.log_dir, &conf.log_filter, None)
        .context("failed to initialize logging")?;

    tracing::info!(app_env = %conf.app_env, port = conf.port, "starting auth-gateway");

    let directory = Directory::connect(&conf.database_url, conf.database_pool_size)
        .await
        .context("failed to connect to the directory database")?;

    let store = Store::connect(&conf.redis_url, conf.store_timeout)
        .await
        .context("failed to connect to the key-value store")?;

    let tokens = TokenCodec::new(
        conf.access_token_secret.clone(),
        conf.refresh_token_secret.clone(),
        conf.token_issuer.clone(),
        conf.token_audience.clone(),
        conf.access_token_ttl,
        conf.refresh_token_ttl,
    );

    let blacklist = Blacklist::new(store.clone());

    let rate_limiter = RateLimiter::new(
        store.clone(),
        conf.rate_limit_window,
        conf.rate_limit_max_attempts,
        conf.rate_limit_lockout,
    );

    let credentials = CredentialVerifier::new(directory.clone());
    let magic_links = MagicLinkAuthenticator::new(directory.clone());

    let http_client = reqwest::Client::builder()
        .timeout(conf.provider_http_timeout)
        .build()
        .context("failed to build the provider HTTP client")?;

    let assertion_signer = ClientAssertionSigner::new(conf.p4.private_key.clone());
    let oauth = OAuthEngine::new(directory.clone(), store.clone(), http_client, assertion_signer);

    let sessions = SessionOrchestrator::new(
        directory,
        tokens.clone(),
        blacklist.clone(),
        rate_limiter,
        credentials,
        magic_links,
        oauth,
    );

    let metrics = Metrics::default();
    let shutdown_budget = conf.shutdown_budget;

    let state = AppState::new(conf.clone(), tokens, blacklist, sessions, metrics);
    let router = http::make_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", conf.port))
        .await
        .with_context(|| format!("failed to bind port {}", conf.port))?;

    tracing::info!(port = conf.port, "listening");

    let (shutdown_handle, shutdown_signal) = ShutdownHandle::new();
    let log_deleter = spawn_task(
        gateway_log::LogDeleterTask::<LogConfig>::new(conf.log_dir.clone()),
        shutdown_signal,
    );

    let serve = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for_termination_signal());

    // Races the graceful drain against the shutdown budget: whichever resolves first wins,
    // so a drain that overruns the budget gets the connections dropped rather than awaited
    // indefinitely.
    let watchdog = async {
        wait_for_termination_signal().await;
        tracing::info!("termination signal received, starting graceful shutdown");
        shutdown_handle.signal();
        tokio::time::sleep(shutdown_budget).await;
        tracing::warn!(budget = ?shutdown_budget, "shutdown budget exceeded, exiting anyway");
    };

    tokio::select! {
        result = serve => {
            result.context("server error")?;
        }
        () = watchdog => {}
    }

    log_deleter.abort();

    Ok(())
}

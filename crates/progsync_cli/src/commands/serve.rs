//! Serve command implementation.

use anyhow::Context;
use clap::Args;
use progsync_server::{
    serve, ServerConfig, SyncPolicy, SyncServer, DEFAULT_MAX_DAY_DELTA, DEFAULT_MAX_ITEM_DELTA,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

/// Arguments of `progsync serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1:8080", env = "PROGSYNC_BIND")]
    pub bind: SocketAddr,

    /// Directory for durable documents (in-memory if unset)
    #[arg(long, env = "PROGSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Secret for signing bearer tokens (owner header auth if unset)
    #[arg(long, env = "PROGSYNC_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Token lifetime in hours
    #[arg(long, default_value = "24", env = "PROGSYNC_TOKEN_EXPIRY_HOURS")]
    pub token_expiry_hours: u64,

    /// Submissions this close to the server timestamp are never stale
    #[arg(long, default_value = "2000", env = "PROGSYNC_GRACE_WINDOW_MS")]
    pub grace_window_ms: u64,

    /// Largest day-count difference still merged automatically
    #[arg(long, default_value_t = DEFAULT_MAX_DAY_DELTA, env = "PROGSYNC_MAX_DAY_DELTA")]
    pub max_day_delta: usize,

    /// Largest per-day item-count difference still merged automatically
    #[arg(long, default_value_t = DEFAULT_MAX_ITEM_DELTA, env = "PROGSYNC_MAX_ITEM_DELTA")]
    pub max_item_delta: usize,

    /// Largest accepted request body in bytes
    #[arg(long, default_value = "1048576", env = "PROGSYNC_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,
}

impl ServeArgs {
    /// Maps the arguments onto a server configuration.
    pub fn to_config(&self) -> ServerConfig {
        let policy = SyncPolicy::default()
            .with_grace_window(Duration::from_millis(self.grace_window_ms))
            .with_max_day_delta(self.max_day_delta)
            .with_max_item_delta(self.max_item_delta);

        let mut config = ServerConfig::new(self.bind)
            .with_max_body_bytes(self.max_body_bytes)
            .with_token_expiry(Duration::from_secs(self.token_expiry_hours * 3600))
            .with_policy(policy);
        if let Some(secret) = &self.auth_secret {
            config = config.with_auth(secret.as_bytes().to_vec());
        }
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        config
    }
}

/// Runs the server until Ctrl+C or SIGTERM.
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.to_config();

    info!("Starting progsync v{}", env!("CARGO_PKG_VERSION"));
    match &config.data_dir {
        Some(dir) => info!("  Data dir: {}", dir.display()),
        None => warn!("  Data dir: none, documents live in memory only"),
    }
    if config.auth_enabled() {
        info!("  Auth: bearer tokens");
    } else {
        warn!("  Auth: DISABLED, owners are taken from the x-owner-id header");
    }
    info!(
        "  Policy: grace {}ms, max day delta {}, max item delta {}",
        config.policy.grace_window_millis(),
        config.policy.max_day_delta,
        config.policy.max_item_delta
    );

    let server = Arc::new(SyncServer::open(config.clone()).context("failed to open store")?);
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    serve(server, listener, shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

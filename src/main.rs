use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pushcast::{AppState, router, shutdown_on};
use pushcast_config::{ServerConfig, Validate};
use pushcast_log::LogSettings;
use pushcast_push::{FcmConfig, FcmProvider};
use tracing::{error, info};

/// Device token registry and FCM broadcast server.
#[derive(Parser, Debug)]
#[command(name = "pushcast", version, about)]
struct Cli {
    /// Load variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Bind host, overrides HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.env_file.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.validate().context("Failed to load configuration")?;

    let mut log_settings = LogSettings::from_env(config.debug);
    if let Some(path) = &config.log_file {
        log_settings = log_settings.file(path);
    }
    let _log_guards = log_settings.init()?;

    if let Err(err) = run(config).await {
        error!(error = %format!("{err:#}"), "Server failed");
        return Err(err);
    }
    Ok(())
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let fcm = FcmConfig::from_service_account(&config.service_account_path)
        .context("Failed to load FCM credentials")?;
    info!(project_id = %fcm.project_id, "Loaded FCM service account");
    let provider = FcmProvider::new(fcm).context("Failed to create FCM provider")?;

    let state = AppState::from_config(&config, Arc::new(provider));
    let app = router(state, &config.cors_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        %addr,
        debug = config.debug,
        max_tokens = config.max_tokens,
        "Starting pushcast server"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

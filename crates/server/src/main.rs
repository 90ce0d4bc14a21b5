use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use harbor_server::api;
use harbor_server::app_factory::build_app;
use harbor_server::config::HarborConfig;

/// Harbor encrypted storage HTTP server.
#[derive(Parser, Debug)]
#[command(name = "harbor-server", about = "HTTP server for Harbor encrypted storage")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "harbor.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = Path::new(&cli.config);
    let mut config = HarborConfig::load(config_path)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Needs the telemetry section, so it runs after the config is loaded.
    let telemetry_guard = harbor_server::telemetry::init(&config.telemetry);
    if !config_path.exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let app = build_app(&config).await?;
    let sweeper = tokio::spawn(app.sweeper.run());
    let router = api::router(app.state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, external_url = %config.server.external_url(), "harbor-server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = app.sweeper_shutdown.send(()).await;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    if tokio::time::timeout(shutdown_timeout, sweeper).await.is_err() {
        warn!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            "shutdown timeout exceeded while stopping the sweeper"
        );
    }

    telemetry_guard.shutdown();
    info!("harbor-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}

//! otlan Gateway
//!
//! HTTP gateway in front of a BACnet/IP field network.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use otlan::bacnet::{BacnetService, StandardSchema};
use otlan::config::GatewayConfig;
use otlan::server::{AppState, create_router};
use otlan::sim::{ProjectLoader, SimulatedNetwork};

/// BACnet/IP HTTP gateway
#[derive(Parser, Debug)]
#[command(name = "otlan")]
#[command(about = "BACnet/IP HTTP gateway", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "otlan.toml")]
    config: PathBuf,

    /// Server host address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Path to the simulated project directory (overrides config)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("otlan=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting otlan gateway v{}", env!("CARGO_PKG_VERSION"));

    let mut config = GatewayConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(project) = args.project {
        config.simulation.project = project;
    }

    let schema = StandardSchema::from_config(&config.schema.proprietary)?;
    info!("Schema loaded with {} proprietary classes", config.schema.proprietary.len());

    let project_path = &config.simulation.project;
    let project = match ProjectLoader::load(project_path).await {
        Ok(project) => project,
        Err(e) => {
            error!("Failed to load project from {}: {}", project_path.display(), e);
            return Err(e.into());
        }
    };
    info!("Loaded project: {} ({})", project.name(), project.id());

    let mut network = SimulatedNetwork::from_project(&project)?;
    if let Some(latency_ms) = config.simulation.latency_ms {
        network = network.with_latency(Duration::from_millis(latency_ms));
    }

    let service = BacnetService::new(Arc::new(network), Arc::new(schema));
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(AppState::new(service, config));

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}

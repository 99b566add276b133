use std::net::SocketAddr;
use std::path::Path;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use packflow::app::{router, AppState};
use packflow::config::{AppConfig, WorkflowsConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "packflow=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting packflow");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded");

    let workflows = WorkflowsConfig::load(Path::new(&config.workflows_path))?;
    info!("Workflow configuration validated");

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;

    let state = AppState::new(config, workflows)?;
    let app = router(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

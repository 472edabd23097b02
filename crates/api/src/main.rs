use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use directory::{KeycloakConfig, KeycloakDirectory};
use sales_team_api::{app, config, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging and metrics
    middleware::logging::init_logging(&config.logging);
    middleware::metrics::init_metrics();

    info!("Starting Sales Team API v{}", env!("CARGO_PKG_VERSION"));

    // Build the directory client
    let directory = KeycloakDirectory::new(KeycloakConfig {
        base_url: config.directory.base_url.clone(),
        realm: config.directory.realm.clone(),
        client_id: config.directory.client_id.clone(),
        client_secret: config.directory.client_secret.clone(),
        request_timeout_secs: config.directory.request_timeout_secs,
    })?;

    // Build application
    let app = app::create_app(config.clone(), Arc::new(directory));

    // Start server
    let addr = config.socket_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

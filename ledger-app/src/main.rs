//! # Ledger Application
//!
//! Binary that wires together all the components:
//! - Load configuration from the environment
//! - Initialize logging
//! - Initialize the repository adapter
//! - Create the ledger service
//! - Start the HTTP server

mod config;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ledger_hex::{LedgerService, inbound::HttpServer};
use ledger_repo::build_repo;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,ledger_app=debug,ledger_hex=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::parse();

    init_tracing(config.log_json);

    tracing::info!("Starting ledger server on port {}", config.port);
    tracing::info!("Using database: {}", config.redacted_database_url());

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url, &config.repo_options()).await?;

    // Create the ledger service
    let service = LedgerService::with_transfer_timeout(repo, config.transfer_timeout());
    tracing::debug!(
        transfer_timeout_ms = config.transfer_timeout_ms,
        lock_timeout_ms = config.lock_timeout_ms,
        "Ledger service ready"
    );

    // Create and run the HTTP server
    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}

mod api;
mod bootstrap;
mod campaign;
mod config;
mod contract;
mod error;
mod middleware;
mod price;
mod reconcile;
mod server;
mod upload;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,open_fundraiser=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting Open Fundraiser dashboard service");

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            return Err(e).context("invalid configuration");
        }
    };

    let app = bootstrap::initialize_app_state(&config)
        .await
        .context("failed to initialize application state")?;

    let router = server::create_app(app.state, &config.allowed_origins).await;

    info!("🌐 Server starting on {}", config.bind_address);
    server::run_server(router, &config.bind_address).await?;

    app.ticker.abort();
    Ok(())
}

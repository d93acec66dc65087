mod config;
mod error;
mod models;
mod output;
mod scout;
mod scrapers;
mod server;

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::ScoutConfig;
use scout::MarketScout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_scout=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("SCOUT_CONFIG").unwrap_or_else(|_| "scout.json".to_string());
    let config = Arc::new(ScoutConfig::load(Path::new(&config_path))?);

    info!("🔎 Market Scout - {} listing scraper", config.site.slug);
    info!("Target site: {}", config.site.base_url);

    // artifacts and debug captures need somewhere to land before the first run
    tokio::fs::create_dir_all(&config.downloads_dir).await?;

    let scout = Arc::new(MarketScout::new(Arc::clone(&config)));
    server::serve(scout).await
}

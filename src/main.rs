use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use jotter::{api, config, db, metrics};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jotter=info".parse()?)
        )
        .init();

    info!("Starting Jotter v{}", env!("CARGO_PKG_VERSION"));

    let cfg = config::load()?;
    info!("Configuration loaded");

    let db_pool = db::init(&cfg).await?;
    info!("Database initialized");

    // Request counters shared across handlers, exported at /metrics
    let metrics = Arc::new(metrics::AppMetrics::default());

    api::serve(cfg, db_pool, metrics).await?;

    Ok(())
}

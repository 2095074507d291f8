mod api;
mod checker;
mod config;
mod error;
mod notifier;
mod profile;
mod scheduler;
mod source;
mod store;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::{Config, CHECK_INTERVAL_SECS};
use crate::error::Result;
use crate::scheduler::CheckScheduler;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let cfg = Arc::new(cfg);

    let slugs: Vec<&str> = cfg.profiles.iter().map(|pc| pc.profile.slug).collect();
    info!(
        "Watching {} profiles ({}), checking every {} minutes",
        slugs.len(),
        slugs.join(", "),
        CHECK_INTERVAL_SECS / 60,
    );

    let scheduler = CheckScheduler::new(Arc::clone(&cfg));
    tokio::spawn(async move { scheduler.run().await });

    let app = router(ApiState { cfg: Arc::clone(&cfg) });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

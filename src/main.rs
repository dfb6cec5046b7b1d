//! Mention analytics service: binary entrypoint.
//! Boots the Axum HTTP server with the dataset cache, mail dispatcher and `/metrics`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use mention_analytics::config::AppConfig;
use mention_analytics::ingest::providers::csv_http::HttpCsvSource;
use mention_analytics::metrics::Metrics;
use mention_analytics::{router, AppState, NotificationDispatcher};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - MENTIONS_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("MENTIONS_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mention_analytics=info,warn"));

    // A runtime-provided subscriber may already be installed.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let config = AppConfig::load_default()?;
    if config.feed_url.is_empty() {
        tracing::warn!("feed_url is empty; set MENTIONS_FEED_URL or config/mentions.toml");
    }
    tracing::info!(feed = %config.feed_url, "starting mention analytics");

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(4))
        .timeout(config.fetch_timeout())
        .build()
        .context("building feed http client")?;

    let metrics = Metrics::init()?;
    let state = AppState::new(
        config,
        Arc::new(HttpCsvSource::with_client(client)),
        NotificationDispatcher::default(),
    );
    let app = router(state).merge(metrics.router());

    Ok(app.into())
}

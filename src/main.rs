//! Segmento Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - SEGMENTO_HOST: Bind address (default: 0.0.0.0)
//! - SEGMENTO_PORT: Port number (default: 8080)
//! - RUST_LOG: Log level (default: info)
//!
//! Warehouse:
//! - SEGMENTO_PROJECT: Project that owns the dataset (default: segmento)
//! - SEGMENTO_DATASET: Dataset holding the segment tables (default: campanas)
//! - SEGMENTO_BQ_TOKEN: OAuth2 bearer token
//! - SEGMENTO_BQ_ENDPOINT: REST base URL (default: https://bigquery.googleapis.com/bigquery/v2)
//! - SEGMENTO_BQ_TIMEOUT_SECS: Per-request timeout (default: 30)
//!
//! Query cache:
//! - SEGMENTO_CACHE_TTL_SECS: Entry lifetime (default: 3600)
//! - SEGMENTO_CACHE_MAX_ENTRIES: Entries kept before the oldest is evicted (default: 100)
//! - SEGMENTO_CACHE_SWEEP_SECS: Interval between expired-entry sweeps (default: 600)
//!
//! Statement templates:
//! - SEGMENTO_DEDUP_COLUMN (default: telefono)
//! - SEGMENTO_TIEBREAK_COLUMN (default: fecha_actualizacion)
//! - SEGMENTO_REMINDER_COMPANION (default: envios)
//! - SEGMENTO_DEFAULT_COMPANION (default: contactos)

use segmento::api::{run_server, ServerConfig};
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "segmento=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::default();

    config.host = env_or("SEGMENTO_HOST", config.host);
    config.port = env_or("SEGMENTO_PORT", config.port);

    let warehouse = &mut config.warehouse;
    warehouse.project = env_or("SEGMENTO_PROJECT", warehouse.project.clone());
    warehouse.dataset = env_or("SEGMENTO_DATASET", warehouse.dataset.clone());
    warehouse.endpoint = env_or("SEGMENTO_BQ_ENDPOINT", warehouse.endpoint.clone());
    warehouse.token = std::env::var("SEGMENTO_BQ_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    warehouse.timeout = Duration::from_secs(env_or(
        "SEGMENTO_BQ_TIMEOUT_SECS",
        warehouse.timeout.as_secs(),
    ));

    config.cache_ttl_secs = env_or("SEGMENTO_CACHE_TTL_SECS", config.cache_ttl_secs);
    config.cache_max_entries = env_or("SEGMENTO_CACHE_MAX_ENTRIES", config.cache_max_entries);
    config.cache_sweep_interval_secs =
        env_or("SEGMENTO_CACHE_SWEEP_SECS", config.cache_sweep_interval_secs);

    let templates = &mut config.templates;
    templates.dedup_column = env_or("SEGMENTO_DEDUP_COLUMN", templates.dedup_column.clone());
    templates.tiebreak_column =
        env_or("SEGMENTO_TIEBREAK_COLUMN", templates.tiebreak_column.clone());
    templates.reminder_companion = env_or(
        "SEGMENTO_REMINDER_COMPANION",
        templates.reminder_companion.clone(),
    );
    templates.default_companion = env_or(
        "SEGMENTO_DEFAULT_COMPANION",
        templates.default_companion.clone(),
    );

    tracing::info!("Segmento configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Warehouse: {}.{} via {}",
        config.warehouse.project,
        config.warehouse.dataset,
        config.warehouse.endpoint
    );
    if config.warehouse.token.is_none() {
        tracing::warn!("  SEGMENTO_BQ_TOKEN is not set; warehouse requests will be unauthenticated");
    }
    tracing::info!(
        "  Query cache: {} entries, TTL {} seconds",
        config.cache_max_entries,
        config.cache_ttl_secs
    );
    tracing::info!(
        "  Cache sweep interval: {} seconds",
        config.cache_sweep_interval_secs
    );
    tracing::info!(
        "  Companion tables: {}_m0/{}_m1 (reminders), {} (default)",
        config.templates.reminder_companion,
        config.templates.reminder_companion,
        config.templates.default_companion
    );

    println!(
        r#"
  ____                                  _
 / ___|  ___  __ _ _ __ ___   ___ _ __ | |_ ___
 \___ \ / _ \/ _` | '_ ` _ \ / _ \ '_ \| __/ _ \
  ___) |  __/ (_| | | | | | |  __/ | | | || (_) |
 |____/ \___|\__, |_| |_| |_|\___|_| |_|\__\___/
             |___/

 Filter-to-SQL Segments with Result Caching
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(config).await
}

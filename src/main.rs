//! Snapshot dump
//!
//! Fetches every conference table once and prints the assembled snapshot as
//! JSON on stdout. With `--watch`, keeps refreshing every
//! `UNIDB_REFRESH_INTERVAL_SECS` until interrupted.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use unidb_conference::{Assembler, Config, Repository, UniDbClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("UniDB root: {}", config.api_root());
    tracing::info!("Request timeout: {:?}", config.request_timeout);

    let client = UniDbClient::new(&config)?;
    let assembler = Arc::new(Assembler::new(Repository::new(client)));

    if std::env::args().skip(1).any(|arg| arg == "--watch") {
        tracing::info!("Refreshing every {:?}", config.refresh_interval);
        let handle = assembler.spawn_auto_refresh(config.refresh_interval);
        tokio::signal::ctrl_c().await?;
        assembler.close();
        handle.await?;
        return Ok(());
    }

    assembler.refresh().await?;
    let snapshot = assembler
        .snapshot()
        .await
        .ok_or("refresh finished without publishing a snapshot")?;

    for table in &snapshot.degraded {
        tracing::warn!("Snapshot is missing data from {}", table);
    }

    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
    assembler.close();

    Ok(())
}

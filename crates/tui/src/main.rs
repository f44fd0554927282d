mod app;

use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use popcorn_core::{
    config::{self, AppConfig},
    Catalog, FileStorage, OmdbClient, SlotStorage, Watchlist,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.storage.data_dir)?;
    info!(
        data_dir = %config.storage.data_dir.display(),
        base_url = %config.catalog.base_url,
        "Starting popcorn"
    );

    let catalog: Arc<dyn Catalog> = Arc::new(OmdbClient::new(&config.catalog)?);
    let storage: Arc<dyn SlotStorage> = Arc::new(FileStorage::new(config.storage.data_dir.clone()));
    let watchlist = Watchlist::load(storage, config.storage.watchlist_slot.clone());

    let mut app = app::PopcornApp::new(catalog, watchlist, config.catalog.has_api_key());
    app.run().await
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("popcorn.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the terminal UI
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}

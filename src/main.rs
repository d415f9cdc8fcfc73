//! Scriptlink server.
//!
//! Usage: `scriptlink [config.toml]`. Settings not found in the file fall back
//! to `SCRIPTLINK_*` environment variables and then to built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use scriptlink::dataset::Dataset;
use scriptlink::engine::Engine;
use scriptlink::server;
use scriptlink::settings::Settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_file = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_file.as_deref())?;
    // loaded once, read-only from here on
    let dataset = Arc::new(Dataset::from_json_path(&settings.dataset_path)?);
    let engine = Arc::new(Engine::from_settings(dataset, &settings));

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!(bind = %settings.bind, dataset = %settings.dataset_path.display(), "serving");
    axum::serve(listener, server::router(engine)).await?;
    Ok(())
}

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use rently_core::constants::{
    DATA_DIR_ENV, DEFAULT_DATA_DIR, DEFAULT_REST_ADDR, DEFAULT_UPLOAD_ROOT, REST_ADDR_ENV,
    UPLOAD_ROOT_ENV,
};
use rently_core::repositories::{YamlListingRepository, YamlUserDirectory};
use rently_core::{CoreConfig, ListingManager, path_from_env_value};

/// Main entry point for the Rently application
///
/// Resolves configuration once, wires the YAML repositories and the media store into a
/// `ListingManager`, and serves the REST API.
///
/// # Environment Variables
/// - `RENTLY_UPLOAD_ROOT`: Directory holding listing images (default: "uploads")
/// - `RENTLY_DATA_DIR`: Directory for listing and user records (default: "rently_data")
/// - `RENTLY_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configured directories cannot be created, or
/// - the server address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rently=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let cfg = Arc::new(CoreConfig::new(
        path_from_env_value(std::env::var(UPLOAD_ROOT_ENV).ok(), DEFAULT_UPLOAD_ROOT),
        path_from_env_value(std::env::var(DATA_DIR_ENV).ok(), DEFAULT_DATA_DIR),
    )?);

    std::fs::create_dir_all(cfg.upload_root()).with_context(|| {
        format!(
            "Could not create upload root {}",
            cfg.upload_root().display()
        )
    })?;
    let listings = YamlListingRepository::open(cfg.listings_dir())
        .with_context(|| format!("Could not open {}", cfg.listings_dir().display()))?;
    let users = YamlUserDirectory::new(cfg.users_file());

    tracing::info!(
        "++ Upload root {}, data dir {}",
        cfg.upload_root().display(),
        cfg.data_dir().display()
    );

    let manager = Arc::new(ListingManager::new(
        cfg,
        Arc::new(listings),
        Arc::new(users),
    ));

    api_rest::serve(&rest_addr, AppState::new(manager, rest_addr.clone())).await?;

    Ok(())
}

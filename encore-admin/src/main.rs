//! encore-admin - Admin backend for the Encore fan site
//!
//! REST service backed by MongoDB with media assets on a third-party host.

use anyhow::Result;
use clap::Parser;
use encore_admin::{build_router, AppState};
use encore_common::{config, db};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "encore-admin", about = "Encore fan site admin backend")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding config file and environment
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Encore Admin (encore-admin) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut server_config = config::resolve_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        server_config.bind_addr = bind;
    }

    let database = db::connect(&server_config.mongodb_uri, &server_config.database).await?;
    db::ensure_indexes(&database).await?;

    let media = encore_admin::media::MediaClient::new(server_config.media.clone())?;
    if server_config.media.api_key.is_empty() {
        info!("Media host API key not configured; uploads will be rejected by the host");
    }

    let state = AppState::new(database, media, server_config.session_ttl_minutes);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    info!("encore-admin listening on http://{}", server_config.bind_addr);
    info!("Health check: http://{}/health", server_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

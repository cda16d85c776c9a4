mod config;
mod lifecycle;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use relay_api::AppStateInner;
use relay_client::addresses::listen_addresses;

use crate::config::Config;
use crate::lifecycle::{MarkerFiles, bind_with_auto_increment, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_server=debug,relay_api=debug,relay_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.relay_dir)
        .with_context(|| format!("create {}", config.relay_dir.display()))?;

    let db = relay_db::Database::open(&config.db_path)?;
    let state = AppStateInner::new(db, config.presence_minutes);

    let app = relay_api::router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let (listener, port) =
        bind_with_auto_increment(&config.host, config.port, config.port_attempts).await?;
    let markers = MarkerFiles::write(&config.relay_dir, port)?;

    info!("Relay listening on {}", listener.local_addr()?);
    for addr in listen_addresses(port).await {
        info!("  {}", addr);
    }
    info!("Presence window: {} minutes", config.presence_minutes);

    let dispatcher = state.dispatcher.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open streams never finish on their own.
            dispatcher.close_all();
        })
        .await?;

    drop(markers);
    info!("Relay stopped");
    Ok(())
}

use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use shortener::db::{Repositories, sqlite};
use shortener::service::{AesBlockSealer, IdentityService, deletion_actor};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &shortener::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        server_address = %cfg.server_address,
        base_url = %cfg.base_url.as_ref().map(|u| u.as_str()).unwrap_or("<host header>"),
        loglevel = %cfg.loglevel,
        storage_timeout_secs = cfg.storage_timeout_secs
    );

    let pool = sqlite::connect(&cfg.database_url).await?;
    let repos = Repositories::new(pool, cfg.storage_timeout()).await?;

    let sealer = AesBlockSealer::new(cfg.identity_key_bytes()?);
    let identity = IdentityService::new(Arc::new(sealer), repos.users.clone());
    let deletions = deletion_actor::spawn(repos.urls.clone()).await?;

    let state = shortener::router::ShortenerState::new(
        repos.clone(),
        identity,
        deletions.clone(),
        cfg.base_url.as_ref().map(|u| u.as_str()),
    );
    let app = shortener::router::shortener_router(state);

    let listener = TcpListener::bind(cfg.server_address.as_str()).await?;
    info!("HTTP server listening on {}", cfg.server_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // let queued deletions land before the pool goes away
    if let Err(e) = deletions.flush().await {
        warn!(error = %e, "pending deletions not flushed");
    }
    deletions.stop();
    repos.pool().close().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

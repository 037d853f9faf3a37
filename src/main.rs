use chrono::Local;
use mood_calendar::{AppState, Config, cloud, load_moods, router};
use std::net::SocketAddr;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    for path in [&config.data_path, &config.token_path] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
    }

    let local = load_moods(&config.data_path).await;
    info!(records = local.store.len(), path = %config.data_path.display(), "local moods loaded");
    let port = config.port;
    let state = AppState::new(config, local.store, Local::now().date_naive())?;
    if let Some(warning) = local.warning {
        warn!("{warning}");
        state.set_notice(Some(warning)).await;
    }

    if state.sync.is_some() {
        let background = state.clone();
        tokio::spawn(async move {
            let status = cloud::load_remote(&background).await;
            info!(%status, "initial remote load finished");
        });
    }

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

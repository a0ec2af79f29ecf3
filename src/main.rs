use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;

use site_review::modules::reports::spawn_delivery_retry;
use site_review::{config, create_router, i18n, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let telemetry_handles = telemetry::init_telemetry(None).context("Failed to initialize telemetry")?;

    let config = config::init().context("Failed to load configuration")?;
    info!(
        environment = ?config.app.environment,
        language = %config.app.language,
        "Configuration loaded"
    );

    let localizer = i18n::init_i18n("locales", config.app.language)
        .context("Failed to initialize localization")?;

    let state = AppState::new(config.clone(), Arc::new(localizer));
    let delivery_retry = spawn_delivery_retry(state.reports.clone(), config.notifications.retry_interval);
    let app = create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    delivery_retry.abort();
    telemetry_handles.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

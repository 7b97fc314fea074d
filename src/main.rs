// Optimistic Prediction Market - HTTP server entry point

use optimistic_prediction_market::{router, AppState, MarketConfig, ServerConfig, SharedState};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = ServerConfig::from_env()?;
    tracing_subscriber::fmt().with_max_level(server.log_level).with_target(false).init();

    let config = MarketConfig::from_env()?;
    info!(admin = %config.admin, treasury = %config.treasury, "market configuration loaded");

    let state: SharedState = Arc::new(AppState::load_or_new(config, &server.state_path));
    let shutdown_state = state.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;
    info!(addr = %server.bind_addr, "server running");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("shutdown signal received, saving state");
    if let Err(e) = shutdown_state.save_to_disk() {
        error!(error = %e, "failed to save state");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install CTRL+C handler");
    }
}

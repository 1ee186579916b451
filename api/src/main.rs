use std::time::Duration;

use actix_web::HttpServer;
use tracing::info;

use wg_api::app::{create_app, AppState, Collaborators};
use wg_api::telemetry::init_tracing;
use wg_shared::AppConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!(environment = ?config.environment, "Starting WardGate");

    let collaborators = Collaborators::from_config(&config).await?;
    let state = AppState::assemble(&config, collaborators)?;
    let _background = state.spawn_background(
        Duration::from_secs(config.login_attempts.sweep_interval_seconds.max(1)),
        Duration::from_millis(config.admission.dispatch_interval_ms.max(1)),
    );

    let bind_address = config.server.bind_address();
    info!(address = %bind_address, "Server will bind");

    let server_state = state.clone();
    let mut server = HttpServer::new(move || create_app(server_state.clone()))
        .keep_alive(Duration::from_secs(config.server.keep_alive));
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(&bind_address)?.run().await?;

    info!("Server stopped");
    Ok(())
}

use anyhow::Result;
use axum::Router;
use ltgrid::{api, config, controller, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    let app_state = controller::AppState::new(cfg.clone()).await?;
    let app: Router = api::router(app_state.clone(), &cfg);

    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0; operator actions are unauthenticated, keep this behind a trusted proxy");
    }

    info!(
        %addr,
        window_seconds = cfg.detection.window_seconds,
        confidence_threshold = cfg.detection.confidence_threshold,
        "starting LT grid fault controller"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    app_state.controller.drain().await;
    warn!("shutdown complete");
    Ok(())
}

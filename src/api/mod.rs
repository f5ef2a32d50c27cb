pub mod cases;
pub mod commands;
pub mod devices;
pub mod error;
pub mod events;
pub mod graph;
pub mod health;
pub mod response;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, controller::AppState};

pub fn router(state: AppState, cfg: &Config) -> Router {
    let api = Router::new()
        .route("/events", post(events::submit_event))
        .route("/events/recent", get(events::recent_events))
        .route("/cases", get(cases::list_cases))
        .route("/cases/active", get(cases::active_cases))
        .route("/cases/:id", get(cases::get_case))
        .route("/cases/:id/approve", post(cases::approve_case))
        .route("/cases/:id/block", post(cases::block_case))
        .route("/devices", get(devices::list_devices))
        .route("/devices/:id", get(devices::get_device))
        .route("/devices/:id/open", post(devices::open_device))
        .route("/devices/:id/close", post(devices::close_device))
        .route("/commands", get(commands::list_commands))
        .route("/graph/transformers", get(graph::transformers))
        .route("/graph/transformers/:id/edges", get(graph::transformer_edges))
        .route("/graph/transformers/:id/meters", get(graph::transformer_meters));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/ws", get(ws::notifications))
        .nest("/api", api)
        .with_state(state);

    if cfg.server.enable_cors {
        use tower_http::cors::Any;
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::new(cfg.server.request_timeout())),
        )
        .layer(TraceLayer::new_for_http())
}

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    api::{
        error::ApiError,
        response::{listing, ApiResponse},
    },
    controller::AppState,
    domain::NewEvent,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RecentEventsQuery {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<usize>,
}

/// POST /api/events - Ingest one field event
pub async fn submit_event(
    State(st): State<AppState>,
    Json(event): Json<NewEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let event = st.controller.submit_event(event).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(event))))
}

/// GET /api/events/recent - Most recent events, newest first
pub async fn recent_events(
    State(st): State<AppState>,
    Query(q): Query<RecentEventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    q.validate()?;
    Ok(Json(listing(st.controller.list_recent_events(q.limit))))
}

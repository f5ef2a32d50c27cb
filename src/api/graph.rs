use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    api::{error::ApiError, response::listing},
    controller::AppState,
    domain::TransformerId,
};

/// GET /api/graph/transformers
pub async fn transformers(State(st): State<AppState>) -> impl IntoResponse {
    Json(listing(st.controller.transformers()))
}

/// GET /api/graph/transformers/:id/edges
pub async fn transformer_edges(
    State(st): State<AppState>,
    Path(id): Path<TransformerId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(listing(st.controller.transformer_edges(&id)?)))
}

/// GET /api/graph/transformers/:id/meters
pub async fn transformer_meters(
    State(st): State<AppState>,
    Path(id): Path<TransformerId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(listing(st.controller.transformer_meters(&id)?)))
}

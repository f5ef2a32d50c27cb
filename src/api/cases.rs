use axum::{
    extract::{Path, Query, State},
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
    domain::CaseId,
};

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize, Validate)]
pub struct CaseListQuery {
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct BlockRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// GET /api/cases - Case history, newest first
pub async fn list_cases(
    State(st): State<AppState>,
    Query(q): Query<CaseListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    q.validate()?;
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = st.controller.list_cases(q.page.unwrap_or(1), limit);
    Ok(Json(
        ApiResponse::success(page.cases).with_pagination(page.page, limit, page.total),
    ))
}

/// GET /api/cases/active - Cases awaiting a decision
pub async fn active_cases(State(st): State<AppState>) -> impl IntoResponse {
    Json(listing(st.controller.list_active_cases()))
}

/// GET /api/cases/:id
pub async fn get_case(
    State(st): State<AppState>,
    Path(id): Path<CaseId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::success(st.controller.get_case(&id)?)))
}

/// POST /api/cases/:id/approve - Execute the isolation plan
pub async fn approve_case(
    State(st): State<AppState>,
    Path(id): Path<CaseId>,
) -> Result<impl IntoResponse, ApiError> {
    let approval = st.controller.approve_case(&id)?;
    Ok(Json(ApiResponse::success(approval)))
}

/// POST /api/cases/:id/block - Close the case without switching
pub async fn block_case(
    State(st): State<AppState>,
    Path(id): Path<CaseId>,
    body: Option<Json<BlockRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate()?;
    let case = st.controller.block_case(&id, req.reason.as_deref())?;
    Ok(Json(ApiResponse::success(case)))
}

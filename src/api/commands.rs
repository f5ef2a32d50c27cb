use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{api::response::listing, controller::AppState, domain::CaseId};

#[derive(Debug, Deserialize)]
pub struct CommandQuery {
    pub case: Option<CaseId>,
}

/// GET /api/commands - Switching audit trail, oldest first
pub async fn list_commands(State(st): State<AppState>, Query(q): Query<CommandQuery>) -> impl IntoResponse {
    Json(listing(st.controller.list_commands(q.case.as_ref())))
}

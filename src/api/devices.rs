use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    api::{
        error::ApiError,
        response::{listing, ApiResponse},
    },
    controller::AppState,
    domain::{DeviceId, DeviceKind, MeterId, OwnerRef, TransformerId},
    repo::DeviceFilter,
};

/// Filter for device listings; `transformer` and `meter` are mutually exclusive
#[derive(Debug, Default, Deserialize)]
pub struct DeviceQuery {
    pub transformer: Option<TransformerId>,
    pub meter: Option<MeterId>,
    pub kind: Option<DeviceKind>,
}

impl TryFrom<DeviceQuery> for DeviceFilter {
    type Error = ApiError;

    fn try_from(q: DeviceQuery) -> Result<Self, Self::Error> {
        let owner = match (q.transformer, q.meter) {
            (Some(_), Some(_)) => {
                return Err(ApiError::ValidationError(
                    "filter by transformer or meter, not both".to_string(),
                ))
            }
            (Some(t), None) => Some(OwnerRef::Transformer(t)),
            (None, Some(m)) => Some(OwnerRef::Meter(m)),
            (None, None) => None,
        };
        Ok(DeviceFilter { owner, kind: q.kind })
    }
}

/// GET /api/devices - List devices, sorted by name
pub async fn list_devices(
    State(st): State<AppState>,
    Query(q): Query<DeviceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = DeviceFilter::try_from(q)?;
    Ok(Json(listing(st.controller.list_devices(&filter))))
}

/// GET /api/devices/:id
pub async fn get_device(
    State(st): State<AppState>,
    Path(id): Path<DeviceId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::success(st.controller.get_device(&id)?)))
}

/// POST /api/devices/:id/open - Command returned SENT; settlement follows on /ws
pub async fn open_device(
    State(st): State<AppState>,
    Path(id): Path<DeviceId>,
) -> Result<impl IntoResponse, ApiError> {
    let command = st.controller.open_device(&id)?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(command))))
}

/// POST /api/devices/:id/close
pub async fn close_device(
    State(st): State<AppState>,
    Path(id): Path<DeviceId>,
) -> Result<impl IntoResponse, ApiError> {
    let command = st.controller.close_device(&id)?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(command))))
}

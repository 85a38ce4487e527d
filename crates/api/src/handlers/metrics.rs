//! `getServiceMetric` (spec §6) — the running call-count/success-rate/average
//! latency record for one service node.

use axum::extract::{Path, State};
use axum::Json;

use db::models::ServiceMetricRow;

use crate::error::ApiError;
use crate::AppState;

pub async fn get_service_metric(
    Path(node_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ServiceMetricRow>, ApiError> {
    let row = state.runtime.ledger.get_service_metric(&node_id).await?;
    Ok(Json(row))
}

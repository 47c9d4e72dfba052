//! Audit trail endpoint

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use uplift_api::requests::HistoryQuery;
use uplift_api::responses::AuditRecordView;
use uplift_core::GetHistory;

use crate::api::error::AppError;
use crate::state::AppState;

/// Upgrade history
///
/// All records in insertion order, or one host's records most recent first.
///
/// # Errors
/// Returns `AppError` if the audit store cannot be read
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "audit",
    params(HistoryQuery),
    responses((status = 200, body = Vec<AuditRecordView>))
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<AuditRecordView>>, AppError> {
    let host_id = query.host_id.filter(|id| !id.trim().is_empty());
    let records = state.engine.ask(GetHistory { host_id }).await?;
    Ok(Json(records.iter().map(AuditRecordView::from).collect()))
}

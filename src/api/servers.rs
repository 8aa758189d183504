//! Game server API endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResult;
use crate::models::{HistorySample, ServerSnapshot};
use crate::AppState;

/// GET /api/servers - Query every configured server and list those that answered.
pub async fn list_servers(State(state): State<AppState>) -> ApiResult<Vec<ServerSnapshot>> {
    let targets = state.config.servers.targets()?;
    let snapshots = state.query.query_all(targets).await;
    Ok(Json(snapshots))
}

/// GET /api/servers/history - Sampled player counts per server.
pub async fn server_history(
    State(state): State<AppState>,
) -> ApiResult<BTreeMap<String, Vec<HistorySample>>> {
    Ok(Json(state.server_history.snapshot()))
}

/// GET /api/servers/history/{connect} - Sampled player counts of one server,
/// empty when it has not been seen yet.
pub async fn server_history_by_connect(
    State(state): State<AppState>,
    Path(connect): Path<String>,
) -> ApiResult<Vec<HistorySample>> {
    Ok(Json(state.server_history.get(&connect).unwrap_or_default()))
}

//! Map record and leaderboard endpoints.

use axum::{
    extract::{Query, State},
    Json,
};

use super::ApiResult;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{group_by_map, LeaderboardEntry, LeaderboardQuery, MapRecord, MapRecordGroup};
use crate::AppState;

/// Largest leaderboard page a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 1000;

fn repository(state: &AppState) -> Result<&Repository, AppError> {
    state
        .repo
        .as_deref()
        .ok_or_else(|| AppError::Internal("record store is not configured".to_string()))
}

/// GET /api/getMapRecords - All map records, fastest first.
pub async fn get_map_records(State(state): State<AppState>) -> ApiResult<Vec<MapRecord>> {
    let records = repository(&state)?.list_map_records().await?;
    Ok(Json(records))
}

/// GET /api/getMapRecords/grouped - Records grouped per map.
pub async fn get_grouped_map_records(
    State(state): State<AppState>,
) -> ApiResult<Vec<MapRecordGroup>> {
    let records = repository(&state)?.list_map_records().await?;
    Ok(Json(group_by_map(records)))
}

/// GET /api/getPlayers - Global points leaderboard.
pub async fn get_players(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let (limit, offset) = validate_paging(&query)?;
    let players = repository(&state)?.list_leaderboard(limit, offset).await?;
    Ok(Json(players))
}

fn validate_paging(query: &LeaderboardQuery) -> Result<(Option<u32>, u32), AppError> {
    match (query.limit, query.offset) {
        (Some(0), _) => Err(AppError::Validation("limit must be at least 1".to_string())),
        (Some(limit), _) if limit > MAX_PAGE_SIZE => Err(AppError::Validation(format!(
            "limit must not exceed {}",
            MAX_PAGE_SIZE
        ))),
        (None, Some(_)) => Err(AppError::Validation("offset requires limit".to_string())),
        (limit, offset) => Ok((limit, offset.unwrap_or(0))),
    }
}

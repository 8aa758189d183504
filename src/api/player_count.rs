//! Global player-count history endpoints.

use axum::{extract::State, Json};

use super::ApiResult;
use crate::errors::AppError;
use crate::models::{HistorySample, PlayerCountRequest, SuccessResponse};
use crate::AppState;

/// GET /api/player-count - The rolling history, oldest first.
pub async fn get_player_count(State(state): State<AppState>) -> ApiResult<Vec<HistorySample>> {
    Ok(Json(state.history.snapshot()))
}

/// POST /api/player-count - Append one sample.
pub async fn record_player_count(
    State(state): State<AppState>,
    Json(request): Json<PlayerCountRequest>,
) -> ApiResult<SuccessResponse> {
    let count = u32::try_from(request.count).map_err(|_| {
        AppError::Validation(format!("count must be between 0 and {}", u32::MAX))
    })?;

    let sample = state.history.append(count);
    tracing::debug!("Recorded player count {} at {}", sample.player_count, sample.time_label);

    Ok(Json(SuccessResponse { success: true }))
}

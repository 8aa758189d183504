//! Player-count history models.

use serde::{Deserialize, Serialize};

/// One timestamped player-count sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySample {
    /// Local wall-clock time, `HH:MM`
    #[serde(rename = "time")]
    pub time_label: String,
    #[serde(rename = "count")]
    pub player_count: u32,
}

/// Request body for appending a sample to the global history.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerCountRequest {
    pub count: i64,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

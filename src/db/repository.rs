//! Read-only queries against the timer plugin's tables.

use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};

use crate::errors::AppError;
use crate::models::{LeaderboardEntry, MapRecord};

/// Database repository for record and leaderboard reads.
#[derive(Clone)]
pub struct Repository {
    pool: AnyPool,
}

impl Repository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// All map records, fastest first.
    ///
    /// `FormattedTime` is compared as text. Times share one zero-padded
    /// format, so text order is time order.
    pub async fn list_map_records(&self) -> Result<Vec<MapRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT MapName, PlayerName, FormattedTime FROM PlayerRecords ORDER BY FormattedTime ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_record_from_row).collect()
    }

    /// Players by global points, highest first, optionally paged.
    pub async fn list_leaderboard(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let rows = match limit {
            Some(limit) => {
                sqlx::query(
                    "SELECT PlayerName, SteamID, GlobalPoints FROM PlayerStats ORDER BY GlobalPoints DESC LIMIT ? OFFSET ?",
                )
                .bind(i64::from(limit))
                .bind(i64::from(offset))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT PlayerName, SteamID, GlobalPoints FROM PlayerStats ORDER BY GlobalPoints DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(leaderboard_entry_from_row).collect()
    }
}

fn map_record_from_row(row: &AnyRow) -> Result<MapRecord, AppError> {
    Ok(MapRecord {
        map_name: row.try_get("MapName")?,
        player_name: row.try_get("PlayerName")?,
        formatted_time: row.try_get("FormattedTime")?,
    })
}

fn leaderboard_entry_from_row(row: &AnyRow) -> Result<LeaderboardEntry, AppError> {
    Ok(LeaderboardEntry {
        player_name: row.try_get("PlayerName")?,
        steam_id: row.try_get("SteamID")?,
        global_points: row.try_get("GlobalPoints")?,
    })
}

//! Timer plugin records, read from the relational store.

use serde::{Deserialize, Serialize};

/// A player's best time on a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRecord {
    #[serde(rename = "MapName")]
    pub map_name: String,
    #[serde(rename = "PlayerName")]
    pub player_name: String,
    #[serde(rename = "FormattedTime")]
    pub formatted_time: String,
}

/// All records of one map, fastest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRecordGroup {
    pub map_name: String,
    pub records: Vec<MapRecord>,
}

/// One row of the global points leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "PlayerName")]
    pub player_name: String,
    #[serde(rename = "SteamID")]
    pub steam_id: String,
    #[serde(rename = "GlobalPoints")]
    pub global_points: i64,
}

/// Optional paging of the leaderboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Group time-ordered records by map.
///
/// Groups appear in the order their map first occurs in `records`, and each
/// group keeps the input order of its records.
pub fn group_by_map(records: Vec<MapRecord>) -> Vec<MapRecordGroup> {
    let mut groups: Vec<MapRecordGroup> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|g| g.map_name == record.map_name) {
            Some(group) => group.records.push(record),
            None => groups.push(MapRecordGroup {
                map_name: record.map_name.clone(),
                records: vec![record],
            }),
        }
    }

    groups
}

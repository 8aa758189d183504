//! Game server models.

use serde::{Deserialize, Serialize};

/// One queryable game server from the configured registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTarget {
    #[serde(rename = "ip")]
    pub address: String,
    pub port: u16,
}

impl ServerTarget {
    /// `host:port`, with IPv6 literals bracketed.
    pub fn endpoint(&self, port: u16) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, port)
        } else {
            format!("{}:{}", self.address, port)
        }
    }
}

impl std::fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.endpoint(self.port))
    }
}

/// A point-in-time read of a game server's live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub name: String,
    #[serde(rename = "map")]
    pub current_map: String,
    #[serde(rename = "numPlayers")]
    pub current_player_count: u32,
    #[serde(rename = "maxPlayers")]
    pub max_player_count: u32,
    #[serde(rename = "players")]
    pub player_names: Vec<String>,
    #[serde(rename = "bots")]
    pub bot_count: u32,
    /// Address clients use to join, also the identity across polls
    #[serde(rename = "connect")]
    pub connect_string: String,
    #[serde(rename = "ping")]
    pub ping_milliseconds: u64,
}

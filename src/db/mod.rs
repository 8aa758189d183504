//! Database module for the timer plugin's record store.
//!
//! The store is owned by the timer plugin; this service only reads from it.
//! Production runs against MySQL, tests against SQLite, both through the
//! `Any` driver.

mod repository;

pub use repository::*;

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

/// Create the connection pool without connecting.
///
/// Connections are opened on first use, so the service starts even while the
/// store is unreachable; requests needing it fail until it comes back.
pub fn init_database(database_url: &str) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A SQLite file shaped like the timer plugin's tables.
    pub(crate) async fn seeded_repository(
        records: &[(&str, &str, &str)],
        players: &[(&str, &str, i64)],
    ) -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("timer.sqlite").display());
        let pool = init_database(&url).expect("Failed to init DB");

        sqlx::query(
            "CREATE TABLE PlayerRecords (MapName TEXT NOT NULL, PlayerName TEXT NOT NULL, FormattedTime TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE PlayerStats (PlayerName TEXT NOT NULL, SteamID TEXT NOT NULL, GlobalPoints INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        for (map, player, time) in records {
            sqlx::query("INSERT INTO PlayerRecords (MapName, PlayerName, FormattedTime) VALUES (?, ?, ?)")
                .bind(*map)
                .bind(*player)
                .bind(*time)
                .execute(&pool)
                .await
                .unwrap();
        }
        for (player, steam_id, points) in players {
            sqlx::query("INSERT INTO PlayerStats (PlayerName, SteamID, GlobalPoints) VALUES (?, ?, ?)")
                .bind(*player)
                .bind(*steam_id)
                .bind(*points)
                .execute(&pool)
                .await
                .unwrap();
        }

        (Repository::new(pool), temp_dir)
    }
}

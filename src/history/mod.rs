//! Rolling player-count history.
//!
//! Histories live in process memory only and are lost on restart.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::models::{HistorySample, ServerSnapshot};

/// Samples kept per history unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 30;

/// Format a wall-clock time the way history labels show it.
pub fn time_label<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M").to_string()
}

/// Fixed-capacity FIFO window of player-count samples.
///
/// Holds the most recent `capacity` samples in append order.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    samples: Mutex<VecDeque<HistorySample>>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a sample stamped with the current local time.
    pub fn append(&self, player_count: u32) -> HistorySample {
        self.append_labeled(time_label(&Local::now()), player_count)
    }

    /// Append a sample with an explicit time label, evicting the oldest
    /// samples beyond capacity.
    pub fn append_labeled(&self, time_label: String, player_count: u32) -> HistorySample {
        let sample = HistorySample {
            time_label,
            player_count,
        };

        let mut samples = self.samples.lock();
        samples.push_back(sample.clone());
        while samples.len() > self.capacity {
            samples.pop_front();
        }

        sample
    }

    /// Samples oldest first.
    pub fn snapshot(&self) -> Vec<HistorySample> {
        self.samples.lock().iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One history per game server, keyed by connect string.
///
/// A server that leaves the registry or changes its advertised game port
/// stops receiving samples under its old key; [`ServerHistories::prune_idle`]
/// drops such stores.
#[derive(Debug)]
pub struct ServerHistories {
    capacity: usize,
    stores: DashMap<String, ServerHistory>,
}

#[derive(Debug)]
struct ServerHistory {
    store: HistoryStore,
    last_seen: Instant,
}

impl ServerHistories {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            stores: DashMap::new(),
        }
    }

    /// Append each snapshot's player count to its server's history.
    pub fn record(&self, snapshots: &[ServerSnapshot]) {
        let label = time_label(&Local::now());
        let now = Instant::now();
        for snapshot in snapshots {
            let mut history = self
                .stores
                .entry(snapshot.connect_string.clone())
                .or_insert_with(|| ServerHistory {
                    store: HistoryStore::new(self.capacity),
                    last_seen: now,
                });
            history.store.append_labeled(label.clone(), snapshot.current_player_count);
            history.last_seen = now;
        }
    }

    /// Drop the histories of servers that have not answered for longer than
    /// `max_idle`. Returns how many were dropped.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.stores.len();
        self.stores.retain(|_, history| history.last_seen.elapsed() <= max_idle);
        before - self.stores.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, connect: &str) -> Option<Vec<HistorySample>> {
        self.stores.get(connect).map(|history| history.store.snapshot())
    }

    /// All histories, ordered by connect string.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<HistorySample>> {
        self.stores
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().store.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn counts(store: &HistoryStore) -> Vec<u32> {
        store.snapshot().iter().map(|s| s.player_count).collect()
    }

    fn snapshot(connect: &str, players: u32) -> ServerSnapshot {
        ServerSnapshot {
            name: connect.to_string(),
            current_map: "surf_beginner".to_string(),
            current_player_count: players,
            max_player_count: 32,
            player_names: Vec::new(),
            bot_count: 0,
            connect_string: connect.to_string(),
            ping_milliseconds: 5,
        }
    }

    #[test]
    fn test_keeps_last_thirty_in_order() {
        let store = HistoryStore::new(DEFAULT_CAPACITY);
        for count in 1..=35 {
            store.append(count);
        }

        assert_eq!(store.snapshot().len(), 30);
        assert_eq!(counts(&store), (6..=35).collect::<Vec<_>>());
    }

    #[test]
    fn test_below_capacity_keeps_everything() {
        let store = HistoryStore::new(5);
        store.append_labeled("10:00".to_string(), 3);
        store.append_labeled("10:01".to_string(), 3);

        let samples = store.snapshot();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].time_label, "10:00");
        assert_eq!(samples[1].time_label, "10:01");
    }

    #[test]
    fn test_no_deduplication_or_reordering() {
        let store = HistoryStore::new(3);
        for (label, count) in [("10:05", 1), ("10:01", 1), ("10:03", 9), ("10:02", 4)] {
            store.append_labeled(label.to_string(), count);
        }

        let labels: Vec<_> = store.snapshot().into_iter().map(|s| s.time_label).collect();
        assert_eq!(labels, ["10:01", "10:03", "10:02"]);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let store = HistoryStore::new(0);
        store.append(1);
        store.append(2);
        assert_eq!(store.capacity(), 1);
        assert_eq!(counts(&store), vec![2]);
    }

    #[test]
    fn test_time_label_format() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 59)
            .unwrap()
            .and_utc();
        assert_eq!(time_label(&at), "07:05");

        let label = time_label(&Utc::now());
        assert_eq!(label.len(), 5);
        assert_eq!(&label[2..3], ":");
    }

    #[test]
    fn test_concurrent_appends_respect_capacity() {
        let store = std::sync::Arc::new(HistoryStore::new(30));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.append(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.snapshot().len(), 30);
    }

    #[test]
    fn test_server_histories_are_independent() {
        let histories = ServerHistories::new(2);
        histories.record(&[snapshot("10.0.0.1:27015", 4), snapshot("10.0.0.2:27015", 9)]);
        histories.record(&[snapshot("10.0.0.1:27015", 5)]);
        histories.record(&[snapshot("10.0.0.1:27015", 6)]);

        let first: Vec<_> = histories
            .get("10.0.0.1:27015")
            .unwrap()
            .into_iter()
            .map(|s| s.player_count)
            .collect();
        assert_eq!(first, vec![5, 6]);
        assert_eq!(histories.get("10.0.0.2:27015").unwrap().len(), 1);
        assert!(histories.get("10.0.0.3:27015").is_none());

        let all = histories.snapshot();
        assert_eq!(all.keys().collect::<Vec<_>>(), ["10.0.0.1:27015", "10.0.0.2:27015"]);
    }

    #[test]
    fn test_prune_idle_drops_silent_servers() {
        let histories = ServerHistories::new(30);
        histories.record(&[snapshot("10.0.0.1:27015", 4), snapshot("10.0.0.2:27015", 9)]);
        std::thread::sleep(Duration::from_millis(60));
        histories.record(&[snapshot("10.0.0.2:27015", 8)]);

        assert_eq!(histories.prune_idle(Duration::from_millis(30)), 1);
        assert!(histories.get("10.0.0.1:27015").is_none());
        assert_eq!(histories.get("10.0.0.2:27015").unwrap().len(), 2);

        assert_eq!(histories.prune_idle(Duration::from_secs(60)), 0);
    }
}

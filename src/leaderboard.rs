//! Best-time leaderboards
//!
//! One top-10 table per (track, mode), fastest first. The service is owned
//! by the host and handed to whatever needs it; `LocalLeaderboard` persists
//! through a `BlobStore`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::format_time;
use crate::persistence::replay_key;
use crate::platform::{BlobStore, StoreError};

/// Maximum number of times kept per table
pub const MAX_ENTRIES: usize = 10;

/// A single best time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    /// Race time in milliseconds
    pub time: f64,
}

impl LeaderboardEntry {
    /// Time as `MM:SS.mmm`
    pub fn time_string(&self) -> String {
        format_time(self.time)
    }
}

/// Accepts finished race times and ranks them
pub trait Leaderboard {
    /// Record a time. Returns the 1-based rank, or `None` when it didn't qualify.
    fn submit(&mut self, track: &str, mode: &str, name: &str, elapsed_ms: f64) -> Option<usize>;

    /// Table for a (track, mode) pair, fastest first
    fn entries(&self, track: &str, mode: &str) -> Vec<LeaderboardEntry>;
}

/// Times for one (track, mode) pair, ascending
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BestTimes {
    pub entries: Vec<LeaderboardEntry>,
}

impl BestTimes {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a time makes the table
    pub fn qualifies(&self, time: f64) -> bool {
        if !time.is_finite() || time <= 0.0 {
            return false;
        }
        if self.entries.len() < MAX_ENTRIES {
            return true;
        }
        self.entries.last().map(|e| time < e.time).unwrap_or(true)
    }

    /// Rank a time would get (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, time: f64) -> Option<usize> {
        if !self.qualifies(time) {
            return None;
        }
        let rank = self.entries.iter().position(|e| time < e.time);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a time if it qualifies, returning its rank
    pub fn add(&mut self, name: &str, time: f64) -> Option<usize> {
        if !self.qualifies(time) {
            return None;
        }

        let entry = LeaderboardEntry {
            name: name.to_string(),
            time,
        };

        // Ties keep the earlier time ahead
        let pos = self.entries.iter().position(|e| time < e.time);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_ENTRIES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<f64> {
        self.entries.first().map(|e| e.time)
    }
}

/// Leaderboard kept on this device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalLeaderboard {
    /// Keyed like replays: `race-{track}-{mode}`
    tables: BTreeMap<String, BestTimes>,
}

impl LocalLeaderboard {
    const STORAGE_KEY: &'static str = "hover_racer_leaderboard";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, track: &str, mode: &str) -> Option<&BestTimes> {
        self.tables.get(&replay_key(track, mode))
    }

    /// Load from the store; missing or unreadable data starts fresh
    pub fn load(store: &dyn BlobStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<LocalLeaderboard>(&json) {
                Ok(board) => {
                    log::info!("Loaded leaderboard ({} tables)", board.tables.len());
                    return board;
                }
                Err(e) => log::warn!("Leaderboard data unreadable, starting fresh: {e}"),
            },
            Ok(None) => log::info!("No leaderboard found, starting fresh"),
            Err(e) => log::warn!("Leaderboard storage failed: {e}"),
        }
        Self::new()
    }

    pub fn save(&self, store: &mut dyn BlobStore) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Leaderboard saved ({} tables)", self.tables.len());
        Ok(())
    }
}

impl Leaderboard for LocalLeaderboard {
    fn submit(&mut self, track: &str, mode: &str, name: &str, elapsed_ms: f64) -> Option<usize> {
        let rank = self
            .tables
            .entry(replay_key(track, mode))
            .or_default()
            .add(name, elapsed_ms);
        if let Some(rank) = rank {
            log::info!("{name} ranked #{rank} on {track}/{mode} with {}", format_time(elapsed_ms));
        }
        rank
    }

    fn entries(&self, track: &str, mode: &str) -> Vec<LeaderboardEntry> {
        self.table(track, mode)
            .map(|t| t.entries.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_zero_time_rejected() {
        let mut board = BestTimes::new();
        assert!(!board.qualifies(0.0));
        assert!(!board.qualifies(f64::NAN));
        assert_eq!(board.add("ace", 0.0), None);
        assert!(board.is_empty());
    }

    #[test]
    fn test_fastest_first() {
        let mut board = BestTimes::new();
        assert_eq!(board.add("b", 90_000.0), Some(1));
        assert_eq!(board.add("a", 80_000.0), Some(1));
        assert_eq!(board.add("c", 95_000.0), Some(3));
        // Tie goes after the existing time
        assert_eq!(board.add("d", 90_000.0), Some(3));
        let names: Vec<&str> = board.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "d", "c"]);
        assert_eq!(board.best(), Some(80_000.0));
    }

    #[test]
    fn test_table_capped_at_ten() {
        let mut board = BestTimes::new();
        for i in 1..=MAX_ENTRIES {
            board.add("p", i as f64 * 1000.0);
        }
        assert_eq!(board.entries.len(), MAX_ENTRIES);
        assert!(!board.qualifies(20_000.0));
        assert_eq!(board.potential_rank(500.0), Some(1));
        assert_eq!(board.add("fast", 500.0), Some(1));
        assert_eq!(board.entries.len(), MAX_ENTRIES);
        assert_eq!(board.entries.last().map(|e| e.time), Some(9000.0));
    }

    #[test]
    fn test_tables_are_per_track_and_mode() {
        let mut lb = LocalLeaderboard::new();
        assert_eq!(lb.submit("cityscape", "timeattack", "ace", 92_300.0), Some(1));
        assert_eq!(lb.submit("ring", "timeattack", "ace", 99_000.0), Some(1));
        assert_eq!(lb.entries("cityscape", "timeattack").len(), 1);
        assert!(lb.entries("cityscape", "survival").is_empty());
        assert_eq!(lb.entries("cityscape", "timeattack")[0].time_string(), "01:32.300");
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        let mut lb = LocalLeaderboard::new();
        lb.submit("ring", "timeattack", "ace", 61_000.0);
        lb.save(&mut store).unwrap();

        let loaded = LocalLeaderboard::load(&store);
        assert_eq!(loaded.entries("ring", "timeattack"), lb.entries("ring", "timeattack"));
    }

    #[test]
    fn test_corrupt_data_starts_fresh() {
        let mut store = MemoryStore::new();
        store.set("hover_racer_leaderboard", "[1, 2").unwrap();
        let lb = LocalLeaderboard::load(&store);
        assert!(lb.entries("ring", "timeattack").is_empty());
    }
}

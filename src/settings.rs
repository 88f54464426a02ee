//! Player settings
//!
//! Persisted as JSON in the host's blob store, separately from replays and
//! leaderboards. Unknown or missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{COUNTDOWN_DELAY_MS, DEFAULT_REPLAY_RATE, DEFAULT_TOTAL_LAPS, FINISH_HOLD_MS, START_DELAY_MS};
use crate::platform::{BlobStore, StoreError};
use crate::race::RaceConfig;
use crate::tuning::{Difficulty, ShipTuning};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("storage: {0}")]
    Store(#[from] StoreError),
    #[error("settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Craft ===
    pub difficulty: Difficulty,
    /// No shield damage
    pub godmode: bool,

    // === Race ===
    pub total_laps: u32,
    /// Record one replay frame every N ticks
    pub replay_rate: u32,
    pub countdown_delay_ms: f64,
    pub start_delay_ms: f64,
    pub finish_hold_ms: f64,

    // === Player ===
    /// Name submitted with leaderboard times
    pub player_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Casual,
            godmode: false,

            total_laps: DEFAULT_TOTAL_LAPS,
            replay_rate: DEFAULT_REPLAY_RATE,
            countdown_delay_ms: COUNTDOWN_DELAY_MS,
            start_delay_ms: START_DELAY_MS,
            finish_hold_ms: FINISH_HOLD_MS,

            player_name: "Player".to_string(),
        }
    }
}

impl Settings {
    const STORAGE_KEY: &'static str = "hover_racer_settings";

    /// Settings for a difficulty preset
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Craft constants for the chosen difficulty
    pub fn ship_tuning(&self) -> ShipTuning {
        let tuning = self.difficulty.tuning();
        if self.godmode { tuning.godmode() } else { tuning }
    }

    /// Race timings, with out-of-range values pulled back in
    pub fn race_config(&self) -> RaceConfig {
        let ms = |v: f64, default: f64| if v.is_finite() && v >= 0.0 { v } else { default };
        RaceConfig {
            total_laps: self.total_laps.max(1),
            replay_rate: self.replay_rate.max(1),
            countdown_delay_ms: ms(self.countdown_delay_ms, COUNTDOWN_DELAY_MS),
            start_delay_ms: ms(self.start_delay_ms, START_DELAY_MS),
            finish_hold_ms: ms(self.finish_hold_ms, FINISH_HOLD_MS),
        }
    }

    /// Read stored settings; `Ok(None)` when nothing was saved yet
    pub fn try_load(store: &dyn BlobStore) -> Result<Option<Self>, SettingsError> {
        match store.get(Self::STORAGE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Load settings, falling back to defaults
    pub fn load(store: &dyn BlobStore) -> Self {
        match Self::try_load(store) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Settings unreadable, using defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn BlobStore) -> Result<(), SettingsError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

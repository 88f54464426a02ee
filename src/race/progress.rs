//! Lap and checkpoint bookkeeping

use serde::{Deserialize, Serialize};

use crate::track::{Checkpoints, Pixel};

/// Race mode. Exactly one drives a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RaceMode {
    #[default]
    TimeAttack,
    /// Plays back the stored time-attack run
    Replay,
    /// Not specified yet; only exists in development builds
    #[cfg(debug_assertions)]
    Survival,
}

impl RaceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceMode::TimeAttack => "timeattack",
            RaceMode::Replay => "replay",
            #[cfg(debug_assertions)]
            RaceMode::Survival => "survival",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "timeattack" | "time-attack" => Some(RaceMode::TimeAttack),
            "replay" => Some(RaceMode::Replay),
            #[cfg(debug_assertions)]
            "survival" => Some(RaceMode::Survival),
            _ => None,
        }
    }

    /// Mode whose stored replay this mode records or plays back
    pub fn replay_source(&self) -> RaceMode {
        match self {
            RaceMode::Replay => RaceMode::TimeAttack,
            other => *other,
        }
    }
}

/// How a race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RaceResult {
    #[default]
    None,
    Finished,
    Destroyed,
    /// Reserved; no rule produces it yet
    WrongWay,
    ReplayComplete,
}

impl RaceResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceResult::None => "none",
            RaceResult::Finished => "finished",
            RaceResult::Destroyed => "destroyed",
            RaceResult::WrongWay => "wrong-way",
            RaceResult::ReplayComplete => "replay-complete",
        }
    }
}

/// Checkpoint id painted on a checkpoint-map pixel
pub fn decode_checkpoint(pixel: Pixel) -> Option<u8> {
    pixel.checkpoint_id()
}

/// What a checkpoint sample changed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckpointOutcome {
    /// Same checkpoint as before, or none under the craft
    Unchanged,
    /// Entered a new checkpoint
    Reached(u8),
    /// Crossed the start line after the last checkpoint; `lap` is the new lap
    LapCompleted { lap: u32, time: f64 },
    /// Completed the final lap
    Finished { time: f64 },
}

/// Lap state for one race
#[derive(Debug, Clone)]
pub struct RaceProgress {
    checkpoints: Checkpoints,
    lap: u32,
    total_laps: u32,
    lap_times: Vec<f64>,
    /// Race time at the end of the last completed lap
    lap_time_elapsed: f64,
    previous_checkpoint: Option<u8>,
    result: RaceResult,
}

impl RaceProgress {
    pub fn new(checkpoints: Checkpoints, total_laps: u32) -> Self {
        Self {
            checkpoints,
            lap: 1,
            total_laps: total_laps.max(1),
            lap_times: Vec::new(),
            lap_time_elapsed: 0.0,
            previous_checkpoint: None,
            result: RaceResult::None,
        }
    }

    /// Back to lap 1 with no times
    pub fn reset(&mut self) {
        self.lap = 1;
        self.lap_times.clear();
        self.lap_time_elapsed = 0.0;
        self.previous_checkpoint = None;
        self.result = RaceResult::None;
    }

    /// Feed the checkpoint under the craft at race time `elapsed_ms`.
    ///
    /// A lap only counts when the sequence goes from the last checkpoint to
    /// the start checkpoint. Ids outside the track's list are ignored.
    pub fn record_checkpoint(&mut self, id: Option<u8>, elapsed_ms: f64) -> CheckpointOutcome {
        if self.result != RaceResult::None {
            return CheckpointOutcome::Unchanged;
        }
        let Some(id) = id else {
            return CheckpointOutcome::Unchanged;
        };
        if !self.checkpoints.list.contains(&id) || self.previous_checkpoint == Some(id) {
            return CheckpointOutcome::Unchanged;
        }

        let crossed_line =
            self.previous_checkpoint == Some(self.checkpoints.last) && id == self.checkpoints.start;
        self.previous_checkpoint = Some(id);

        if !crossed_line {
            return CheckpointOutcome::Reached(id);
        }

        let time = elapsed_ms - self.lap_time_elapsed;
        self.lap_time_elapsed = elapsed_ms;
        self.lap_times.push(time);

        if self.lap >= self.total_laps {
            self.result = RaceResult::Finished;
            CheckpointOutcome::Finished { time }
        } else {
            self.lap += 1;
            CheckpointOutcome::LapCompleted {
                lap: self.lap,
                time,
            }
        }
    }

    pub fn set_result(&mut self, result: RaceResult) {
        self.result = result;
    }

    pub fn result(&self) -> RaceResult {
        self.result
    }

    /// Current lap, 1-based
    pub fn lap(&self) -> u32 {
        self.lap
    }

    pub fn total_laps(&self) -> u32 {
        self.total_laps
    }

    pub fn is_final_lap(&self) -> bool {
        self.lap == self.total_laps
    }

    /// Finalized lap times in order
    pub fn lap_times(&self) -> &[f64] {
        &self.lap_times
    }

    pub fn best_lap(&self) -> Option<f64> {
        self.lap_times.iter().copied().reduce(f64::min)
    }

    /// Sum of finalized lap times
    pub fn total_time(&self) -> f64 {
        self.lap_time_elapsed
    }

    pub fn previous_checkpoint(&self) -> Option<u8> {
        self.previous_checkpoint
    }
}

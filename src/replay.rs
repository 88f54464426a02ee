//! Replay recording and playback
//!
//! Recording samples the craft pose every `rate`-th tick. Playback walks a
//! forward-only cursor and interpolates between the bracketing frames: lerp
//! for position, slerp for orientation. The first and last frames are
//! applied as-is.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_REPLAY_RATE;
use crate::sim::VehicleSimulation;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("replay JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame {index} has a non-finite value")]
    NonFinite { index: usize },

    #[error("frame {index} goes back in time ({time} < {previous})")]
    Unordered { index: usize, time: f64, previous: f64 },
}

/// One recorded pose.
///
/// Persisted as `[time_ms, px, py, pz, qx, qy, qz, qw]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 8]", into = "[f64; 8]")]
pub struct ReplayFrame {
    pub time: f64,
    pub position: Vec3,
    pub orientation: Quat,
}

impl From<[f64; 8]> for ReplayFrame {
    fn from(v: [f64; 8]) -> Self {
        Self {
            time: v[0],
            position: Vec3::new(v[1] as f32, v[2] as f32, v[3] as f32),
            orientation: Quat::from_xyzw(v[4] as f32, v[5] as f32, v[6] as f32, v[7] as f32),
        }
    }
}

impl From<ReplayFrame> for [f64; 8] {
    fn from(f: ReplayFrame) -> Self {
        let p = f.position;
        let q = f.orientation;
        [
            f.time,
            p.x as f64,
            p.y as f64,
            p.z as f64,
            q.x as f64,
            q.y as f64,
            q.z as f64,
            q.w as f64,
        ]
    }
}

impl ReplayFrame {
    fn is_finite(&self) -> bool {
        self.time.is_finite() && self.position.is_finite() && self.orientation.is_finite()
    }
}

/// Recorded run for one (track, mode) pair
#[derive(Debug, Clone)]
pub struct ReplayLog {
    track: String,
    mode: String,
    rate: u32,
    /// Ticks seen while recording
    counter: u32,
    frames: Vec<ReplayFrame>,
    /// Playback position; `None` while there is nothing to play
    cursor: Option<usize>,
}

impl ReplayLog {
    /// Empty log recording every `rate`-th tick (at least every tick)
    pub fn new(track: impl Into<String>, mode: impl Into<String>, rate: u32) -> Self {
        Self {
            track: track.into(),
            mode: mode.into(),
            rate: rate.max(1),
            counter: 0,
            frames: Vec::new(),
            cursor: None,
        }
    }

    /// Empty log at the default decimation
    pub fn with_default_rate(track: impl Into<String>, mode: impl Into<String>) -> Self {
        Self::new(track, mode, DEFAULT_REPLAY_RATE)
    }

    /// Sample the craft pose, keeping one call in `rate`
    pub fn tick(&mut self, elapsed_ms: f64, ship: &VehicleSimulation) {
        let record = self.counter % self.rate == 0;
        self.counter = self.counter.wrapping_add(1);
        if !record {
            return;
        }

        // Timestamps never go backwards
        let time = match self.frames.last() {
            Some(last) if elapsed_ms < last.time => last.time,
            _ => elapsed_ms,
        };
        let (position, orientation) = ship.pose();
        self.frames.push(ReplayFrame {
            time,
            position,
            orientation,
        });
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
    }

    /// Move the craft to the recorded pose at `time_ms`.
    ///
    /// The cursor only moves forward. An empty log leaves the craft alone.
    pub fn seek_and_apply(&mut self, time_ms: f64, ship: &mut VehicleSimulation) {
        let Some(mut cursor) = self.cursor else {
            log::warn!("Replay {} has no frames, playback skipped", self.key());
            return;
        };

        let last = self.frames.len() - 1;
        while cursor < last && self.frames[cursor + 1].time < time_ms {
            cursor += 1;
        }
        self.cursor = Some(cursor);

        if cursor == 0 || cursor == last {
            let frame = self.frames[cursor];
            ship.teleport(frame.position, frame.orientation);
            return;
        }

        let prev = self.frames[cursor];
        let next = self.frames[cursor + 1];
        let span = next.time - prev.time;
        let t = if span > 0.0 {
            ((time_ms - prev.time) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if t >= 1.0 {
            ship.teleport(next.position, next.orientation);
        } else if t <= 0.0 {
            ship.teleport(prev.position, prev.orientation);
        } else {
            let t = t as f32;
            ship.teleport(
                prev.position.lerp(next.position, t),
                prev.orientation.slerp(next.orientation, t),
            );
        }
    }

    /// Playback reached the final frame
    pub fn at_end(&self) -> bool {
        match self.cursor {
            Some(c) => c + 1 >= self.frames.len(),
            None => false,
        }
    }

    /// Start playback over
    pub fn rewind(&mut self) {
        self.cursor = if self.frames.is_empty() { None } else { Some(0) };
    }

    /// Copy of every recorded frame
    pub fn export(&self) -> Vec<ReplayFrame> {
        self.frames.clone()
    }

    /// Replace the recording. Frames must be finite and in time order;
    /// on error the log is left untouched.
    pub fn import(&mut self, frames: Vec<ReplayFrame>) -> Result<(), ReplayError> {
        for (index, frame) in frames.iter().enumerate() {
            if !frame.is_finite() {
                return Err(ReplayError::NonFinite { index });
            }
            if index > 0 && frame.time < frames[index - 1].time {
                return Err(ReplayError::Unordered {
                    index,
                    time: frame.time,
                    previous: frames[index - 1].time,
                });
            }
        }

        self.counter = u32::try_from(frames.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.rate);
        self.frames = frames;
        self.rewind();
        log::info!("Imported replay {} ({} frames)", self.key(), self.frames.len());
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(&self.frames)?)
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), ReplayError> {
        let frames: Vec<ReplayFrame> = serde_json::from_str(json)?;
        self.import(frames)
    }

    /// Storage key for this (track, mode) pair
    pub fn key(&self) -> String {
        crate::persistence::replay_key(&self.track, &self.mode)
    }

    pub fn track(&self) -> &str {
        &self.track
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Timestamp of the last frame
    pub fn duration(&self) -> f64 {
        self.frames.last().map(|f| f.time).unwrap_or(0.0)
    }
}

//! Race state machine
//!
//! Step codes: 0 waiting, 1/2/3 showing "3"/"2"/"1", 4 racing, 100 result
//! hold. After the hold the race goes inactive.

use serde::{Deserialize, Serialize};

use super::progress::{CheckpointOutcome, RaceMode, RaceProgress, RaceResult, decode_checkpoint};
use crate::clock::{Clock, format_time};
use crate::consts::{COUNTDOWN_DELAY_MS, DEFAULT_REPLAY_RATE, DEFAULT_TOTAL_LAPS, FINISH_HOLD_MS, START_DELAY_MS};
use crate::frame_dt;
use crate::persistence::{self, PersistError};
use crate::platform::{BlobStore, MonotonicTime, TimeSource};
use crate::replay::ReplayLog;
use crate::sim::{ShipInput, TrackMaps, VehicleSimulation};
use crate::track::{Track, project_rounded};
use crate::tuning::ShipTuning;

/// Race timing and length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    pub total_laps: u32,
    /// Replay decimation: record every Nth tick
    pub replay_rate: u32,
    /// Wait before "3"
    pub countdown_delay_ms: f64,
    /// Gap between countdown displays
    pub start_delay_ms: f64,
    /// Result display time before the race goes inactive
    pub finish_hold_ms: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            total_laps: DEFAULT_TOTAL_LAPS,
            replay_rate: DEFAULT_REPLAY_RATE,
            countdown_delay_ms: COUNTDOWN_DELAY_MS,
            start_delay_ms: START_DELAY_MS,
            finish_hold_ms: FINISH_HOLD_MS,
        }
    }
}

/// Where the race is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStep {
    Waiting,
    Three,
    Two,
    One,
    Racing,
    Finished,
}

impl RaceStep {
    /// Numeric step contract
    pub fn code(&self) -> u32 {
        match self {
            RaceStep::Waiting => 0,
            RaceStep::Three => 1,
            RaceStep::Two => 2,
            RaceStep::One => 3,
            RaceStep::Racing => 4,
            RaceStep::Finished => 100,
        }
    }
}

/// Things the HUD and audio react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    /// Countdown display: 3, 2 or 1
    Countdown(u8),
    Go,
    Checkpoint(u8),
    /// `lap` is the lap just completed, final lap included
    LapCompleted { lap: u32, time: f64 },
    FinalLap,
    Ended { result: RaceResult, time: f64 },
    /// Result hold is over
    Closed,
}

/// Runs one race over one track
#[derive(Debug)]
pub struct RaceDirector<S: TimeSource = MonotonicTime> {
    track: Track,
    config: RaceConfig,
    mode: RaceMode,
    ship: VehicleSimulation,
    clock: Clock<S>,
    replay: ReplayLog,
    progress: RaceProgress,
    step: RaceStep,
    active: bool,
    finish_time: Option<f64>,
    events: Vec<RaceEvent>,
}

impl<S: TimeSource> RaceDirector<S> {
    pub fn new(track: Track, tuning: ShipTuning, config: RaceConfig, mode: RaceMode, source: S) -> Self {
        let ship = VehicleSimulation::new(tuning, TrackMaps::from_track(&track));
        let replay = ReplayLog::new(&track.layout.id, mode.replay_source().as_str(), config.replay_rate);
        let progress = RaceProgress::new(track.layout.checkpoints.clone(), config.total_laps);
        Self {
            track,
            config,
            mode,
            ship,
            clock: Clock::new(source),
            replay,
            progress,
            step: RaceStep::Waiting,
            active: false,
            finish_time: None,
            events: Vec::new(),
        }
    }

    /// Put the craft on the spawn, reset laps and start the countdown.
    ///
    /// Time attack records into a fresh log; replay mode rewinds the log set
    /// by `load_replay`/`set_replay`.
    pub fn start(&mut self) {
        #[cfg(debug_assertions)]
        if self.mode == RaceMode::Survival {
            unimplemented!("survival mode has no defined rules");
        }

        let layout = &self.track.layout;
        self.ship.reset(layout.spawn, layout.spawn_rotation);
        self.ship.set_active(false);
        self.progress.reset();

        match self.mode {
            RaceMode::Replay => {
                self.replay.rewind();
                if self.replay.is_empty() {
                    log::warn!("Replay {} is empty, playback will not move", self.replay.key());
                }
            }
            _ => {
                self.replay = ReplayLog::new(&layout.id, self.mode.as_str(), self.config.replay_rate);
            }
        }

        self.step = RaceStep::Waiting;
        self.finish_time = None;
        self.events.clear();
        self.active = true;
        self.clock.start();
        log::info!("Race started on '{}' ({})", layout.id, self.mode.as_str());
    }

    /// Advance one frame
    pub fn update(&mut self, input: &ShipInput) {
        if !self.active {
            return;
        }
        self.clock.update();
        let elapsed = self.clock.elapsed();
        let dt = frame_dt(self.clock.delta());

        match self.step {
            RaceStep::Waiting | RaceStep::Three | RaceStep::Two | RaceStep::One => {
                self.ship.update(dt, input);
                self.countdown(elapsed);
            }
            RaceStep::Racing => self.race_tick(dt, elapsed, input),
            RaceStep::Finished => {
                if self.mode != RaceMode::Replay {
                    self.ship.update(dt, input);
                }
                let finished_at = self.finish_time.unwrap_or(elapsed);
                if elapsed - finished_at >= self.config.finish_hold_ms {
                    self.active = false;
                    self.events.push(RaceEvent::Closed);
                }
            }
        }
    }

    fn countdown(&mut self, elapsed: f64) {
        let c = &self.config;
        let (threshold, next) = match self.step {
            RaceStep::Waiting => (c.countdown_delay_ms, RaceStep::Three),
            RaceStep::Three => (c.countdown_delay_ms + c.start_delay_ms, RaceStep::Two),
            RaceStep::Two => (c.countdown_delay_ms + c.start_delay_ms * 2.0, RaceStep::One),
            RaceStep::One => (c.countdown_delay_ms + c.start_delay_ms * 3.0, RaceStep::Racing),
            RaceStep::Racing | RaceStep::Finished => return,
        };
        if elapsed < threshold {
            return;
        }

        self.step = next;
        match next {
            RaceStep::Three => self.events.push(RaceEvent::Countdown(3)),
            RaceStep::Two => self.events.push(RaceEvent::Countdown(2)),
            RaceStep::One => self.events.push(RaceEvent::Countdown(1)),
            RaceStep::Racing => {
                // Race time starts at "Go"
                self.clock.start();
                if self.mode != RaceMode::Replay {
                    self.ship.set_active(true);
                }
                self.events.push(RaceEvent::Go);
                if self.progress.is_final_lap() {
                    self.events.push(RaceEvent::FinalLap);
                }
            }
            RaceStep::Waiting | RaceStep::Finished => {}
        }
    }

    fn race_tick(&mut self, dt: f32, elapsed: f64, input: &ShipInput) {
        match self.mode {
            RaceMode::TimeAttack => self.time_attack_tick(dt, elapsed, input),
            RaceMode::Replay => self.replay_tick(elapsed),
            #[cfg(debug_assertions)]
            RaceMode::Survival => unimplemented!("survival mode has no defined rules"),
        }
    }

    fn time_attack_tick(&mut self, dt: f32, elapsed: f64, input: &ShipInput) {
        self.ship.update(dt, input);
        self.replay.tick(elapsed, &self.ship);

        if self.ship.is_destroyed() {
            self.end(RaceResult::Destroyed);
            return;
        }

        let map = &self.track.checkpoints;
        if !map.is_loaded() {
            return;
        }
        let (x, y) = project_rounded(map, self.ship.position(), self.track.layout.pixel_ratio);
        let id = decode_checkpoint(map.sample_point(x, y));

        match self.progress.record_checkpoint(id, elapsed) {
            CheckpointOutcome::Unchanged => {}
            CheckpointOutcome::Reached(id) => self.events.push(RaceEvent::Checkpoint(id)),
            CheckpointOutcome::LapCompleted { lap, time } => {
                log::info!("Lap {} in {}", lap - 1, format_time(time));
                self.events.push(RaceEvent::LapCompleted { lap: lap - 1, time });
                if self.progress.is_final_lap() {
                    self.events.push(RaceEvent::FinalLap);
                }
            }
            CheckpointOutcome::Finished { time } => {
                self.events.push(RaceEvent::LapCompleted {
                    lap: self.progress.lap(),
                    time,
                });
                self.end(RaceResult::Finished);
            }
        }
    }

    fn replay_tick(&mut self, elapsed: f64) {
        if self.replay.is_empty() {
            return;
        }
        self.replay.seek_and_apply(elapsed, &mut self.ship);
        if self.replay.at_end() {
            self.end(RaceResult::ReplayComplete);
        }
    }

    /// Freeze input, record the final time and hold the result
    pub fn end(&mut self, result: RaceResult) {
        if self.step == RaceStep::Finished {
            return;
        }
        let time = self.clock.elapsed();
        self.ship.set_active(false);
        self.progress.set_result(result);
        self.finish_time = Some(time);
        self.step = RaceStep::Finished;
        self.events.push(RaceEvent::Ended { result, time });
        log::info!(
            "Race ended on '{}': {} at {}",
            self.track.layout.id,
            result.as_str(),
            format_time(time)
        );
    }

    /// Take the events raised since the last call
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Replace the log replay mode plays back
    pub fn set_replay(&mut self, replay: ReplayLog) {
        self.replay = replay;
    }

    /// Load the stored run for this track
    pub fn load_replay(&mut self, store: &dyn BlobStore) -> Result<(), PersistError> {
        let replay = persistence::load_replay(
            store,
            &self.track.layout.id,
            self.mode.replay_source().as_str(),
            self.config.replay_rate,
        )?;
        self.replay = replay;
        Ok(())
    }

    /// Store the recorded run
    pub fn save_replay(&self, store: &mut dyn BlobStore) -> Result<(), PersistError> {
        persistence::save_replay(store, &self.replay)
    }

    /// Final race time, once a time-attack race finished
    pub fn score(&self) -> Option<f64> {
        match self.progress.result() {
            RaceResult::Finished => self.finish_time,
            _ => None,
        }
    }

    /// `MM:SS.mmm` of the final time, or of the running time
    pub fn time_string(&self) -> String {
        format_time(self.finish_time.unwrap_or(self.clock.elapsed()))
    }

    // === Accessors ===

    pub fn step(&self) -> RaceStep {
        self.step
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mode(&self) -> RaceMode {
        self.mode
    }

    pub fn result(&self) -> RaceResult {
        self.progress.result()
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    pub fn progress(&self) -> &RaceProgress {
        &self.progress
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock<S> {
        &self.clock
    }

    pub fn replay(&self) -> &ReplayLog {
        &self.replay
    }

    pub fn ship(&self) -> &VehicleSimulation {
        &self.ship
    }

    pub fn ship_mut(&mut self) -> &mut VehicleSimulation {
        &mut self.ship
    }
}

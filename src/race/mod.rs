//! Race flow: countdown, laps, mode dispatch and the end result

pub mod director;
pub mod progress;

pub use director::{RaceConfig, RaceDirector, RaceEvent, RaceStep};
pub use progress::{CheckpointOutcome, RaceMode, RaceProgress, RaceResult, decode_checkpoint};

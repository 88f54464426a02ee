//! Replay persistence
//!
//! A replay is stored as a JSON array of 8-tuples under `race-{track}-{mode}`
//! in whatever `BlobStore` the host provides.

use thiserror::Error;

use crate::platform::{BlobStore, StoreError};
use crate::replay::{ReplayError, ReplayLog};

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("storage: {0}")]
    Store(#[from] StoreError),
    #[error("replay: {0}")]
    Replay(#[from] ReplayError),
}

/// Storage key for a (track, mode) replay
pub fn replay_key(track: &str, mode: &str) -> String {
    format!("race-{track}-{mode}")
}

/// Persist the replay, replacing any earlier one for the same pair
pub fn save_replay(store: &mut dyn BlobStore, replay: &ReplayLog) -> Result<(), PersistError> {
    let json = replay.to_json()?;
    store.set(&replay.key(), &json)?;
    log::info!("Saved replay {} ({} frames)", replay.key(), replay.len());
    Ok(())
}

/// Load the stored replay for a (track, mode) pair
pub fn load_replay(
    store: &dyn BlobStore,
    track: &str,
    mode: &str,
    rate: u32,
) -> Result<ReplayLog, PersistError> {
    let key = replay_key(track, mode);
    let json = store.get(&key)?.ok_or_else(|| StoreError::NotFound(key.clone()))?;
    let mut replay = ReplayLog::new(track, mode, rate);
    replay.import_json(&json)?;
    Ok(replay)
}

/// True when a replay exists for the pair
pub fn has_replay(store: &dyn BlobStore, track: &str, mode: &str) -> bool {
    matches!(store.get(&replay_key(track, mode)), Ok(Some(_)))
}

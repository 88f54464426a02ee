//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (monotonic milliseconds)
//! - Storage (LocalStorage on web, files natively)
//! - Logger installation

pub mod storage;
pub mod time;

pub use storage::{BlobStore, MemoryStore, StoreError};
pub use time::{ManualTime, MonotonicTime, TimeSource};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::DirStore;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;

/// Install the platform logger. Safe to call more than once.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Install the platform logger. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

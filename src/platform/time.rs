//! Millisecond time sources

use std::cell::Cell;
use std::rc::Rc;

/// Anything that can report the current time in milliseconds.
/// Readings must never go backwards.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Wall-clock monotonic source
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    #[cfg(not(target_arch = "wasm32"))]
    origin: std::time::Instant,
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            origin: std::time::Instant::now(),
        }
    }
}

impl TimeSource for MonotonicTime {
    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

/// Hand-driven source for replays, tests and fixed-step hosts.
/// Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<f64>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward; negative steps are ignored
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }

    pub fn set(&self, ms: f64) {
        if ms >= self.now.get() {
            self.now.set(ms);
        }
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_shared_and_monotonic() {
        let t = ManualTime::new();
        let handle = t.clone();
        handle.advance(16.0);
        assert_eq!(t.now_ms(), 16.0);
        handle.advance(-5.0);
        handle.set(3.0);
        assert_eq!(t.now_ms(), 16.0);
        handle.set(40.0);
        assert_eq!(t.now_ms(), 40.0);
    }

    #[test]
    fn test_monotonic_never_decreases() {
        let t = MonotonicTime::new();
        let a = t.now_ms();
        let b = t.now_ms();
        assert!(b >= a);
    }
}

//! Race clock and time formatting
//!
//! The clock is sampled once per frame. `elapsed` is measured from the last
//! `start()`, `delta` from the previous `update()`. Time spent paused is
//! excluded from both.

use crate::platform::{MonotonicTime, TimeSource};

/// Frame clock
#[derive(Debug, Clone)]
pub struct Clock<S: TimeSource = MonotonicTime> {
    source: S,
    start: f64,
    current: f64,
    previous: f64,
    elapsed: f64,
    delta: f64,
    active: bool,
    paused_at: Option<f64>,
}

impl Default for Clock<MonotonicTime> {
    fn default() -> Self {
        Self::new(MonotonicTime::new())
    }
}

impl<S: TimeSource> Clock<S> {
    /// Create an inactive clock reading from `source`
    pub fn new(source: S) -> Self {
        let now = source.now_ms();
        Self {
            source,
            start: now,
            current: now,
            previous: now,
            elapsed: 0.0,
            delta: 0.0,
            active: false,
            paused_at: None,
        }
    }

    /// Reset every reading to now and activate
    pub fn start(&mut self) {
        let now = self.source.now_ms();
        self.start = now;
        self.current = now;
        self.previous = now;
        self.elapsed = 0.0;
        self.delta = 0.0;
        self.active = true;
        self.paused_at = None;
    }

    /// Sample the time source. No-op while inactive.
    pub fn update(&mut self) {
        if !self.active {
            return;
        }
        let now = self.source.now_ms();
        self.current = now;
        self.elapsed = now - self.start;
        self.delta = now - self.previous;
        self.previous = now;
    }

    /// Pause or resume. Resuming shifts the reference points by the time
    /// spent paused, so the next `update` continues where it stopped.
    pub fn pause(&mut self, paused: bool) {
        let now = self.source.now_ms();
        if paused {
            if self.active {
                self.active = false;
                self.delta = 0.0;
                self.paused_at = Some(now);
            }
        } else if !self.active {
            if let Some(at) = self.paused_at.take() {
                let gap = now - at;
                self.start += gap;
                self.previous += gap;
            }
            self.active = true;
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Milliseconds since `start`
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Milliseconds between the last two updates
    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Last sampled time
    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Elapsed time as `MM:SS.mmm`
    pub fn elapsed_string(&self) -> String {
        format_time(self.elapsed)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// A duration split into display fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub millis: u64,
}

/// Split milliseconds into hours and wrapped minutes/seconds/millis
pub fn split_time(ms: f64) -> TimeParts {
    let t = ms.max(0.0).floor() as u64;
    TimeParts {
        hours: t / 3_600_000,
        minutes: (t / 60_000) % 60,
        seconds: (t / 1000) % 60,
        millis: t % 1000,
    }
}

/// Format milliseconds as `MM:SS.mmm` (leaderboard and HUD contract)
pub fn format_time(ms: f64) -> String {
    let p = split_time(ms);
    format!("{:02}:{:02}.{:03}", p.minutes, p.seconds, p.millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ManualTime;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(92300.0), "01:32.300");
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_time(5007.9), "00:05.007");
        assert_eq!(format_time(599_999.0), "09:59.999");
        assert_eq!(format_time(-10.0), "00:00.000");
    }

    #[test]
    fn test_split_time_hours() {
        let p = split_time(3_725_004.0);
        assert_eq!(
            p,
            TimeParts {
                hours: 1,
                minutes: 2,
                seconds: 5,
                millis: 4
            }
        );
    }

    #[test]
    fn test_update_inactive_is_noop() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        time.advance(100.0);
        clock.update();
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn test_elapsed_and_delta() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(16.0);
        clock.update();
        time.advance(17.0);
        clock.update();
        assert_eq!(clock.elapsed(), 33.0);
        assert_eq!(clock.delta(), 17.0);
        assert_eq!(clock.elapsed_string(), "00:00.033");
    }

    #[test]
    fn test_pause_does_not_drift() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(1000.0);
        clock.update();

        clock.pause(true);
        time.advance(5000.0);
        clock.update();
        assert_eq!(clock.elapsed(), 1000.0);

        clock.pause(false);
        time.advance(20.0);
        clock.update();
        assert_eq!(clock.elapsed(), 1020.0);
        assert_eq!(clock.delta(), 20.0);
    }

    #[test]
    fn test_start_resets() {
        let time = ManualTime::new();
        let mut clock = Clock::new(time.clone());
        clock.start();
        time.advance(500.0);
        clock.update();
        clock.start();
        assert_eq!(clock.elapsed(), 0.0);
        assert!(clock.is_active());
    }
}

//! Frame pacing.
//!
//! Hosts call back at their own native rate, which may be far above what a
//! background animation needs. [`FrameGate`] accepts a callback only when the
//! target interval has passed since the last accepted one, capping the
//! simulation rate regardless of the host. [`FrameStats`] keeps the counters
//! the engine logs.
//!
//! Timestamps are host milliseconds (`f64`), the same clock a browser frame
//! callback receives, so tests can drive the gate with synthetic times.
//!
//! Hosts without a native frame clock, like the desktop viewer, use
//! [`FramePacer`] to decide when to issue the next callback: one interval
//! after the last accepted frame while running, and a coarse poll while
//! suspended.
//!
//! # Example
//!
//! ```
//! use backdrop::time::FrameGate;
//!
//! let mut gate = FrameGate::from_fps(60.0);
//! assert!(!gate.accept(5.0));
//! assert!(gate.accept(17.0));
//! assert!(!gate.accept(20.0));
//! ```

use std::time::{Duration, Instant};

use crate::engine::FrameOutcome;

/// Rate limiter for frame callbacks.
#[derive(Debug, Clone)]
pub struct FrameGate {
    /// Minimum milliseconds between accepted frames.
    interval: f64,
    /// Timestamp of the last accepted frame.
    last_accepted: f64,
}

impl FrameGate {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval: interval_ms.max(0.0),
            last_accepted: 0.0,
        }
    }

    pub fn from_fps(fps: f32) -> Self {
        Self::new(1000.0 / fps as f64)
    }

    #[inline]
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Accept the callback at `now` if a full interval has passed.
    pub fn accept(&mut self, now: f64) -> bool {
        if now - self.last_accepted < self.interval {
            return false;
        }
        self.last_accepted = now;
        true
    }

    /// Forget the last accepted frame, as after a remount.
    pub fn reset(&mut self) {
        self.last_accepted = 0.0;
    }
}

/// Wake-up deadlines for a host that schedules frame callbacks itself.
///
/// The host reports what each callback did and sleeps until the returned
/// deadline before issuing the next one.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    /// Poll period while the engine is suspended.
    idle_poll: Duration,
    /// Shortest sleep after a throttled callback.
    min_wait: Duration,
    last_accepted: Option<Instant>,
}

impl FramePacer {
    pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(250);

    pub fn new(interval_ms: f64, idle_poll: Duration) -> Self {
        let interval = if interval_ms.is_finite() && interval_ms > 0.0 {
            Duration::from_secs_f64(interval_ms / 1000.0)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            idle_poll,
            min_wait: Duration::from_millis(1),
            last_accepted: None,
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When to issue the next callback, given what the callback at `now`
    /// did. `None` means the engine wants no more callbacks.
    pub fn next_deadline(&mut self, outcome: FrameOutcome, now: Instant) -> Option<Instant> {
        match outcome {
            FrameOutcome::Ticked | FrameOutcome::Dropped => {
                self.last_accepted = Some(now);
                Some(now + self.interval)
            }
            FrameOutcome::Throttled => {
                let due = self.last_accepted.map_or(now, |last| last + self.interval);
                Some(due.max(now + self.min_wait))
            }
            FrameOutcome::Suspended => Some(now + self.idle_poll),
            FrameOutcome::Inactive => None,
        }
    }

    /// Forget the last accepted frame so the next one is due right away.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

/// Counters for accepted, throttled, suspended and dropped callbacks, plus
/// a ticks-per-second estimate refreshed every `fps_window` milliseconds.
#[derive(Debug, Clone)]
pub struct FrameStats {
    ticks: u64,
    throttled: u64,
    suspended: u64,
    dropped: u64,
    fps: f32,
    fps_window: f64,
    window_start: Option<f64>,
    window_ticks: u64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            throttled: 0,
            suspended: 0,
            dropped: 0,
            fps: 0.0,
            fps_window: 500.0,
            window_start: None,
            window_ticks: 0,
        }
    }

    /// Record an accepted tick at `now`. Returns the fresh estimate when a
    /// window closes.
    pub fn record_tick(&mut self, now: f64) -> Option<f32> {
        self.ticks += 1;
        self.window_ticks += 1;
        let start = *self.window_start.get_or_insert(now);
        let elapsed = now - start;
        if elapsed >= self.fps_window {
            self.fps = (self.window_ticks as f64 * 1000.0 / elapsed) as f32;
            self.window_start = Some(now);
            self.window_ticks = 0;
            return Some(self.fps);
        }
        None
    }

    pub fn record_throttled(&mut self) {
        self.throttled += 1;
    }

    pub fn record_suspended(&mut self) {
        self.suspended += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Accepted ticks, including dropped ones.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn throttled(&self) -> u64 {
        self.throttled
    }

    #[inline]
    pub fn suspended(&self) -> u64 {
        self.suspended
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Last ticks-per-second estimate.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

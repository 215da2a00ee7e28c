use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time readings, relative to an arbitrary origin.
pub trait TimeSource: Send + Sync + 'static {
    fn now(&self) -> Duration;
}

/// Production time source backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeSource {
    origin: Instant,
}

impl MonotonicTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTimeSource {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven time source for tests and headless runs.
///
/// Clones share the same reading, so a test can keep one handle and give
/// another to the quiz.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    millis: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.millis.store(at.as_millis() as u64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// What a single countdown tick observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub remaining: Duration,
    /// Set on the one tick that first crosses the warning threshold.
    pub warning: bool,
    /// Set on the one tick that reaches zero.
    pub expired: bool,
}

/// Single pausable countdown.
///
/// Progress is kept as elapsed-so-far plus the reading at the last resume, so
/// pausing and resuming never moves the deadline.
#[derive(Debug, Clone)]
pub struct Countdown {
    duration: Duration,
    enabled: bool,
    running: bool,
    resumed_at: Duration,
    banked: Duration,
    remaining: Duration,
    warning_threshold: Option<Duration>,
    warning_fired: bool,
    expired: bool,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            enabled: true,
            running: false,
            resumed_at: Duration::ZERO,
            banked: Duration::ZERO,
            remaining: duration,
            warning_threshold: None,
            warning_fired: false,
            expired: false,
        }
    }

    /// A countdown that ignores `start`, used when the timer setting is off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(Duration::ZERO)
        }
    }

    pub fn with_warning(mut self, threshold: Duration) -> Self {
        self.warning_threshold = Some(threshold);
        self
    }

    /// Begin or resume counting. Returns false when nothing changed.
    pub fn start(&mut self, now: Duration) -> bool {
        if self.running || !self.enabled || self.expired {
            return false;
        }
        self.running = true;
        self.resumed_at = now;
        true
    }

    pub fn pause(&mut self, now: Duration) {
        if !self.running {
            return;
        }
        self.banked = (self.banked + now.saturating_sub(self.resumed_at)).min(self.duration);
        self.remaining = self.duration - self.banked;
        self.running = false;
    }

    pub fn reset(&mut self, now: Duration) {
        self.pause(now);
        self.banked = Duration::ZERO;
        self.remaining = self.duration;
        self.warning_fired = false;
        self.expired = false;
    }

    /// Advance the countdown. Returns `None` while not running.
    pub fn tick(&mut self, now: Duration) -> Option<Tick> {
        if !self.running {
            return None;
        }

        let elapsed = self.banked + now.saturating_sub(self.resumed_at);
        self.remaining = self.duration.saturating_sub(elapsed);

        let mut warning = false;
        if let Some(threshold) = self.warning_threshold {
            if !self.warning_fired && self.remaining <= threshold {
                self.warning_fired = true;
                warning = true;
            }
        }

        let expired = self.remaining.is_zero();
        if expired {
            self.banked = self.duration;
            self.running = false;
            self.expired = true;
        }

        Some(Tick {
            remaining: self.remaining,
            warning,
            expired,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn elapsed(&self) -> Duration {
        self.duration - self.remaining
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn warning_fired(&self) -> bool {
        self.warning_fired
    }

    /// Fraction of the duration still left, 1.0 for a disabled countdown.
    pub fn fraction_remaining(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        self.remaining.as_secs_f64() / self.duration.as_secs_f64()
    }
}

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A source of millisecond timestamps, monotonically non-decreasing for the
/// lifetime of the instance.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Resolve the best available clock for this host.
///
/// `Instant` is the high-resolution monotonic timer on every supported Rust
/// target, so the selection always lands on [`MonotonicClock`];
/// [`SystemClock`] remains available as the wall-clock last resort.
pub fn default_clock() -> Box<dyn Clock> {
    Box::new(MonotonicClock::new())
}

/// High-resolution monotonic clock, measured from construction.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1e3
    }
}

/// Wall-clock fallback (milliseconds since the Unix epoch).
///
/// Wall time can step backwards; readings are clamped so the [`Clock`]
/// contract of non-decreasing timestamps still holds.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_ms: Cell<f64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1e3)
            .unwrap_or(0.0);
        let clamped = now.max(self.last_ms.get());
        self.last_ms.set(clamped);
        clamped
    }
}

/// Test clock whose time only moves when told to.
///
/// Clones share the same underlying time, so a test can hold one clone and
/// hand another to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, now_ms: f64) {
        self.now_ms.set(now_ms);
    }

    pub fn advance_ms(&self, delta_ms: f64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }
}

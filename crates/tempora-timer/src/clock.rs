//! Clock sources for interval timing

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic time source consumed by the timers
pub trait Clock {
    /// Opaque reading
    type Instant: Copy;

    /// Current reading. Readings MUST be monotonically non-decreasing
    fn now(&self) -> Self::Instant;

    /// Time between two readings, zero if `later` precedes `earlier`
    fn duration_since(&self, later: Self::Instant, earlier: Self::Instant) -> Duration;

    /// Yield the processor for `duration`
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// OS monotonic clock (`std::time::Instant`)
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    type Instant = Instant;

    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn duration_since(&self, later: Instant, earlier: Instant) -> Duration {
        later.saturating_duration_since(earlier)
    }
}

#[derive(Debug, Default)]
struct ManualState {
    /// Time since the clock was created
    now: Duration,
    /// Added after every reading
    step: Duration,
}

/// Manually driven clock.
///
/// Clones share the same timeline, so a test can keep one handle and give
/// another to a timer. `sleep` advances the timeline instead of blocking.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Create a clock frozen at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that moves forward by `step` after every reading,
    /// so busy-wait loops terminate
    pub fn with_auto_advance(step: Duration) -> Self {
        let clock = Self::new();
        clock.set_auto_advance(step);
        clock
    }

    pub fn set_auto_advance(&self, step: Duration) {
        self.state.lock().step = step;
    }

    /// Move the timeline forward
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.now = state.now.saturating_add(duration);
    }

    /// Total time elapsed on the timeline
    pub fn elapsed(&self) -> Duration {
        self.state.lock().now
    }
}

impl Clock for ManualClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        let mut state = self.state.lock();
        let reading = state.now;
        state.now = state.now.saturating_add(state.step);
        reading
    }

    #[inline]
    fn duration_since(&self, later: Duration, earlier: Duration) -> Duration {
        later.saturating_sub(earlier)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

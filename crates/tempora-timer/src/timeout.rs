//! Timeout guard
//!
//! A `Timeout` owns one interval timer and a positive threshold in the same
//! unit. Activity calls `kick` to push expiry back by a full period.

use tempora_core::{TimeError, TimeResult};

use crate::{Clock, IntervalTimer, MonotonicClock, TimerPrecision};

fn check_duration(duration: u64) -> TimeResult<u64> {
    if duration == 0 {
        return Err(TimeError::InvalidArgument {
            name: "duration",
            requirement: "must be greater than 0",
            value: duration.to_string(),
        }
        .reported());
    }
    Ok(duration)
}

/// Expiry tracking on top of an interval timer
#[derive(Debug)]
pub struct Timeout<C: Clock = MonotonicClock> {
    timer: IntervalTimer<C>,
    /// Threshold in `precision` units, always > 0
    duration: u64,
}

impl Timeout<MonotonicClock> {
    /// Start a timeout of `duration` units on the OS monotonic clock
    pub fn new(duration: u64, precision: TimerPrecision) -> TimeResult<Self> {
        Self::with_clock(MonotonicClock, duration, precision)
    }
}

impl<C: Clock> Timeout<C> {
    pub fn with_clock(clock: C, duration: u64, precision: TimerPrecision) -> TimeResult<Self> {
        let duration = check_duration(duration)?;
        let mut timer = IntervalTimer::with_clock(clock, precision);
        timer.reset();
        tracing::trace!(duration, precision = %precision, "timeout started");
        Ok(Timeout { timer, duration })
    }

    pub fn expired(&self) -> bool {
        self.timer.elapsed() >= self.duration
    }

    /// Units left before expiry, zero once expired
    pub fn remaining(&self) -> u64 {
        self.duration.saturating_sub(self.timer.elapsed())
    }

    pub fn elapsed(&self) -> u64 {
        self.timer.elapsed()
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn precision(&self) -> TimerPrecision {
        self.timer.precision()
    }

    /// Inner timer, for reading laps or delaying in the same unit
    pub fn timer(&self) -> &IntervalTimer<C> {
        &self.timer
    }

    /// Restart the period without changing its length
    pub fn kick(&mut self) {
        self.timer.reset();
    }

    /// Restart the period, replacing its length when `duration` is given.
    ///
    /// A rejected duration leaves the timeout untouched.
    pub fn reset(&mut self, duration: Option<u64>) -> TimeResult<()> {
        if let Some(duration) = duration {
            self.duration = check_duration(duration)?;
        }
        self.timer.reset();
        tracing::trace!(duration = self.duration, "timeout reset");
        Ok(())
    }
}

//! Frequency <-> interval conversion and `Duration` interop

use std::time::Duration;

use crate::{convert_time, TimeError, TimeResult, TimeUnit, TimeValue};

/// Interval of one cycle at `rate` Hz, expressed in `to` units
pub fn rate_to_interval(rate: f64, to: TimeUnit) -> TimeResult<f64> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(TimeError::positive("rate", rate));
    }
    // One second in target units, divided by cycles per second
    Ok(convert_time(1, TimeUnit::Second, to, false)?.as_f64() / rate)
}

/// Cycles per second for a period of `interval` `from` units
pub fn interval_to_rate(interval: f64, from: TimeUnit) -> TimeResult<f64> {
    if !(interval.is_finite() && interval > 0.0) {
        return Err(TimeError::positive("interval", interval));
    }
    Ok(convert_time(1, TimeUnit::Second, from, false)?.as_f64() / interval)
}

/// Build a `Duration` from a non-negative magnitude in `from` units
pub fn to_duration(value: impl Into<TimeValue>, from: TimeUnit) -> TimeResult<Duration> {
    let value = value.into();
    let negative = || {
        TimeError::InvalidArgument {
            name: "value",
            requirement: "must not be negative",
            value: value.to_string(),
        }
        .reported()
    };

    match convert_time(value, from, TimeUnit::Nanosecond, true)? {
        TimeValue::Exact(nanos) => u64::try_from(nanos)
            .map(Duration::from_nanos)
            .map_err(|_| negative()),
        TimeValue::Approximate(nanos) if nanos < 0.0 => Err(negative()),
        TimeValue::Approximate(nanos) => {
            Duration::try_from_secs_f64(nanos / 1e9).map_err(|_| {
                TimeError::InvalidArgument {
                    name: "value",
                    requirement: "must fit in a Duration",
                    value: value.to_string(),
                }
                .reported()
            })
        }
    }
}

/// Express a `Duration` in `to` units
pub fn from_duration(duration: Duration, to: TimeUnit, prefer_integer: bool) -> TimeValue {
    let nanos = duration.as_nanos();
    let per_unit = to.nanos() as u128;
    if prefer_integer && nanos % per_unit == 0 {
        if let Ok(whole) = i64::try_from(nanos / per_unit) {
            return TimeValue::Exact(whole);
        }
    }
    TimeValue::Approximate(nanos as f64 / per_unit as f64)
}

//! Time units and numeric unit conversion
//!
//! Every unit carries an exact integer nanosecond factor. Conversions fuse the
//! ratio between two units instead of routing through seconds, so extreme
//! pairs (nanosecond <-> day) keep full precision.

use std::fmt;
use std::str::FromStr;

use crate::{TimeError, TimeResult};

const VALID_UNITS: &str = "ns, us, ms, s, m, h, d";

/// Time unit understood by the conversion engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// All units, finest to coarsest
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Nanosecond,
        TimeUnit::Microsecond,
        TimeUnit::Millisecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
    ];

    /// Nanoseconds per unit
    #[inline]
    pub const fn nanos(self) -> i64 {
        match self {
            TimeUnit::Nanosecond => 1,
            TimeUnit::Microsecond => 1_000,
            TimeUnit::Millisecond => 1_000_000,
            TimeUnit::Second => 1_000_000_000,
            TimeUnit::Minute => 60_000_000_000,
            TimeUnit::Hour => 3_600_000_000_000,
            TimeUnit::Day => 86_400_000_000_000,
        }
    }

    /// Seconds per unit
    #[inline]
    pub fn seconds(self) -> f64 {
        self.nanos() as f64 / 1e9
    }

    /// Short symbol (`ns`, `us`, ...)
    pub const fn symbol(self) -> &'static str {
        match self {
            TimeUnit::Nanosecond => "ns",
            TimeUnit::Microsecond => "us",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Second => "s",
            TimeUnit::Minute => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
        }
    }

    /// Long name (`nanosecond`, ...)
    pub const fn name(self) -> &'static str {
        match self {
            TimeUnit::Nanosecond => "nanosecond",
            TimeUnit::Microsecond => "microsecond",
            TimeUnit::Millisecond => "millisecond",
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TimeUnit {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeUnit::ALL
            .into_iter()
            .find(|unit| s == unit.symbol() || s == unit.name())
            .ok_or_else(|| {
                TimeError::InvalidUnit {
                    value: s.to_string(),
                    valid: VALID_UNITS,
                }
                .reported()
            })
    }
}

/// A converted magnitude, tagged with its numeric domain
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeValue {
    /// Exactly representable integer quantity
    Exact(i64),
    /// Floating-point quantity, possibly integral
    Approximate(f64),
}

impl TimeValue {
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            TimeValue::Exact(v) => v as f64,
            TimeValue::Approximate(v) => v,
        }
    }

    /// Integer value if the magnitude is integral and fits in `i64`
    pub fn as_exact(self) -> Option<i64> {
        match self {
            TimeValue::Exact(v) => Some(v),
            TimeValue::Approximate(v) => integral_i64(v),
        }
    }

    #[inline]
    pub fn is_exact(self) -> bool {
        matches!(self, TimeValue::Exact(_))
    }

    /// Truncate toward zero, saturating at the `i64` bounds
    pub fn trunc(self) -> i64 {
        match self {
            TimeValue::Exact(v) => v,
            TimeValue::Approximate(v) => v.trunc() as i64,
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Exact(v) => write!(f, "{}", v),
            TimeValue::Approximate(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for TimeValue {
    fn from(v: i64) -> Self {
        TimeValue::Exact(v)
    }
}

impl From<i32> for TimeValue {
    fn from(v: i32) -> Self {
        TimeValue::Exact(v as i64)
    }
}

impl From<u32> for TimeValue {
    fn from(v: u32) -> Self {
        TimeValue::Exact(v as i64)
    }
}

impl From<u64> for TimeValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => TimeValue::Exact(v),
            Err(_) => TimeValue::Approximate(v as f64),
        }
    }
}

impl From<f64> for TimeValue {
    fn from(v: f64) -> Self {
        TimeValue::Approximate(v)
    }
}

impl From<f32> for TimeValue {
    fn from(v: f32) -> Self {
        TimeValue::Approximate(v as f64)
    }
}

pub(crate) fn integral_i64(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Scale a float between units using the exact integer ratio of their factors
fn scale(value: f64, from: TimeUnit, to: TimeUnit) -> f64 {
    let (f, t) = (from.nanos(), to.nanos());
    if f >= t {
        value * (f / t) as f64
    } else {
        value / (t / f) as f64
    }
}

/// Convert `value` from `from` units into `to` units.
///
/// With `prefer_integer` the result is [`TimeValue::Exact`] whenever the
/// converted magnitude is integral and fits in `i64`. Without it the result
/// is always [`TimeValue::Approximate`], even for integral magnitudes.
pub fn convert_time(
    value: impl Into<TimeValue>,
    from: TimeUnit,
    to: TimeUnit,
    prefer_integer: bool,
) -> TimeResult<TimeValue> {
    let converted = match value.into() {
        TimeValue::Exact(v) => {
            let scaled = v as i128 * from.nanos() as i128;
            let divisor = to.nanos() as i128;
            if scaled % divisor == 0 {
                let quotient = scaled / divisor;
                match i64::try_from(quotient) {
                    Ok(q) if prefer_integer => return Ok(TimeValue::Exact(q)),
                    _ => return Ok(TimeValue::Approximate(quotient as f64)),
                }
            }
            scale(v as f64, from, to)
        }
        TimeValue::Approximate(v) => {
            if !v.is_finite() {
                return Err(TimeError::InvalidArgument {
                    name: "value",
                    requirement: "must be finite",
                    value: v.to_string(),
                }
                .reported());
            }
            scale(v, from, to)
        }
    };

    Ok(match integral_i64(converted) {
        Some(v) if prefer_integer => TimeValue::Exact(v),
        _ => TimeValue::Approximate(converted),
    })
}

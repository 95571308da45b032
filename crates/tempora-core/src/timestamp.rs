//! UTC timestamps and their encodings
//!
//! A timestamp is a signed count of microseconds since the Unix epoch. It can
//! be carried in three interchangeable encodings:
//! - Text: `YYYY-MM-DD-HH-MM-SS-ffffff` with a caller-chosen separator
//! - Integer: the raw `i64` microsecond count
//! - Binary: the same `i64` as 8 bytes, little-endian (same order as the wire headers)
//!
//! Precision truncation resets every field finer than the cut to its minimum
//! value (month/day to 1, everything else to 0) and never rounds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::units::integral_i64;
use crate::{TimeError, TimeResult};

const VALID_FORMATS: &str = "string, integer, binary";
const VALID_PRECISIONS: &str = "year, month, day, hour, minute, second, microsecond";

/// Size of the binary encoding
pub const TIMESTAMP_BYTES: usize = 8;

/// Last year expressible in the four-digit text field
const MAX_TEXT_YEAR: i32 = 9999;

/// Timestamp encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TimestampFormat {
    #[default]
    String,
    Integer,
    Binary,
}

impl TimestampFormat {
    pub const ALL: [TimestampFormat; 3] = [
        TimestampFormat::String,
        TimestampFormat::Integer,
        TimestampFormat::Binary,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            TimestampFormat::String => "string",
            TimestampFormat::Integer => "integer",
            TimestampFormat::Binary => "binary",
        }
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimestampFormat {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(TimestampFormat::String),
            "integer" => Ok(TimestampFormat::Integer),
            "binary" | "bytes" => Ok(TimestampFormat::Binary),
            _ => Err(TimeError::InvalidFormat {
                value: s.to_string(),
                valid: VALID_FORMATS,
            }
            .reported()),
        }
    }
}

/// Truncation granularity, coarsest to finest
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TimestampPrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    #[default]
    Microsecond,
}

impl TimestampPrecision {
    pub const ALL: [TimestampPrecision; 7] = [
        TimestampPrecision::Year,
        TimestampPrecision::Month,
        TimestampPrecision::Day,
        TimestampPrecision::Hour,
        TimestampPrecision::Minute,
        TimestampPrecision::Second,
        TimestampPrecision::Microsecond,
    ];

    /// Number of text fields kept at this precision (1..=7)
    #[inline]
    pub const fn fields(self) -> usize {
        self as usize + 1
    }

    pub const fn name(self) -> &'static str {
        match self {
            TimestampPrecision::Year => "year",
            TimestampPrecision::Month => "month",
            TimestampPrecision::Day => "day",
            TimestampPrecision::Hour => "hour",
            TimestampPrecision::Minute => "minute",
            TimestampPrecision::Second => "second",
            TimestampPrecision::Microsecond => "microsecond",
        }
    }
}

impl fmt::Display for TimestampPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimestampPrecision {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimestampPrecision::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                TimeError::InvalidPrecision {
                    value: s.to_string(),
                    valid: VALID_PRECISIONS,
                }
                .reported()
            })
    }
}

/// Output configuration shared by [`now`], [`convert`] and [`parse`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampOptions {
    /// Target encoding
    pub format: TimestampFormat,
    /// Field separator for the text encoding
    pub separator: String,
    /// Truncation applied before encoding
    pub precision: TimestampPrecision,
}

impl Default for TimestampOptions {
    fn default() -> Self {
        TimestampOptions {
            format: TimestampFormat::String,
            separator: "-".to_string(),
            precision: TimestampPrecision::Microsecond,
        }
    }
}

impl TimestampOptions {
    pub fn with_format(mut self, format: TimestampFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_precision(mut self, precision: TimestampPrecision) -> Self {
        self.precision = precision;
        self
    }
}

/// An encoded timestamp
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimestampValue {
    Text(String),
    Integer(i64),
    Binary([u8; TIMESTAMP_BYTES]),
}

impl TimestampValue {
    pub fn format(&self) -> TimestampFormat {
        match self {
            TimestampValue::Text(_) => TimestampFormat::String,
            TimestampValue::Integer(_) => TimestampFormat::Integer,
            TimestampValue::Binary(_) => TimestampFormat::Binary,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TimestampValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TimestampValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8; TIMESTAMP_BYTES]> {
        match self {
            TimestampValue::Binary(b) => Some(b),
            _ => None,
        }
    }
}

/// A caller-supplied timestamp whose encoding is inferred from its shape
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawTimestamp<'a> {
    Text(&'a str),
    Integer(i64),
    /// Accepted only when integral
    Real(f64),
    /// Accepted only when exactly 8 bytes long
    Bytes(&'a [u8]),
}

impl<'a> From<&'a str> for RawTimestamp<'a> {
    fn from(s: &'a str) -> Self {
        RawTimestamp::Text(s)
    }
}

impl<'a> From<&'a String> for RawTimestamp<'a> {
    fn from(s: &'a String) -> Self {
        RawTimestamp::Text(s)
    }
}

impl From<i64> for RawTimestamp<'_> {
    fn from(v: i64) -> Self {
        RawTimestamp::Integer(v)
    }
}

impl From<i32> for RawTimestamp<'_> {
    fn from(v: i32) -> Self {
        RawTimestamp::Integer(v as i64)
    }
}

impl From<f64> for RawTimestamp<'_> {
    fn from(v: f64) -> Self {
        RawTimestamp::Real(v)
    }
}

impl<'a> From<&'a [u8]> for RawTimestamp<'a> {
    fn from(b: &'a [u8]) -> Self {
        RawTimestamp::Bytes(b)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for RawTimestamp<'a> {
    fn from(b: &'a [u8; N]) -> Self {
        RawTimestamp::Bytes(b)
    }
}

impl<'a> From<&'a Vec<u8>> for RawTimestamp<'a> {
    fn from(b: &'a Vec<u8>) -> Self {
        RawTimestamp::Bytes(b)
    }
}

impl<'a> From<&'a TimestampValue> for RawTimestamp<'a> {
    fn from(v: &'a TimestampValue) -> Self {
        match v {
            TimestampValue::Text(s) => RawTimestamp::Text(s),
            TimestampValue::Integer(i) => RawTimestamp::Integer(*i),
            TimestampValue::Binary(b) => RawTimestamp::Bytes(b),
        }
    }
}

/// Broken-down UTC calendar fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CalendarFields {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    micro: u32,
}

impl CalendarFields {
    fn from_datetime(dt: &DateTime<Utc>) -> Self {
        CalendarFields {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            micro: dt.timestamp_subsec_micros(),
        }
    }

    /// Reset every field finer than `precision` to its minimum
    fn truncated(mut self, precision: TimestampPrecision) -> Self {
        use TimestampPrecision::*;
        if precision < Month {
            self.month = 1;
        }
        if precision < Day {
            self.day = 1;
        }
        if precision < Hour {
            self.hour = 0;
        }
        if precision < Minute {
            self.minute = 0;
        }
        if precision < Second {
            self.second = 0;
        }
        if precision < Microsecond {
            self.micro = 0;
        }
        self
    }

    fn to_timestamp(self) -> Option<Timestamp> {
        let naive = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_micro_opt(
            self.hour,
            self.minute,
            self.second,
            self.micro,
        )?;
        Some(Timestamp::from_datetime(naive.and_utc()))
    }

    fn write(&self, separator: &str, precision: TimestampPrecision) -> String {
        let mut out = format!("{:04}", self.year);
        let rest = [
            (self.month, 2),
            (self.day, 2),
            (self.hour, 2),
            (self.minute, 2),
            (self.second, 2),
            (self.micro, 6),
        ];
        for (value, width) in rest.into_iter().take(precision.fields() - 1) {
            out.push_str(separator);
            out.push_str(&format!("{:0width$}", value, width = width));
        }
        out
    }
}

/// Microseconds since the UTC Unix epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    /// Current UTC time
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.timestamp_micros())
    }

    pub fn to_datetime(self) -> TimeResult<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.0)
            .ok_or_else(|| TimeError::OutOfRange { micros: self.0 }.reported())
    }

    fn fields(self) -> TimeResult<CalendarFields> {
        self.to_datetime().map(|dt| CalendarFields::from_datetime(&dt))
    }

    /// Drop every calendar field finer than `precision`.
    ///
    /// Microsecond precision is the identity and never consults the calendar.
    pub fn truncate(self, precision: TimestampPrecision) -> TimeResult<Self> {
        if precision == TimestampPrecision::Microsecond {
            return Ok(self);
        }
        self.fields()?
            .truncated(precision)
            .to_timestamp()
            .ok_or_else(|| TimeError::OutOfRange { micros: self.0 }.reported())
    }

    /// Text encoding with the fields kept by `precision`; no truncation is
    /// needed beforehand since omitted fields are simply not written.
    ///
    /// Only years 0000 through 9999 have a text form.
    pub fn to_text(self, separator: &str, precision: TimestampPrecision) -> TimeResult<String> {
        let fields = self.fields()?;
        if !(0..=MAX_TEXT_YEAR).contains(&fields.year) {
            return Err(TimeError::OutOfRange { micros: self.0 }.reported());
        }
        Ok(fields.write(separator, precision))
    }

    /// Decode 1 to 7 `separator`-delimited numeric fields
    pub fn from_text(text: &str, separator: &str) -> TimeResult<Self> {
        if separator.is_empty() {
            return Err(TimeError::InvalidArgument {
                name: "separator",
                requirement: "must not be empty when decoding text timestamps",
                value: "\"\"".to_string(),
            }
            .reported());
        }
        let malformed = || {
            TimeError::MalformedTimestamp {
                text: text.to_string(),
                separator: separator.to_string(),
            }
            .reported()
        };

        let parts: Vec<&str> = text.split(separator).collect();
        if parts.len() > TimestampPrecision::Microsecond.fields() {
            return Err(malformed());
        }

        // year, month, day, hour, minute, second, microsecond
        let mut values: [u32; 7] = [0, 1, 1, 0, 0, 0, 0];
        for (slot, part) in values.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            *slot = part.parse().map_err(|_| malformed())?;
        }
        // chrono reads micro >= 1_000_000 as a leap second
        if values[6] >= 1_000_000 {
            return Err(malformed());
        }

        let fields = CalendarFields {
            year: i32::try_from(values[0]).map_err(|_| malformed())?,
            month: values[1],
            day: values[2],
            hour: values[3],
            minute: values[4],
            second: values[5],
            micro: values[6],
        };
        fields.to_timestamp().ok_or_else(malformed)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; TIMESTAMP_BYTES] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; TIMESTAMP_BYTES]) -> Self {
        Timestamp(i64::from_le_bytes(bytes))
    }

    /// Parse free-form text with a strftime-style `pattern`, assuming UTC.
    ///
    /// Patterns carrying an offset (`%z`) are normalized to UTC; date-only
    /// patterns resolve to midnight.
    pub fn parse(text: &str, pattern: &str) -> TimeResult<Self> {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(Self::from_datetime(naive.and_utc()));
        }
        if let Some(naive) = NaiveDate::parse_from_str(text, pattern)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Self::from_datetime(naive.and_utc()));
        }
        Err(TimeError::PatternMismatch {
            text: text.to_string(),
            pattern: pattern.to_string(),
        }
        .reported())
    }

    /// Decode a caller-supplied value, inferring its encoding from its shape
    pub fn decode(raw: RawTimestamp<'_>, separator: &str) -> TimeResult<Self> {
        match raw {
            RawTimestamp::Text(text) => Self::from_text(text, separator),
            RawTimestamp::Integer(micros) => Ok(Timestamp(micros)),
            RawTimestamp::Real(v) => integral_i64(v).map(Timestamp).ok_or_else(|| {
                TimeError::TypeIncompatible {
                    expected: "an integral microsecond count",
                    found: format!("{}", v),
                }
                .reported()
            }),
            RawTimestamp::Bytes(bytes) => <[u8; TIMESTAMP_BYTES]>::try_from(bytes)
                .map(Self::from_bytes)
                .map_err(|_| {
                    TimeError::TypeIncompatible {
                        expected: "exactly 8 bytes",
                        found: format!("{} bytes", bytes.len()),
                    }
                    .reported()
                }),
        }
    }

    /// Truncate to `options.precision` and encode as `options.format`
    pub fn encode(self, options: &TimestampOptions) -> TimeResult<TimestampValue> {
        let truncated = self.truncate(options.precision)?;
        Ok(match options.format {
            TimestampFormat::String => {
                TimestampValue::Text(truncated.to_text(&options.separator, options.precision)?)
            }
            TimestampFormat::Integer => TimestampValue::Integer(truncated.0),
            TimestampFormat::Binary => TimestampValue::Binary(truncated.to_bytes()),
        })
    }
}

/// Current UTC time, truncated and encoded per `options`
pub fn now(options: &TimestampOptions) -> TimeResult<TimestampValue> {
    Timestamp::now().encode(options)
}

/// Re-encode a timestamp given in any of the three encodings.
///
/// Text input is split on `options.separator`; the same separator is used for
/// text output.
pub fn convert<'a>(
    input: impl Into<RawTimestamp<'a>>,
    options: &TimestampOptions,
) -> TimeResult<TimestampValue> {
    Timestamp::decode(input.into(), &options.separator)?.encode(options)
}

/// Parse free-form text with a strftime-style `pattern` and encode per `options`
pub fn parse(text: &str, pattern: &str, options: &TimestampOptions) -> TimeResult<TimestampValue> {
    Timestamp::parse(text, pattern)?.encode(options)
}

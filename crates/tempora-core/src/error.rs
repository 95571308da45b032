//! Error types for TEMPORA

use thiserror::Error;

/// Core TEMPORA errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    // Enumeration errors
    #[error("Invalid time unit: expected one of ({valid}), but got '{value}'")]
    InvalidUnit { value: String, valid: &'static str },

    #[error("Invalid precision: expected one of ({valid}), but got '{value}'")]
    InvalidPrecision { value: String, valid: &'static str },

    #[error("Invalid timestamp format: expected one of ({valid}), but got '{value}'")]
    InvalidFormat { value: String, valid: &'static str },

    // Argument errors
    #[error("Invalid argument: '{name}' {requirement}, but got {value}")]
    InvalidArgument {
        name: &'static str,
        requirement: &'static str,
        value: String,
    },

    // Timestamp errors
    #[error("Incompatible timestamp: expected {expected}, but got {found}")]
    TypeIncompatible { expected: &'static str, found: String },

    #[error(
        "Malformed timestamp: expected YYYY{separator}MM{separator}DD{separator}HH{separator}MM{separator}SS{separator}ffffff (1 to 7 fields), but got '{text}'"
    )]
    MalformedTimestamp { text: String, separator: String },

    #[error("Pattern mismatch: '{text}' could not be parsed with pattern '{pattern}'")]
    PatternMismatch { text: String, pattern: String },

    #[error("Timestamp out of calendar range: {micros}us since epoch")]
    OutOfRange { micros: i64 },
}

impl TimeError {
    /// Hand the error to the log sink before it is returned to the caller
    pub fn reported(self) -> Self {
        tracing::debug!(error = %self, "time operation failed");
        self
    }

    /// Shorthand for a non-positive or non-finite argument
    pub(crate) fn positive(name: &'static str, value: impl ToString) -> Self {
        TimeError::InvalidArgument {
            name,
            requirement: "must be a finite value greater than 0",
            value: value.to_string(),
        }
        .reported()
    }
}

/// Result type for TEMPORA operations
pub type TimeResult<T> = Result<T, TimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_value_and_members() {
        let err = TimeError::InvalidUnit {
            value: "fortnight".into(),
            valid: "ns, us",
        };
        let msg = err.to_string();
        assert!(msg.contains("fortnight"));
        assert!(msg.contains("ns, us"));

        let err = TimeError::MalformedTimestamp {
            text: "2024_x".into(),
            separator: "_".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'2024_x'"));
        assert!(msg.contains("1 to 7 fields"));
        assert!(msg.contains("YYYY_MM_DD"));
    }

    #[test]
    fn test_positive_argument_error() {
        let err = TimeError::positive("rate", -1.5);
        assert_eq!(
            err,
            TimeError::InvalidArgument {
                name: "rate",
                requirement: "must be a finite value greater than 0",
                value: "-1.5".into(),
            }
        );
    }
}

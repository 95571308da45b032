//! TEMPORA Core - Time values, units, and timestamp encodings
//!
//! This crate defines the deterministic conversion layer used by the timers:
//! - Time units and numeric unit conversion (exact where possible)
//! - UTC timestamps in string, integer, and binary form
//! - Precision truncation and free-form timestamp parsing
//! - Frequency <-> interval conversion

pub mod error;
pub mod rate;
pub mod timestamp;
pub mod units;

pub use error::*;
pub use rate::*;
pub use timestamp::*;
pub use units::*;

//! TEMPORA Timer - Interval timing and timeout guards
//!
//! This crate implements the timing layer on top of an injected clock:
//! - `Clock` capability with a monotonic OS clock and a manual test clock
//! - `IntervalTimer`: elapsed time, precision switching, delays, laps, polling
//! - `Timeout`: expiry tracking with activity-based refresh
//! - `YieldHook`: optional cooperative release of a shared execution lock

pub mod clock;
pub mod hook;
pub mod timeout;
pub mod timer;

pub use clock::*;
pub use hook::*;
pub use timeout::*;
pub use timer::*;

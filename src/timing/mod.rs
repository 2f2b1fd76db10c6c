//! Timing primitives for the recording pipeline
//!
//! - `timestamp`: exact rational timestamps and time ranges
//! - `clock`: the session clock shared by the video and audio producers

mod clock;
mod timestamp;

pub use clock::{ClockSnapshot, SessionClock};
pub use timestamp::{TimeRange, Timestamp, NANOSECOND_SCALE};

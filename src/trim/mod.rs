//! Post-recording trim of leading/trailing single-stream time
//!
//! Submodules:
//! - `movie`: header-level track/segment model
//! - `engine`: range computation and header rewrite

mod engine;
mod movie;

pub use engine::{ContainerStore, TrimEngine, TrimOutcome, UntouchedReason};
pub use movie::{ContainerKind, Movie, Track, TrackMedia, TrackSegment};

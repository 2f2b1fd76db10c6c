//! crabsync: sample-timing reconciliation and repair for live A/V capture
//!
//! This crate sits between capture devices and a container writer and keeps
//! a recording's audio, video and timecode on one consistent timeline.
//!
//! # Features
//! - Session clock shared by concurrently delivering producers
//! - Fixed-rate video resampling on exact rational time
//! - Per-stream sequence gap detection
//! - SMPTE timecode track encoding, including drop-frame counting
//! - Post-recording trim of audio-only head and tail
//!
//! # Usage
//! ```rust,ignore
//! use crabsync::recording::{RecordingConfig, RecordingSession};
//! use crabsync::CrabSyncConfig;
//!
//! let config = CrabSyncConfig::load_or_default();
//! let mut session = RecordingSession::start(writer, RecordingConfig::from_config(&config))?
//!     .with_container_store(store);
//! ```
pub mod config;
pub mod errors;
pub mod recording;
pub mod sample;
pub mod sequence;
pub mod timecode;
pub mod timing;
pub mod trim;

// Testing utilities - synthetic streams and in-memory collaborators
pub mod testing;

// Re-exports for convenience
pub use config::CrabSyncConfig;
pub use errors::{ConfigError, EncodingError, SessionError, TrimError};
pub use recording::{FixedRateResampler, RecordingConfig, RecordingSession, RecordingStats, Writer};
pub use sample::{CapturedSample, DecodedSample, MediaSample, StreamTag};
pub use sequence::{next_expected, SequenceTracker, INVALID_SEQUENCE};
pub use timecode::{SmpteTime, TimecodeEncoder, TimecodeFormat, TimecodeRecord};
pub use timing::{SessionClock, TimeRange, Timestamp};
pub use trim::{ContainerStore, TrimEngine, TrimOutcome};

/// Initialize logging; `RUST_LOG` overrides the `crabsync=info` default
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("crabsync=info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

//! Recording pipeline
//!
//! This module turns two live sample streams into one written container:
//! - `resampler`: constant-rate video output
//! - `session`: producer inputs, single-writer video worker, stop/finalize/trim
//! - `writer`: the seam to the container writer
//!
//! # Example
//! ```rust,ignore
//! use crabsync::recording::{RecordingConfig, RecordingSession};
//!
//! let mut session = RecordingSession::start(writer, RecordingConfig::new(30))?
//!     .with_container_store(store);
//! let video = session.video_input();
//! let mut audio = session.take_audio_input().unwrap();
//!
//! // On the capture threads:
//! video.submit_captured(frame)?;
//! audio.submit(chunk)?;
//!
//! // When done:
//! let summary = session.stop().wait()?;
//! ```

mod config;
mod resampler;
mod session;
mod writer;

pub use config::{RecordingConfig, RecordingStats, RecordingSummary, DEFAULT_VIDEO_QUEUE_CAPACITY};
pub use resampler::FixedRateResampler;
pub use session::{AudioInput, Delivery, RecordingSession, StopHandle, VideoInput};
pub use writer::{FinalizeCallback, Writer};

#[cfg(test)]
mod tests;

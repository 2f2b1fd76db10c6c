//! Container writer seam
//!
//! The physical container writer lives outside this crate. The recording
//! session talks to it only through this trait.

use std::path::Path;

use crate::errors::SessionError;
use crate::sample::{MediaSample, StreamTag};
use crate::timecode::TimecodeFormat;
use crate::timing::Timestamp;

/// Called once finalization of the container has completed (or failed)
pub type FinalizeCallback = Box<dyn FnOnce(Result<(), SessionError>) + Send + 'static>;

/// Sink for the samples of one recording
///
/// Shared by the video worker and the audio producer, so every method takes
/// `&self`.
pub trait Writer: Send + Sync {
    /// `false` means the sample for `stream` should be skipped, not retried
    fn is_ready_for_more_data(&self, stream: StreamTag) -> bool;

    fn append(&self, stream: StreamTag, sample: MediaSample) -> Result<(), SessionError>;

    /// Open the writing session; called exactly once, before the first append
    fn start_session(&self, at: Timestamp);

    fn end_session(&self, at: Timestamp);

    /// Finish the container; `completion` may run on any thread
    fn finalize(&self, completion: FinalizeCallback);

    /// Format of the timecode samples that follow
    fn describe_timecode(&self, _format: &TimecodeFormat) {}

    /// Location of the finished container, used for the trim pass
    fn output_path(&self) -> &Path;
}

//! Recording configuration and statistics types

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::CrabSyncConfig;
use crate::timing::ClockSnapshot;
use crate::trim::TrimOutcome;

/// Default capacity of the single-writer video queue
pub const DEFAULT_VIDEO_QUEUE_CAPACITY: usize = 64;

/// Configuration for one recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Constant output frame rate; `None` writes frames with their source timing
    pub output_fps: Option<u32>,
    /// Timecode payload width (4 or 8 bytes); `None` disables the timecode track
    pub timecode_byte_width: Option<usize>,
    /// Run the trim pass after the container is finalized
    pub trim_after_finalize: bool,
    /// Capacity of the queue feeding the video worker
    pub video_queue_capacity: usize,
}

impl RecordingConfig {
    /// Fixed-rate video at `fps`, no timecode, trim enabled
    pub fn new(output_fps: u32) -> Self {
        Self {
            output_fps: Some(output_fps),
            ..Self::default()
        }
    }

    /// Video frames keep their source timing
    pub fn passthrough() -> Self {
        Self {
            output_fps: None,
            ..Self::default()
        }
    }

    /// Build from the `[resampler]`, `[timecode]`, `[trim]` and `[pipeline]` sections
    pub fn from_config(config: &CrabSyncConfig) -> Self {
        Self {
            output_fps: config.resampler.output_fps,
            timecode_byte_width: config
                .timecode
                .enabled
                .then_some(config.timecode.byte_width),
            trim_after_finalize: config.trim.enabled,
            video_queue_capacity: config.pipeline.video_queue_capacity,
        }
    }

    /// Enable the timecode track
    pub fn with_timecode(mut self, byte_width: usize) -> Self {
        self.timecode_byte_width = Some(byte_width);
        self
    }

    /// Enable or disable the trim pass
    pub fn with_trim(mut self, enabled: bool) -> Self {
        self.trim_after_finalize = enabled;
        self
    }

    pub fn with_video_queue_capacity(mut self, capacity: usize) -> Self {
        self.video_queue_capacity = capacity.max(1);
        self
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_fps: Some(30),
            timecode_byte_width: None,
            trim_after_finalize: true,
            video_queue_capacity: DEFAULT_VIDEO_QUEUE_CAPACITY,
        }
    }
}

/// Live counters, shared by the producers of one session
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub video_in: AtomicU64,
    pub video_frames: AtomicU64,
    pub audio_frames: AtomicU64,
    pub timecode_samples: AtomicU64,
    pub skipped_not_ready: AtomicU64,
    pub dropped_queue_full: AtomicU64,
    pub write_errors: AtomicU64,
    pub video_gaps: AtomicU64,
    pub audio_gaps: AtomicU64,
    pub timecode_errors: AtomicU64,
}

impl SessionCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(
        &self,
        clock: ClockSnapshot,
        discarded_held_frame: bool,
        output_path: String,
    ) -> RecordingStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        RecordingStats {
            video_frames_in: load(&self.video_in),
            video_frames: load(&self.video_frames),
            audio_frames: load(&self.audio_frames),
            timecode_samples: load(&self.timecode_samples),
            skipped_not_ready: load(&self.skipped_not_ready),
            dropped_frames: load(&self.dropped_queue_full),
            write_errors: load(&self.write_errors),
            video_gaps: load(&self.video_gaps),
            audio_gaps: load(&self.audio_gaps),
            timecode_errors: load(&self.timecode_errors),
            discarded_held_frame,
            duration_secs: clock.duration.as_secs_f64(),
            clock,
            output_path,
        }
    }
}

/// Statistics returned after finishing a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingStats {
    /// Video samples submitted (captured and decoded)
    pub video_frames_in: u64,
    /// Video samples written after resampling
    pub video_frames: u64,
    /// Audio samples written
    pub audio_frames: u64,
    /// Timecode samples written
    pub timecode_samples: u64,
    /// Samples skipped because the writer was not ready
    pub skipped_not_ready: u64,
    /// Video samples dropped because the worker queue was full
    pub dropped_frames: u64,
    /// Appends the writer rejected
    pub write_errors: u64,
    /// Sequence gaps seen on the video stream
    pub video_gaps: u64,
    /// Sequence gaps seen on the audio stream
    pub audio_gaps: u64,
    /// Timecode attachments that could not be encoded
    pub timecode_errors: u64,
    /// Whether a frame held for an incomplete output slot was discarded at stop
    pub discarded_held_frame: bool,
    /// Session duration in seconds
    pub duration_secs: f64,
    /// Session clock as it was when finalization completed
    pub clock: ClockSnapshot,
    /// Output file path
    pub output_path: String,
}

/// Everything known once a recording has been finalized and trimmed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub session_id: String,
    pub stats: RecordingStats,
    /// `None` when the trim pass is disabled
    pub trim: Option<TrimOutcome>,
}

//! Media sample types flowing through the pipeline

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timecode::SmpteTime;
use crate::timing::{TimeRange, Timestamp};

/// Which track a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamTag {
    Video,
    Audio,
    Timecode,
}

impl StreamTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamTag::Video => "video",
            StreamTag::Audio => "audio",
            StreamTag::Timecode => "timecode",
        }
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque media payload with its timing
///
/// Cloning is cheap: the payload is reference counted, so a clone is an
/// independent handle to the same immutable bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSample {
    pub payload: Bytes,
    pub pts: Timestamp,
    pub duration: Timestamp,
    pub stream: StreamTag,
}

impl MediaSample {
    pub fn new(
        stream: StreamTag,
        payload: impl Into<Bytes>,
        pts: Timestamp,
        duration: Timestamp,
    ) -> Self {
        Self {
            payload: payload.into(),
            pts,
            duration,
            stream,
        }
    }

    /// Exclusive end of the time covered by this sample
    #[inline]
    pub fn end(&self) -> Timestamp {
        self.pts + self.duration
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.pts, self.duration)
    }

    /// Same payload, new timing
    pub fn retimed(&self, pts: Timestamp, duration: Timestamp) -> Self {
        Self {
            payload: self.payload.clone(),
            pts,
            duration,
            stream: self.stream,
        }
    }
}

/// A sample as delivered by a capture source
#[derive(Debug, Clone)]
pub struct CapturedSample {
    pub sample: MediaSample,
    /// Per-stream sequence number assigned by the capture source
    pub sequence: u64,
    /// Set by the source when it knows delivery was not contiguous
    pub discontinuity: bool,
    /// SMPTE time attached by the capture device, video only
    pub smpte: Option<SmpteTime>,
}

impl CapturedSample {
    pub fn new(sample: MediaSample, sequence: u64) -> Self {
        Self {
            sample,
            sequence,
            discontinuity: false,
            smpte: None,
        }
    }

    pub fn with_discontinuity(mut self, discontinuity: bool) -> Self {
        self.discontinuity = discontinuity;
        self
    }

    pub fn with_smpte(mut self, smpte: SmpteTime) -> Self {
        self.smpte = Some(smpte);
        self
    }
}

/// A video sample handed back by an asynchronous decoder callback,
/// carrying the attachments of the sample that was submitted for decoding
#[derive(Debug, Clone)]
pub struct DecodedSample {
    pub sample: MediaSample,
    pub smpte: Option<SmpteTime>,
}

impl DecodedSample {
    pub fn new(sample: MediaSample, smpte: Option<SmpteTime>) -> Self {
        Self { sample, smpte }
    }
}

//! Synthetic capture data
//!
//! Video frames carry a small gradient payload and audio chunks carry a
//! 440Hz sine as interleaved little-endian f32, so payload identity can be
//! checked after resampling.

use bytes::Bytes;

use crate::sample::{CapturedSample, MediaSample, StreamTag};
use crate::timecode::SmpteTime;
use crate::timing::Timestamp;

/// Shape of a synthetic A/V capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticStream {
    /// Video frames per second
    pub fps: u32,
    /// Audio sample rate (Hz)
    pub sample_rate: u32,
    /// Audio frames per delivered chunk
    pub samples_per_chunk: u32,
    /// Interleaved audio channels
    pub channels: u16,
}

impl Default for SyntheticStream {
    fn default() -> Self {
        Self {
            fps: 30,
            sample_rate: 48_000,
            samples_per_chunk: 1024,
            channels: 2,
        }
    }
}

impl SyntheticStream {
    /// Video frames needed to cover `seconds`
    pub fn video_frames_for(&self, seconds: f64) -> u64 {
        (seconds * self.fps as f64).round().max(0.0) as u64
    }

    /// Audio chunks needed to cover `seconds`
    pub fn audio_chunks_for(&self, seconds: f64) -> u64 {
        let per_second = self.sample_rate as f64 / self.samples_per_chunk.max(1) as f64;
        (seconds * per_second).ceil().max(0.0) as u64
    }
}

/// Video frame `frame_number` of a constant-rate capture starting at `start`
pub fn synthetic_video_frame(frame_number: u64, fps: u32, start: Timestamp) -> CapturedSample {
    let fps = i64::from(fps.max(1));
    let base = (frame_number % 256) as u8;
    let payload: Vec<u8> = (0..64u8).map(|i| base.wrapping_add(i)).collect();

    let pts = start + Timestamp::new(frame_number as i64, fps);
    let sample = MediaSample::new(StreamTag::Video, payload, pts, Timestamp::new(1, fps));
    CapturedSample::new(sample, frame_number)
}

/// Same frame with device timecode attached, counted from the frame number
pub fn synthetic_video_frame_with_timecode(
    frame_number: u64,
    fps: u32,
    start: Timestamp,
    frame_type: u32,
) -> CapturedSample {
    let smpte = SmpteTime::from_frame_count(frame_number as i64, frame_type);
    synthetic_video_frame(frame_number, fps, start).with_smpte(smpte)
}

/// Audio chunk `chunk_number` of a capture starting at `start`
pub fn synthetic_audio_chunk(
    chunk_number: u64,
    stream: &SyntheticStream,
    start: Timestamp,
) -> CapturedSample {
    let frequency = 440.0;
    let rate = stream.sample_rate.max(1) as f64;
    let per_chunk = stream.samples_per_chunk as u64;
    let channels = stream.channels.max(1) as usize;

    let mut payload = Vec::with_capacity(per_chunk as usize * channels * 4);
    for i in 0..per_chunk {
        let t = (chunk_number * per_chunk + i) as f64 / rate;
        let value = ((2.0 * std::f64::consts::PI * frequency * t).sin() * 0.3) as f32;
        for _ in 0..channels {
            payload.extend_from_slice(&value.to_le_bytes());
        }
    }

    let scale = i64::from(stream.sample_rate.max(1));
    let pts = start + Timestamp::new((chunk_number * per_chunk) as i64, scale);
    let duration = Timestamp::new(per_chunk as i64, scale);
    let sample = MediaSample::new(StreamTag::Audio, Bytes::from(payload), pts, duration);
    CapturedSample::new(sample, chunk_number)
}

/// Video samples with the given frame durations in milliseconds, back to back
/// from zero; payload byte `i` identifies source frame `i`
pub fn jittered_video_samples(durations_ms: &[i64]) -> Vec<MediaSample> {
    let mut pts = Timestamp::ZERO;
    durations_ms
        .iter()
        .enumerate()
        .map(|(i, &ms)| {
            let duration = Timestamp::from_millis(ms);
            let sample = MediaSample::new(StreamTag::Video, vec![i as u8], pts, duration);
            pts += duration;
            sample
        })
        .collect()
}

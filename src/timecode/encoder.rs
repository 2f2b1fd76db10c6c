//! SMPTE timecode to frame-number encoding
//!
//! # Spell: TimecodeEncode
//! ^ Intent: turn SMPTE fields into the big-endian frame number stored in a timecode track
//!
//! @TimecodeEncoder
//!   : (SmpteTime, byte_width) -> TimecodeRecord
//!   ! payload_is_big_endian_signed
//!   ! byte_width_is_4_or_8
//!   ! drop_frame_minute_zero_of_each_ten_keeps_all_frames
//!   ! flags_live_in_format_not_payload
//!   - other_byte_orders

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::smpte::{frame_quanta, is_drop_frame, SmpteTime, MINUTES_SIGN_BIT};
use crate::errors::EncodingError;
use crate::sample::{MediaSample, StreamTag};
use crate::timing::Timestamp;

/// Format flag: timecode counts in drop-frame
pub const FLAG_DROP_FRAME: u32 = 1 << 0;
/// Format flag: timecode wraps at 24 hours
pub const FLAG_24_HOUR_MAX: u32 = 1 << 1;

/// Frames dropped per non-tenth minute
const DROPPED_PER_MINUTE: i64 = 2;
/// Frames dropped per complete block of ten minutes (nine dropping minutes)
const DROPPED_PER_TEN_MINUTES: i64 = 9 * DROPPED_PER_MINUTE;

/// Timecode sample layout, determined by the payload width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimecodeFormatType {
    /// 32-bit frame numbers
    TimeCode32,
    /// 64-bit frame numbers
    TimeCode64,
}

impl TimecodeFormatType {
    pub fn from_byte_width(byte_width: usize) -> Result<Self, EncodingError> {
        match byte_width {
            4 => Ok(TimecodeFormatType::TimeCode32),
            8 => Ok(TimecodeFormatType::TimeCode64),
            other => Err(EncodingError::UnsupportedWidth(other)),
        }
    }

    pub fn byte_width(&self) -> usize {
        match self {
            TimecodeFormatType::TimeCode32 => 4,
            TimecodeFormatType::TimeCode64 => 8,
        }
    }

    /// Four-character code of the sample description
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            TimecodeFormatType::TimeCode32 => *b"tmcd",
            TimecodeFormatType::TimeCode64 => *b"tc64",
        }
    }
}

/// Format metadata accompanying timecode samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimecodeFormat {
    pub format_type: TimecodeFormatType,
    /// Duration of one video frame, from the sample that triggered encoding
    pub frame_duration: Timestamp,
    pub frame_quanta: u32,
    pub flags: u32,
}

impl TimecodeFormat {
    pub fn is_drop_frame(&self) -> bool {
        self.flags & FLAG_DROP_FRAME != 0
    }
}

/// One serialized timecode sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimecodeRecord {
    pub frame_number: i64,
    pub byte_width: usize,
}

impl TimecodeRecord {
    /// Big-endian signed integer of `byte_width` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        match self.byte_width {
            4 => {
                let narrow = i32::try_from(self.frame_number).map_err(|_| {
                    EncodingError::FrameNumberOverflow {
                        frame_number: self.frame_number,
                        byte_width: 4,
                    }
                })?;
                Ok(narrow.to_be_bytes().to_vec())
            }
            8 => Ok(self.frame_number.to_be_bytes().to_vec()),
            other => Err(EncodingError::UnsupportedWidth(other)),
        }
    }

    /// Read a payload back; its length selects the width
    pub fn from_bytes(payload: &[u8]) -> Result<Self, EncodingError> {
        match payload.len() {
            4 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(payload);
                Ok(Self {
                    frame_number: i32::from_be_bytes(raw) as i64,
                    byte_width: 4,
                })
            }
            8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(payload);
                Ok(Self {
                    frame_number: i64::from_be_bytes(raw),
                    byte_width: 8,
                })
            }
            other => Err(EncodingError::UnsupportedWidth(other)),
        }
    }
}

/// Parse a timecode sample payload
pub fn decode_record(payload: &[u8]) -> Result<TimecodeRecord, EncodingError> {
    TimecodeRecord::from_bytes(payload)
}

/// Absolute frame number for SMPTE fields at the given quanta
///
/// With `drop_frame` set, two frame labels are skipped at the start of every
/// minute except each tenth minute. Labels that do not exist in drop-frame
/// counting (`;00` and `;01` of a dropping minute) map onto the frames just
/// before the first valid label of that minute.
pub fn frame_number_for(time: &SmpteTime, quanta: u32, drop_frame: bool) -> i64 {
    let quanta = quanta as i64;
    let minutes = (time.minutes & !MINUTES_SIGN_BIT) as i64;

    let mut count = time.frames as i64
        + time.seconds as i64 * quanta
        + minutes * quanta * 60
        + time.hours as i64 * quanta * 3600;

    if drop_frame && quanta > 0 {
        let frames_per_minute = quanta * 60;
        let frames_per_ten_minutes = frames_per_minute * 10;

        let ten_minute_blocks = count / frames_per_ten_minutes;
        let mut adjust = -ten_minute_blocks * DROPPED_PER_TEN_MINUTES;

        let remaining = count % frames_per_ten_minutes;
        if remaining > 1 {
            // Minute zero of the block keeps all frames
            let dropping_minutes = remaining / frames_per_minute;
            adjust -= dropping_minutes * DROPPED_PER_MINUTE;
        }
        count += adjust;
    }

    if time.negative {
        -count
    } else {
        count
    }
}

/// Encodes SMPTE times into timecode track samples of a fixed width
#[derive(Debug, Clone, Copy)]
pub struct TimecodeEncoder {
    format_type: TimecodeFormatType,
}

impl TimecodeEncoder {
    pub fn new(byte_width: usize) -> Result<Self, EncodingError> {
        Ok(Self {
            format_type: TimecodeFormatType::from_byte_width(byte_width)?,
        })
    }

    pub fn byte_width(&self) -> usize {
        self.format_type.byte_width()
    }

    /// Frame number using the quanta and drop-frame rule of the time's frame type
    pub fn frame_number(&self, time: &SmpteTime) -> i64 {
        frame_number_for(time, frame_quanta(time.frame_type), is_drop_frame(time.frame_type))
    }

    pub fn encode(&self, time: &SmpteTime) -> Result<TimecodeRecord, EncodingError> {
        let record = TimecodeRecord {
            frame_number: self.frame_number(time),
            byte_width: self.byte_width(),
        };
        // Surface width overflow here rather than at write time
        record.to_bytes()?;
        Ok(record)
    }

    /// Format metadata for timecode derived from a video frame of `frame_duration`
    pub fn format_for(
        &self,
        time: &SmpteTime,
        frame_duration: Timestamp,
    ) -> Result<TimecodeFormat, EncodingError> {
        if !frame_duration.is_positive() {
            return Err(EncodingError::UnsupportedTimecodeFormat(format!(
                "frame duration must be positive, got {}",
                frame_duration
            )));
        }

        let mut flags = FLAG_24_HOUR_MAX;
        if is_drop_frame(time.frame_type) {
            flags |= FLAG_DROP_FRAME;
        }

        Ok(TimecodeFormat {
            format_type: self.format_type,
            frame_duration,
            frame_quanta: frame_quanta(time.frame_type),
            flags,
        })
    }

    /// Build the timecode sample for one source video sample
    pub fn encode_sample(
        &self,
        time: &SmpteTime,
        video: &MediaSample,
    ) -> Result<(MediaSample, TimecodeFormat), EncodingError> {
        let format = self.format_for(time, video.duration)?;
        let payload = self.encode(time)?.to_bytes()?;
        let sample = MediaSample {
            payload: Bytes::from(payload),
            pts: video.pts,
            duration: video.duration,
            stream: StreamTag::Timecode,
        };
        Ok((sample, format))
    }
}

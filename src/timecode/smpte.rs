//! SMPTE time fields as attached to captured video samples

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::EncodingError;

/// Bit 7 of the raw minutes field carries the sign of the time
pub const MINUTES_SIGN_BIT: u32 = 0x80;

/// Quanta used for frame-type codes with no table entry
pub const DEFAULT_FRAME_QUANTA: u32 = 30;

/// Known SMPTE frame-type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmpteFrameType {
    Fps24,
    Fps25,
    Fps30Drop,
    Fps30,
    Fps2997,
    Fps2997Drop,
    Fps60,
    Fps5994,
    Fps60Drop,
    Fps5994Drop,
    Fps50,
    Fps2398,
}

impl SmpteFrameType {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => SmpteFrameType::Fps24,
            1 => SmpteFrameType::Fps25,
            2 => SmpteFrameType::Fps30Drop,
            3 => SmpteFrameType::Fps30,
            4 => SmpteFrameType::Fps2997,
            5 => SmpteFrameType::Fps2997Drop,
            6 => SmpteFrameType::Fps60,
            7 => SmpteFrameType::Fps5994,
            8 => SmpteFrameType::Fps60Drop,
            9 => SmpteFrameType::Fps5994Drop,
            10 => SmpteFrameType::Fps50,
            11 => SmpteFrameType::Fps2398,
            _ => return None,
        })
    }

    pub fn code(&self) -> u32 {
        match self {
            SmpteFrameType::Fps24 => 0,
            SmpteFrameType::Fps25 => 1,
            SmpteFrameType::Fps30Drop => 2,
            SmpteFrameType::Fps30 => 3,
            SmpteFrameType::Fps2997 => 4,
            SmpteFrameType::Fps2997Drop => 5,
            SmpteFrameType::Fps60 => 6,
            SmpteFrameType::Fps5994 => 7,
            SmpteFrameType::Fps60Drop => 8,
            SmpteFrameType::Fps5994Drop => 9,
            SmpteFrameType::Fps50 => 10,
            SmpteFrameType::Fps2398 => 11,
        }
    }

    /// Nominal frames per second of the timecode domain
    pub fn quanta(&self) -> u32 {
        match self {
            SmpteFrameType::Fps24 | SmpteFrameType::Fps2398 => 24,
            SmpteFrameType::Fps25 => 25,
            SmpteFrameType::Fps30Drop
            | SmpteFrameType::Fps30
            | SmpteFrameType::Fps2997
            | SmpteFrameType::Fps2997Drop => 30,
            SmpteFrameType::Fps60
            | SmpteFrameType::Fps5994
            | SmpteFrameType::Fps60Drop
            | SmpteFrameType::Fps5994Drop => 60,
            SmpteFrameType::Fps50 => 50,
        }
    }

    pub fn is_drop_frame(&self) -> bool {
        matches!(
            self,
            SmpteFrameType::Fps30Drop
                | SmpteFrameType::Fps2997Drop
                | SmpteFrameType::Fps60Drop
                | SmpteFrameType::Fps5994Drop
        )
    }
}

/// Frame quanta for a raw frame-type code, falling back to 30
pub fn frame_quanta(frame_type: u32) -> u32 {
    SmpteFrameType::from_code(frame_type)
        .map(|t| t.quanta())
        .unwrap_or(DEFAULT_FRAME_QUANTA)
}

/// Drop-frame counting applies to codes 2, 5, 8 and 9 only
pub fn is_drop_frame(frame_type: u32) -> bool {
    SmpteFrameType::from_code(frame_type)
        .map(|t| t.is_drop_frame())
        .unwrap_or(false)
}

/// Hours/minutes/seconds/frames extracted from a video sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmpteTime {
    pub hours: u32,
    /// Minutes without the sign bit
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
    /// Raw frame-type code; unknown codes are allowed
    pub frame_type: u32,
    pub negative: bool,
}

impl SmpteTime {
    pub fn new(hours: u32, minutes: u32, seconds: u32, frames: u32, frame_type: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            frames,
            frame_type,
            negative: false,
        }
    }

    /// Decode a raw minutes field whose bit 7 is the sign
    pub fn from_raw_minutes(
        hours: u32,
        raw_minutes: u32,
        seconds: u32,
        frames: u32,
        frame_type: u32,
    ) -> Self {
        Self {
            hours,
            minutes: raw_minutes & !MINUTES_SIGN_BIT,
            seconds,
            frames,
            frame_type,
            negative: raw_minutes & MINUTES_SIGN_BIT != 0,
        }
    }

    /// Minutes field with the sign folded back into bit 7
    pub fn raw_minutes(&self) -> u32 {
        if self.negative {
            self.minutes | MINUTES_SIGN_BIT
        } else {
            self.minutes
        }
    }

    pub fn with_negative(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }

    /// Fields for a wall-clock time of day; the sub-second part becomes frames
    pub fn from_wall_clock(time: NaiveTime, frame_type: u32) -> Self {
        let quanta = frame_quanta(frame_type) as u64;
        // Leap seconds report nanoseconds >= 1e9
        let nanos = (time.nanosecond() as u64).min(999_999_999);
        let frames = (nanos * quanta / 1_000_000_000) as u32;
        Self::new(time.hour(), time.minute(), time.second(), frames, frame_type)
    }

    /// Inverse of the linear frame count for non-drop-frame timecode
    pub fn from_frame_count(count: i64, frame_type: u32) -> Self {
        let quanta = frame_quanta(frame_type) as u64;
        let total = count.unsigned_abs();
        Self {
            hours: (total / (quanta * 3600)) as u32,
            minutes: ((total / (quanta * 60)) % 60) as u32,
            seconds: ((total / quanta) % 60) as u32,
            frames: (total % quanta) as u32,
            frame_type,
            negative: count < 0,
        }
    }

    /// Parse `HH:MM:SS:FF` (or `HH:MM:SS;FF`), optionally prefixed with `-`
    pub fn parse(text: &str, frame_type: u32) -> Result<Self, EncodingError> {
        let invalid =
            || EncodingError::UnsupportedTimecodeFormat(format!("cannot parse '{}'", text));

        let (negative, body) = match text.trim().strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.trim()),
        };

        let fields: Vec<u32> = body
            .split(&[':', ';', '.'][..])
            .map(|part| part.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        match fields.as_slice() {
            [h, m, s, f] if *m < 60 && *s < 60 => Ok(Self {
                hours: *h,
                minutes: *m,
                seconds: *s,
                frames: *f,
                frame_type,
                negative,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for SmpteTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if is_drop_frame(self.frame_type) { ';' } else { ':' };
        write!(
            f,
            "{}{:02}:{:02}:{:02}{}{:02}",
            if self.negative { "-" } else { "" },
            self.hours,
            self.minutes,
            self.seconds,
            separator,
            self.frames
        )
    }
}

//! SMPTE timecode track support
//!
//! Submodules:
//! - `smpte`: time fields, frame-type table, parsing
//! - `encoder`: frame-number arithmetic and the binary sample record

mod encoder;
mod smpte;

pub use encoder::{
    decode_record, frame_number_for, TimecodeEncoder, TimecodeFormat, TimecodeFormatType,
    TimecodeRecord, FLAG_24_HOUR_MAX, FLAG_DROP_FRAME,
};
pub use smpte::{
    frame_quanta, is_drop_frame, SmpteFrameType, SmpteTime, DEFAULT_FRAME_QUANTA,
    MINUTES_SIGN_BIT,
};

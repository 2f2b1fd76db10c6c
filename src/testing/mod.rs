//! Testing utilities for crabsync
//!
//! Provides synthetic capture streams and in-memory stand-ins for the
//! container writer and the container store, so whole recordings can run
//! without a device or a file system.

pub mod memory;
pub mod synthetic_data;

pub use memory::{MemoryContainerStore, MemoryWriter};
pub use synthetic_data::{
    jittered_video_samples, synthetic_audio_chunk, synthetic_video_frame,
    synthetic_video_frame_with_timecode, SyntheticStream,
};

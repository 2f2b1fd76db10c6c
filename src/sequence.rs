//! Per-stream sequence number tracking
//!
//! # Spell: SequenceGapDetect
//! ^ Intent: flag gaps in capture sequence numbering without affecting delivery
//!
//! @SequenceTracker
//!   : check(stream, sequence, discontinuity) -> bool
//!   ! last_sequence_updated_on_every_check
//!   ! sentinel_wraps_to_zero
//!   - blocks_delivery
//!   - reorders_samples

use std::collections::HashMap;
use std::hash::Hash;

use crate::sample::StreamTag;

/// Sequence value meaning "nothing seen yet"
pub const INVALID_SEQUENCE: u64 = u64::MAX;

/// The sequence number that should follow `previous`
#[inline]
pub fn next_expected(previous: u64) -> u64 {
    if previous == INVALID_SEQUENCE {
        0
    } else {
        previous.wrapping_add(1)
    }
}

#[derive(Debug, Clone, Copy)]
struct StreamState {
    last: u64,
    gaps: u64,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            last: INVALID_SEQUENCE,
            gaps: 0,
        }
    }
}

/// Advisory discontinuity detector
///
/// Owned by exactly one producer; it is not shared across threads.
#[derive(Debug, Clone)]
pub struct SequenceTracker<K = StreamTag> {
    streams: HashMap<K, StreamState>,
}

impl<K> Default for SequenceTracker<K> {
    fn default() -> Self {
        Self {
            streams: HashMap::new(),
        }
    }
}

impl<K> SequenceTracker<K>
where
    K: Hash + Eq + Copy + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when a gap is detected
    ///
    /// The stream's last sequence is updated to `actual` either way; gaps
    /// are logged and counted but never stop the sample.
    pub fn check(&mut self, stream: K, actual: u64, discontinuity: bool) -> bool {
        let state = self.streams.entry(stream).or_default();
        let expected = next_expected(state.last);
        let gap = discontinuity || actual != expected;

        if gap {
            state.gaps += 1;
            log::warn!(
                "Sequence discontinuity on {:?}: expected {}, got {} (flagged by source: {})",
                stream,
                expected,
                actual,
                discontinuity
            );
        }

        state.last = actual;
        gap
    }

    /// Last sequence seen on a stream, `None` before its first sample
    pub fn last_sequence(&self, stream: K) -> Option<u64> {
        self.streams
            .get(&stream)
            .map(|s| s.last)
            .filter(|&last| last != INVALID_SEQUENCE)
    }

    /// Number of gaps reported on a stream
    pub fn gap_count(&self, stream: K) -> u64 {
        self.streams.get(&stream).map(|s| s.gaps).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.streams.clear();
    }
}

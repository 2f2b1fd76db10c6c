//! Fixed-rate video resampling
//!
//! # Spell: FixedRateResample
//! ^ Intent: turn irregularly timed video frames into one frame per output slot
//!
//! @FixedRateResampler
//!   : process(sample) -> Vec<MediaSample>
//!   ! output_spacing_is_exactly_interval
//!   ! slot_boundaries_persist_across_calls
//!   ! held_sample_never_force_emitted
//!   ! non_positive_interval_is_passthrough
//!   - shared_across_threads
//!   - floating_point_slot_math
//!
//! Each output slot `[current, next)` is emitted once the source timeline
//! has reached its end. The payload used for a slot is the sample that was
//! current when the slot started (held from an earlier call) or, when nothing
//! was held, the sample that spans the slot end.

use crate::sample::MediaSample;
use crate::timing::Timestamp;

/// Converts variable-interval frames into constant-interval frames
///
/// One instance per output track per recording. It is not `Sync`-safe to
/// mutate from two threads; the recording session feeds it from a single
/// worker.
#[derive(Debug, Clone)]
pub struct FixedRateResampler {
    output_interval: Option<Timestamp>,
    current_slot_start: Option<Timestamp>,
    next_slot_start: Option<Timestamp>,
    held_sample: Option<MediaSample>,
    emitted: u64,
}

impl FixedRateResampler {
    /// A resampler emitting one frame per `output_interval`
    ///
    /// `None` or a non-positive interval yields a passthrough resampler.
    pub fn new(output_interval: Option<Timestamp>) -> Self {
        Self {
            output_interval: output_interval.filter(|i| i.is_positive()),
            current_slot_start: None,
            next_slot_start: None,
            held_sample: None,
            emitted: 0,
        }
    }

    /// Interval of `1 / fps` seconds; `0` means passthrough
    pub fn with_fps(fps: u32) -> Self {
        if fps == 0 {
            return Self::new(None);
        }
        Self::new(Some(Timestamp::new(1, i64::from(fps))))
    }

    pub fn output_interval(&self) -> Option<Timestamp> {
        self.output_interval
    }

    pub fn is_passthrough(&self) -> bool {
        self.output_interval.is_none()
    }

    /// Start of the slot waiting to be filled, once the first sample arrived
    pub fn current_slot_start(&self) -> Option<Timestamp> {
        self.current_slot_start
    }

    pub fn has_held(&self) -> bool {
        self.held_sample.is_some()
    }

    /// Total samples emitted since the last reset
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Feed one source sample, returning the samples to write, in order
    pub fn process(&mut self, sample: MediaSample) -> Vec<MediaSample> {
        let interval = match self.output_interval {
            Some(interval) => interval,
            None => {
                self.emitted += 1;
                return vec![sample];
            }
        };

        let source_end = sample.end();
        let (mut current, mut next) = match (self.current_slot_start, self.next_slot_start) {
            (Some(current), Some(next)) => (current, next),
            _ => (sample.pts, sample.pts + interval),
        };

        let mut out = Vec::new();
        while current < source_end {
            if next <= source_end {
                let source = self.held_sample.take().unwrap_or_else(|| sample.clone());
                out.push(source.retimed(current, interval));
                current = next;
                next += interval;
            } else {
                if self.held_sample.is_none() {
                    self.held_sample = Some(sample.clone());
                }
                break;
            }
        }

        if !out.is_empty() {
            log::trace!(
                "Resampler emitted {} frame(s) for source [{}, {})",
                out.len(),
                sample.pts,
                source_end
            );
        }

        self.current_slot_start = Some(current);
        self.next_slot_start = Some(next);
        self.emitted += out.len() as u64;
        out
    }

    /// End of a recording: reset, reporting whether a held sample was discarded
    pub fn finish(&mut self) -> bool {
        let discarded = self.held_sample.is_some();
        if discarded {
            log::debug!("Discarding held frame for incomplete output slot");
        }
        self.reset();
        discarded
    }

    /// Forget slot boundaries and any held sample
    pub fn reset(&mut self) {
        self.current_slot_start = None;
        self.next_slot_start = None;
        self.held_sample = None;
        self.emitted = 0;
    }
}

//! Session clock shared by the video and audio producers
//!
//! # Spell: SessionClockShared
//! ^ Intent: establish one session timeline across two asynchronously delivering streams
//!
//! @SessionClock
//!   : observe(pts, duration, start_session)
//!   ! start_session_runs_exactly_once_per_recording
//!   ! session_end_never_decreases
//!   ! session_start_is_earliest_observed_pts
//!   ! duration_is_zero_before_first_observe
//!   - panics_on_poisoned_lock
//!
//! The clock holds one mutex around the "initialize once, extend
//! monotonically" update. The writer's session is opened from inside the
//! critical section so that no sample can be appended before the session
//! start has been chosen.
//!
//! The two producers race for the first observe, so the sample that opens
//! the writer session is not necessarily the earliest one. The recorded
//! session range widens on both edges to cover every observed sample; the
//! writer keeps the start it was opened with.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use super::timestamp::Timestamp;

#[derive(Debug, Default, Clone, Copy)]
struct ClockState {
    initialized: bool,
    session_start: Timestamp,
    session_end: Timestamp,
}

/// Point-in-time copy of the clock, for stats and logging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub initialized: bool,
    pub session_start: Timestamp,
    pub session_end: Timestamp,
    pub duration: Timestamp,
}

/// Start/end bookkeeping for one recording session
///
/// Shared between producer threads behind an `Arc`. All operations are
/// infallible: a poisoned lock is recovered because the guarded state is
/// plain values that are never left half-written.
#[derive(Debug, Default)]
pub struct SessionClock {
    state: Mutex<ClockState>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a sample about to be written
    ///
    /// On the first call of a recording, `start_session` is invoked with the
    /// sample's pts while the lock is held. Returns `true` for that call.
    /// Every call extends the session range to cover `[pts, pts + duration)`.
    pub fn observe<F>(&self, pts: Timestamp, duration: Timestamp, start_session: F) -> bool
    where
        F: FnOnce(Timestamp),
    {
        let mut state = self.lock();
        let end = pts + duration;

        if !state.initialized {
            state.session_start = pts;
            state.session_end = end;
            state.initialized = true;
            log::debug!("Session clock started at {}", pts);
            start_session(pts);
            return true;
        }

        if pts < state.session_start {
            state.session_start = pts;
        }
        if end > state.session_end {
            state.session_end = end;
        }
        false
    }

    /// `session_end - session_start`, zero before the first observe
    pub fn duration(&self) -> Timestamp {
        let state = self.lock();
        if state.initialized {
            state.session_end - state.session_start
        } else {
            Timestamp::ZERO
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn start(&self) -> Option<Timestamp> {
        let state = self.lock();
        state.initialized.then_some(state.session_start)
    }

    pub fn end(&self) -> Option<Timestamp> {
        let state = self.lock();
        state.initialized.then_some(state.session_end)
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        let state = *self.lock();
        ClockSnapshot {
            initialized: state.initialized,
            session_start: state.session_start,
            session_end: state.session_end,
            duration: if state.initialized {
                state.session_end - state.session_start
            } else {
                Timestamp::ZERO
            },
        }
    }

    /// Forget the current session
    pub fn reset(&self) {
        *self.lock() = ClockState::default();
    }
}

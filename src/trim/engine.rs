//! Post-recording trim
//!
//! # Spell: TrimToCommonRange
//! ^ Intent: drop head/tail time where audio has media but video does not
//!
//! @TrimEngine
//!   : trim(path) -> TrimOutcome
//!   ! no_rewrite_when_ranges_agree
//!   ! header_replace_is_the_only_write
//!   ! original_untouched_on_failure
//!   ! idempotent
//!   - reencodes_samples
//!   - runs_on_capture_threads

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;

use super::movie::{ContainerKind, Movie};
use crate::errors::TrimError;
use crate::timing::{TimeRange, Timestamp};

/// Read/write access to container headers
///
/// Implemented by the container layer; the engine never touches sample data.
pub trait ContainerStore: Send + Sync {
    fn container_kind(&self, path: &Path) -> Result<ContainerKind, TrimError>;

    fn load_movie(&self, path: &Path) -> Result<Movie, TrimError>;

    /// Atomically replace the header of the movie at `path`
    fn replace_header(&self, path: &Path, movie: &Movie) -> Result<(), TrimError>;
}

/// Why a movie was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UntouchedReason {
    NoVisualMedia,
    NoAudibleMedia,
    RangesAgree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrimOutcome {
    Untouched {
        reason: UntouchedReason,
    },
    Trimmed {
        /// Range of the original timeline that was kept
        kept: TimeRange,
        visual: Option<TimeRange>,
        audible: Option<TimeRange>,
    },
}

impl TrimOutcome {
    pub fn was_trimmed(&self) -> bool {
        matches!(self, TrimOutcome::Trimmed { .. })
    }
}

/// Trims finished recordings to the range covered by video
#[derive(Clone)]
pub struct TrimEngine {
    store: Arc<dyn ContainerStore>,
}

impl TrimEngine {
    pub fn new(store: Arc<dyn ContainerStore>) -> Self {
        Self { store }
    }

    /// Audio extends beyond video on either edge
    pub fn needs_trim(visual: &TimeRange, audible: &TimeRange) -> bool {
        audible.start < visual.start || visual.end() < audible.end()
    }

    pub fn trim(&self, path: &Path) -> Result<TrimOutcome, TrimError> {
        let kind = self.store.container_kind(path)?;
        if !kind.is_movie() {
            return Err(TrimError::NotAMovieContainer(format!(
                "{} is {:?}",
                path.display(),
                kind
            )));
        }

        let movie = self.store.load_movie(path)?;
        let visual = match movie.visual_range() {
            Some(range) => range,
            None => {
                log::debug!("No visual media in {}, nothing to trim", path.display());
                return Ok(TrimOutcome::Untouched {
                    reason: UntouchedReason::NoVisualMedia,
                });
            }
        };
        let audible = match movie.audible_range() {
            Some(range) => range,
            None => {
                log::debug!("No audible media in {}, nothing to trim", path.display());
                return Ok(TrimOutcome::Untouched {
                    reason: UntouchedReason::NoAudibleMedia,
                });
            }
        };

        if !Self::needs_trim(&visual, &audible) {
            log::debug!(
                "Ranges agree for {} (visual {}, audible {})",
                path.display(),
                visual,
                audible
            );
            return Ok(TrimOutcome::Untouched {
                reason: UntouchedReason::RangesAgree,
            });
        }

        log::info!(
            "Trimming {}: visual {}, audible {}",
            path.display(),
            visual,
            audible
        );

        let mut trimmed = movie.with_track_definitions();
        trimmed
            .insert_time_range(&movie, visual, Timestamp::ZERO)
            .map_err(TrimError::Copy)?;

        let new_visual = trimmed.visual_range();
        let new_audible = trimmed.audible_range();
        log::debug!(
            "Trimmed ranges: visual {:?}, audible {:?}",
            new_visual.map(|r| r.to_string()),
            new_audible.map(|r| r.to_string())
        );

        self.store.replace_header(path, &trimmed)?;
        log::info!("Rewrote movie header of {}", path.display());

        Ok(TrimOutcome::Trimmed {
            kept: visual,
            visual: new_visual,
            audible: new_audible,
        })
    }

    /// Run `trim` on a dedicated thread and report through a oneshot channel
    pub fn spawn(self, path: PathBuf) -> oneshot::Receiver<Result<TrimOutcome, TrimError>> {
        let (tx, rx) = oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name("crabsync-trim".to_string())
            .spawn(move || {
                let result = self.trim(&path);
                if let Err(e) = &result {
                    log::error!("Trim of {} failed: {}", path.display(), e);
                }
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn trim thread: {}", e);
        }
        rx
    }
}

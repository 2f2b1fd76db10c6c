//! Track and segment model of a finished movie container
//!
//! Only the header-level structure is modelled: tracks and their edit
//! segments. Segments reference media by time, never by payload, so copying
//! a range between movies never touches sample data.

use serde::{Deserialize, Serialize};

use crate::timing::{TimeRange, Timestamp};

/// Container file type, as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    /// QuickTime movie: the only kind whose header can be rewritten in place
    QuickTimeMovie,
    Mpeg4,
    Other(String),
}

impl ContainerKind {
    pub fn is_movie(&self) -> bool {
        matches!(self, ContainerKind::QuickTimeMovie)
    }
}

/// Media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackMedia {
    Video,
    Audio,
    Timecode,
    Other,
}

/// One edit of a track: a span of the movie timeline mapped to media time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Span of the movie timeline
    pub target: TimeRange,
    /// Media time shown at `target.start`; `None` for an empty edit
    pub source_start: Option<Timestamp>,
}

impl TrackSegment {
    pub fn media(target: TimeRange, source_start: Timestamp) -> Self {
        Self {
            target,
            source_start: Some(source_start),
        }
    }

    pub fn empty(target: TimeRange) -> Self {
        Self {
            target,
            source_start: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_start.is_none()
    }

    /// The part of this segment that falls in `range`, if any
    fn clip(&self, range: &TimeRange) -> Option<TrackSegment> {
        let overlap = self.target.intersection(range)?;
        let source_start = self
            .source_start
            .map(|source| source + (overlap.start - self.target.start));
        Some(TrackSegment {
            target: overlap,
            source_start,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    pub media: TrackMedia,
    pub segments: Vec<TrackSegment>,
}

impl Track {
    pub fn new(id: u32, media: TrackMedia) -> Self {
        Self {
            id,
            media,
            segments: Vec::new(),
        }
    }

    pub fn with_segment(mut self, segment: TrackSegment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn is_visual(&self) -> bool {
        self.media == TrackMedia::Video
    }

    pub fn is_audible(&self) -> bool {
        self.media == TrackMedia::Audio
    }

    /// Union of this track's non-empty segment target ranges
    pub fn media_range(&self) -> Option<TimeRange> {
        self.segments
            .iter()
            .filter(|s| !s.is_empty() && !s.target.is_empty())
            .map(|s| s.target)
            .reduce(|acc, r| acc.union(&r))
    }
}

/// Header-level view of a movie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub tracks: Vec<Track>,
}

impl Movie {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    fn range_where(&self, predicate: impl Fn(&Track) -> bool) -> Option<TimeRange> {
        self.tracks
            .iter()
            .filter(|t| predicate(t))
            .filter_map(Track::media_range)
            .reduce(|acc, r| acc.union(&r))
    }

    /// Time covered by video-bearing tracks
    pub fn visual_range(&self) -> Option<TimeRange> {
        self.range_where(Track::is_visual)
    }

    /// Time covered by audio-bearing tracks
    pub fn audible_range(&self) -> Option<TimeRange> {
        self.range_where(Track::is_audible)
    }

    /// Same track definitions, no segments
    pub fn with_track_definitions(&self) -> Movie {
        Movie {
            tracks: self
                .tracks
                .iter()
                .map(|t| Track::new(t.id, t.media))
                .collect(),
        }
    }

    /// Copy `range` of every track of `source` into this movie at `at`
    ///
    /// Every source track must have a definition with the same id here.
    pub fn insert_time_range(
        &mut self,
        source: &Movie,
        range: TimeRange,
        at: Timestamp,
    ) -> Result<(), String> {
        if range.is_empty() {
            return Err(format!("cannot copy empty range {}", range));
        }

        for source_track in &source.tracks {
            let track = self
                .tracks
                .iter_mut()
                .find(|t| t.id == source_track.id)
                .ok_or_else(|| format!("no track definition for track {}", source_track.id))?;

            if track.media != source_track.media {
                return Err(format!(
                    "track {} media mismatch: {:?} vs {:?}",
                    track.id, track.media, source_track.media
                ));
            }

            for segment in &source_track.segments {
                if let Some(mut clipped) = segment.clip(&range) {
                    clipped.target.start = at + (clipped.target.start - range.start);
                    track.segments.push(clipped);
                }
            }
        }
        Ok(())
    }
}

//! Trim engine tests against the in-memory container store

use crabsync::testing::MemoryContainerStore;
use crabsync::timing::{TimeRange, Timestamp};
use crabsync::trim::{
    ContainerKind, Movie, Track, TrackMedia, TrackSegment, TrimEngine, TrimOutcome,
    UntouchedReason,
};
use crabsync::TrimError;
use std::path::Path;
use std::sync::Arc;

fn secs(s: i64) -> Timestamp {
    Timestamp::from_secs(s)
}

fn span(start: i64, end: i64) -> TimeRange {
    TimeRange::from_start_end(secs(start), secs(end))
}

fn track(id: u32, media: TrackMedia, range: TimeRange) -> Track {
    Track::new(id, media).with_segment(TrackSegment::media(range, range.start))
}

/// Audio over [0, 10), video over [1, 9)
fn audio_lead_and_tail() -> Movie {
    Movie::new(vec![
        track(1, TrackMedia::Video, span(1, 9)),
        track(2, TrackMedia::Audio, span(0, 10)),
    ])
}

fn engine_with(
    path: &Path,
    kind: ContainerKind,
    movie: Movie,
) -> (Arc<MemoryContainerStore>, TrimEngine) {
    let store = Arc::new(MemoryContainerStore::new());
    store.insert(path, kind, movie);
    (store.clone(), TrimEngine::new(store))
}

#[test]
fn test_trims_to_visual_range() {
    let path = Path::new("/virtual/take1.mov");
    let (store, engine) = engine_with(path, ContainerKind::QuickTimeMovie, audio_lead_and_tail());

    let outcome = engine.trim(path).unwrap();
    assert_eq!(
        outcome,
        TrimOutcome::Trimmed {
            kept: span(1, 9),
            visual: Some(span(0, 8)),
            audible: Some(span(0, 8)),
        }
    );
    assert_eq!(store.header_writes(), 1);

    let movie = store.movie(path).unwrap();
    assert_eq!(movie.visual_range(), Some(span(0, 8)));
    assert_eq!(movie.audible_range(), Some(span(0, 8)));

    // Segments reference the original media time
    let audio = movie.tracks.iter().find(|t| t.media == TrackMedia::Audio).unwrap();
    assert_eq!(audio.segments[0].source_start, Some(secs(1)));
}

#[test]
fn test_trim_is_idempotent() {
    let path = Path::new("/virtual/take2.mov");
    let (store, engine) = engine_with(path, ContainerKind::QuickTimeMovie, audio_lead_and_tail());

    assert!(engine.trim(path).unwrap().was_trimmed());
    let once = store.movie(path).unwrap();

    let again = engine.trim(path).unwrap();
    assert_eq!(
        again,
        TrimOutcome::Untouched {
            reason: UntouchedReason::RangesAgree
        }
    );
    assert_eq!(store.movie(path).unwrap(), once);
    assert_eq!(store.header_writes(), 1);
}

#[test]
fn test_missing_stream_leaves_movie_untouched() {
    let path = Path::new("/virtual/video_only.mov");
    let movie = Movie::new(vec![track(1, TrackMedia::Video, span(0, 5))]);
    let (store, engine) = engine_with(path, ContainerKind::QuickTimeMovie, movie.clone());

    assert_eq!(
        engine.trim(path).unwrap(),
        TrimOutcome::Untouched {
            reason: UntouchedReason::NoAudibleMedia
        }
    );
    assert_eq!(store.movie(path), Some(movie));
    assert_eq!(store.header_writes(), 0);
}

#[test]
fn test_timecode_track_is_trimmed_with_video() {
    let path = Path::new("/virtual/tc.mov");
    let mut movie = audio_lead_and_tail();
    movie.tracks.push(track(3, TrackMedia::Timecode, span(1, 9)));
    let (store, engine) = engine_with(path, ContainerKind::QuickTimeMovie, movie);

    engine.trim(path).unwrap();
    let trimmed = store.movie(path).unwrap();
    let timecode = trimmed.tracks.iter().find(|t| t.media == TrackMedia::Timecode).unwrap();
    assert_eq!(timecode.media_range(), Some(span(0, 8)));
}

#[test]
fn test_not_a_movie_container() {
    let path = Path::new("/virtual/take.mp4");
    let (store, engine) = engine_with(path, ContainerKind::Mpeg4, audio_lead_and_tail());

    let result = engine.trim(path);
    assert!(matches!(result, Err(TrimError::NotAMovieContainer(_))));
    assert_eq!(store.movie(path), Some(audio_lead_and_tail()));
}

#[test]
fn test_header_write_failure_keeps_original() {
    let path = Path::new("/virtual/readonly.mov");
    let (store, engine) = engine_with(path, ContainerKind::QuickTimeMovie, audio_lead_and_tail());
    store.set_fail_header_writes(true);

    let result = engine.trim(path);
    assert!(matches!(result, Err(TrimError::HeaderWrite(_))));
    assert_eq!(store.movie(path), Some(audio_lead_and_tail()));
}

#[test]
fn test_unknown_path_is_a_read_error() {
    let store = Arc::new(MemoryContainerStore::new());
    let engine = TrimEngine::new(store);
    assert!(matches!(
        engine.trim(Path::new("/virtual/missing.mov")),
        Err(TrimError::Read(_))
    ));
}

#[tokio::test]
async fn test_spawned_trim_reports_through_channel() {
    let path = Path::new("/virtual/async.mov");
    let (_store, engine) = engine_with(path, ContainerKind::QuickTimeMovie, audio_lead_and_tail());

    let outcome = engine.spawn(path.to_path_buf()).await.unwrap().unwrap();
    assert!(outcome.was_trimmed());
}

//! In-memory writer and container store
//!
//! `MemoryWriter` records every call the recording session makes and, on
//! finalize, materializes the appended samples as a movie header in a
//! `MemoryContainerStore`. The completion callback runs on its own thread,
//! like a real asynchronous container writer.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{SessionError, TrimError};
use crate::recording::{FinalizeCallback, Writer};
use crate::sample::{MediaSample, StreamTag};
use crate::timecode::TimecodeFormat;
use crate::timing::{TimeRange, Timestamp};
use crate::trim::{ContainerKind, ContainerStore, Movie, Track, TrackMedia, TrackSegment};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
struct StoredContainer {
    kind: ContainerKind,
    movie: Movie,
}

/// Container headers keyed by path
#[derive(Debug, Default)]
pub struct MemoryContainerStore {
    containers: Mutex<HashMap<PathBuf, StoredContainer>>,
    header_writes: AtomicU64,
    fail_header_writes: AtomicBool,
}

impl MemoryContainerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, kind: ContainerKind, movie: Movie) {
        lock(&self.containers).insert(path.into(), StoredContainer { kind, movie });
    }

    pub fn movie(&self, path: &Path) -> Option<Movie> {
        lock(&self.containers).get(path).map(|c| c.movie.clone())
    }

    /// Successful header replacements so far
    pub fn header_writes(&self) -> u64 {
        self.header_writes.load(Ordering::SeqCst)
    }

    /// Make every following `replace_header` fail
    pub fn set_fail_header_writes(&self, fail: bool) {
        self.fail_header_writes.store(fail, Ordering::SeqCst);
    }
}

impl ContainerStore for MemoryContainerStore {
    fn container_kind(&self, path: &Path) -> Result<ContainerKind, TrimError> {
        lock(&self.containers)
            .get(path)
            .map(|c| c.kind.clone())
            .ok_or_else(|| TrimError::Read(format!("no container at {}", path.display())))
    }

    fn load_movie(&self, path: &Path) -> Result<Movie, TrimError> {
        self.movie(path)
            .ok_or_else(|| TrimError::Read(format!("no container at {}", path.display())))
    }

    fn replace_header(&self, path: &Path, movie: &Movie) -> Result<(), TrimError> {
        if self.fail_header_writes.load(Ordering::SeqCst) {
            return Err(TrimError::HeaderWrite(format!(
                "header writes disabled for {}",
                path.display()
            )));
        }

        let mut containers = lock(&self.containers);
        let stored = containers
            .get_mut(path)
            .ok_or_else(|| TrimError::HeaderWrite(format!("no container at {}", path.display())))?;
        stored.movie = movie.clone();
        self.header_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct WriterState {
    session_start: Option<Timestamp>,
    session_end: Option<Timestamp>,
    start_calls: u32,
    samples: Vec<MediaSample>,
    timecode_formats: Vec<TimecodeFormat>,
    finalized: bool,
}

/// Writer that keeps everything in memory
pub struct MemoryWriter {
    path: PathBuf,
    store: Arc<MemoryContainerStore>,
    state: Mutex<WriterState>,
    not_ready: Mutex<HashSet<StreamTag>>,
    fail_finalize: AtomicBool,
}

impl MemoryWriter {
    pub fn new(path: impl Into<PathBuf>, store: Arc<MemoryContainerStore>) -> Self {
        Self {
            path: path.into(),
            store,
            state: Mutex::new(WriterState::default()),
            not_ready: Mutex::new(HashSet::new()),
            fail_finalize: AtomicBool::new(false),
        }
    }

    /// Simulate back-pressure on one stream
    pub fn set_ready(&self, stream: StreamTag, ready: bool) {
        let mut not_ready = lock(&self.not_ready);
        if ready {
            not_ready.remove(&stream);
        } else {
            not_ready.insert(stream);
        }
    }

    /// Make `finalize` report failure and write nothing
    pub fn set_fail_finalize(&self, fail: bool) {
        self.fail_finalize.store(fail, Ordering::SeqCst);
    }

    pub fn samples(&self) -> Vec<MediaSample> {
        lock(&self.state).samples.clone()
    }

    pub fn samples_for(&self, stream: StreamTag) -> Vec<MediaSample> {
        lock(&self.state)
            .samples
            .iter()
            .filter(|s| s.stream == stream)
            .cloned()
            .collect()
    }

    pub fn session_start(&self) -> Option<Timestamp> {
        lock(&self.state).session_start
    }

    pub fn session_end(&self) -> Option<Timestamp> {
        lock(&self.state).session_end
    }

    /// How many times `start_session` was called
    pub fn start_calls(&self) -> u32 {
        lock(&self.state).start_calls
    }

    pub fn timecode_formats(&self) -> Vec<TimecodeFormat> {
        lock(&self.state).timecode_formats.clone()
    }

    pub fn is_finalized(&self) -> bool {
        lock(&self.state).finalized
    }

    /// Movie header for the samples written inside the session range
    fn build_movie(state: &WriterState) -> Movie {
        let start = state.session_start.unwrap_or(Timestamp::ZERO);
        let end = state.session_end;

        let layout = [
            (1, StreamTag::Video, TrackMedia::Video),
            (2, StreamTag::Audio, TrackMedia::Audio),
            (3, StreamTag::Timecode, TrackMedia::Timecode),
        ];

        let tracks = layout
            .iter()
            .filter_map(|&(id, stream, media)| {
                let mut track = Track::new(id, media);
                for sample in state.samples.iter().filter(|s| s.stream == stream) {
                    let session = TimeRange::from_start_end(start, end.unwrap_or(sample.end()));
                    let Some(kept) = sample.time_range().intersection(&session) else {
                        continue;
                    };
                    let target = TimeRange::new(kept.start - start, kept.duration);
                    track.segments.push(TrackSegment::media(target, kept.start));
                }
                (!track.segments.is_empty()).then_some(track)
            })
            .collect();

        Movie::new(tracks)
    }
}

impl Writer for MemoryWriter {
    fn is_ready_for_more_data(&self, stream: StreamTag) -> bool {
        !lock(&self.not_ready).contains(&stream)
    }

    fn append(&self, _stream: StreamTag, sample: MediaSample) -> Result<(), SessionError> {
        let mut state = lock(&self.state);
        if state.finalized {
            return Err(SessionError::Writer("append after finalize".to_string()));
        }
        state.samples.push(sample);
        Ok(())
    }

    fn start_session(&self, at: Timestamp) {
        let mut state = lock(&self.state);
        state.start_calls += 1;
        state.session_start = Some(at);
    }

    fn end_session(&self, at: Timestamp) {
        lock(&self.state).session_end = Some(at);
    }

    fn finalize(&self, completion: FinalizeCallback) {
        let result = if self.fail_finalize.load(Ordering::SeqCst) {
            Err(SessionError::Writer(format!(
                "finalize of {} failed",
                self.path.display()
            )))
        } else {
            let mut state = lock(&self.state);
            state.finalized = true;
            let movie = Self::build_movie(&state);
            self.store
                .insert(self.path.clone(), ContainerKind::QuickTimeMovie, movie);
            Ok(())
        };

        let spawned = std::thread::Builder::new()
            .name("memory-writer-finalize".to_string())
            .spawn(move || completion(result));
        if let Err(e) = spawned {
            log::error!("Failed to spawn finalize thread: {}", e);
        }
    }

    fn describe_timecode(&self, format: &TimecodeFormat) {
        lock(&self.state).timecode_formats.push(*format);
    }

    fn output_path(&self) -> &Path {
        &self.path
    }
}

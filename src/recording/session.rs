//! Recording session: producers → sequence check → resampler → clock → writer
//!
//! # Spell: RecordingSessionFlow
//! ^ Intent: deliver two concurrently captured streams to one writer on a consistent timeline
//!
//! @RecordingSession
//!   : start(writer, config) -> RecordingSession
//!   : stop() -> StopHandle
//!   ! video_resampler_has_single_writer
//!   ! writer_back_pressure_skips_sample
//!   ! held_frame_discarded_at_stop
//!   ! clock_reset_before_trim
//!   ! stop_waits_for_in_flight_audio
//!   ! trim_runs_off_capture_threads
//!   - blocking_producers
//!
//! Video arrives from two paths: direct capture and the decoder callback.
//! Both push into one bounded queue drained by a single video worker, which
//! owns the video sequence tracker, the resampler and the timecode encoder.
//! The audio producer owns its `AudioInput` outright. The session clock is
//! the only state shared between them.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::config::{RecordingConfig, RecordingStats, RecordingSummary, SessionCounters};
use super::resampler::FixedRateResampler;
use super::writer::Writer;
use crate::errors::{SessionError, TrimError};
use crate::sample::{CapturedSample, DecodedSample, MediaSample, StreamTag};
use crate::sequence::SequenceTracker;
use crate::timecode::{SmpteTime, TimecodeEncoder, TimecodeFormat};
use crate::timing::SessionClock;
use crate::trim::{ContainerStore, TrimEngine, TrimOutcome};

/// What happened to one sample handed to the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Written,
    /// Writer was not ready; the sample is gone
    Skipped,
}

enum VideoEvent {
    Captured(CapturedSample),
    Decoded(DecodedSample),
    Stop,
}

type TrimReceiver = oneshot::Receiver<Result<TrimOutcome, TrimError>>;

/// Stopped flag of the audio input. A submit holds it for read from the
/// check through the append, so setting it waits out in-flight samples.
type StopGate = Arc<RwLock<bool>>;

fn close_gate(gate: &RwLock<bool>) {
    *gate.write().unwrap_or_else(PoisonError::into_inner) = true;
}

struct Finalized {
    stats: RecordingStats,
    trim: Option<TrimReceiver>,
}

/// Last stage of both pipelines: readiness check, clock, append
#[derive(Clone)]
struct SampleSink {
    writer: Arc<dyn Writer>,
    clock: Arc<SessionClock>,
    counters: Arc<SessionCounters>,
}

impl SampleSink {
    fn deliver(&self, stream: StreamTag, sample: MediaSample) -> Result<Delivery, SessionError> {
        if !self.writer.is_ready_for_more_data(stream) {
            log::trace!("Writer not ready for {}, skipping sample at {}", stream, sample.pts);
            SessionCounters::bump(&self.counters.skipped_not_ready);
            return Ok(Delivery::Skipped);
        }

        let writer = &self.writer;
        if self
            .clock
            .observe(sample.pts, sample.duration, |at| writer.start_session(at))
        {
            log::info!("Writer session started by {} sample at {}", stream, sample.pts);
        }

        if let Err(e) = self.writer.append(stream, sample) {
            SessionCounters::bump(&self.counters.write_errors);
            return Err(e);
        }

        let counter = match stream {
            StreamTag::Video => &self.counters.video_frames,
            StreamTag::Audio => &self.counters.audio_frames,
            StreamTag::Timecode => &self.counters.timecode_samples,
        };
        SessionCounters::bump(counter);
        Ok(Delivery::Written)
    }
}

/// State owned by the video worker thread
struct VideoWorker {
    sink: SampleSink,
    tracker: SequenceTracker,
    resampler: FixedRateResampler,
    timecode: Option<TimecodeEncoder>,
    described: Option<TimecodeFormat>,
}

impl VideoWorker {
    /// Drain the queue until `Stop` or every sender is gone; returns
    /// whether a held frame was discarded
    fn run(mut self, rx: Receiver<VideoEvent>) -> bool {
        for event in rx.iter() {
            match event {
                VideoEvent::Captured(captured) => {
                    if self
                        .tracker
                        .check(StreamTag::Video, captured.sequence, captured.discontinuity)
                    {
                        SessionCounters::bump(&self.sink.counters.video_gaps);
                    }
                    self.handle(captured.sample, captured.smpte);
                }
                VideoEvent::Decoded(decoded) => self.handle(decoded.sample, decoded.smpte),
                VideoEvent::Stop => break,
            }
        }

        self.resampler.finish()
    }

    fn handle(&mut self, sample: MediaSample, smpte: Option<SmpteTime>) {
        if let Some(time) = smpte.as_ref() {
            self.write_timecode(time, &sample);
        }

        for frame in self.resampler.process(sample) {
            if let Err(e) = self.sink.deliver(StreamTag::Video, frame) {
                log::error!("Failed to append video frame: {}", e);
            }
        }
    }

    fn write_timecode(&mut self, time: &SmpteTime, video: &MediaSample) {
        // No encoder means the timecode track is disabled
        let Some(encoder) = self.timecode.as_ref() else {
            return;
        };

        let (sample, format) = match encoder.encode_sample(time, video) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("Dropping timecode {}: {}", time, e);
                SessionCounters::bump(&self.sink.counters.timecode_errors);
                return;
            }
        };

        if self.described != Some(format) {
            log::debug!(
                "Timecode format {:?}: quanta {}, flags {:#x}",
                format.format_type,
                format.frame_quanta,
                format.flags
            );
            self.sink.writer.describe_timecode(&format);
            self.described = Some(format);
        }

        if let Err(e) = self.sink.deliver(StreamTag::Timecode, sample) {
            log::error!("Failed to append timecode sample: {}", e);
        }
    }
}

/// Entry point for video samples, from capture or from the decoder callback
///
/// Cloneable; every clone feeds the same single-writer queue. Never blocks:
/// a full queue drops the sample.
#[derive(Clone)]
pub struct VideoInput {
    tx: Sender<VideoEvent>,
    counters: Arc<SessionCounters>,
}

impl VideoInput {
    pub fn submit_captured(&self, captured: CapturedSample) -> Result<(), SessionError> {
        self.enqueue(VideoEvent::Captured(captured))
    }

    pub fn submit_decoded(&self, decoded: DecodedSample) -> Result<(), SessionError> {
        self.enqueue(VideoEvent::Decoded(decoded))
    }

    fn enqueue(&self, event: VideoEvent) -> Result<(), SessionError> {
        match self.tx.try_send(event) {
            Ok(()) => {
                SessionCounters::bump(&self.counters.video_in);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                SessionCounters::bump(&self.counters.video_in);
                SessionCounters::bump(&self.counters.dropped_queue_full);
                log::warn!("Video queue full, dropping frame");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(SessionError::Stopped),
        }
    }
}

/// Exclusive entry point for the audio producer
pub struct AudioInput {
    sink: SampleSink,
    tracker: SequenceTracker,
    stopped: StopGate,
}

impl AudioInput {
    pub fn submit(&mut self, captured: CapturedSample) -> Result<Delivery, SessionError> {
        let stopped = self.stopped.read().unwrap_or_else(PoisonError::into_inner);
        if *stopped {
            return Err(SessionError::Stopped);
        }

        if self
            .tracker
            .check(StreamTag::Audio, captured.sequence, captured.discontinuity)
        {
            SessionCounters::bump(&self.sink.counters.audio_gaps);
        }
        self.sink.deliver(StreamTag::Audio, captured.sample)
    }

    pub fn gap_count(&self) -> u64 {
        self.tracker.gap_count(StreamTag::Audio)
    }
}

/// Resolves once the container is finalized and, if enabled, trimmed
pub struct StopHandle {
    session_id: String,
    rx: oneshot::Receiver<Result<Finalized, SessionError>>,
}

impl StopHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Block the current thread until the recording is finished
    ///
    /// Inside an async runtime this returns `BlockingInRuntime`; use
    /// `finished` there.
    pub fn wait(self) -> Result<RecordingSummary, SessionError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(SessionError::BlockingInRuntime);
        }

        let finalized = self
            .rx
            .blocking_recv()
            .map_err(|_| SessionError::FinalizeDropped)??;

        let trim = match finalized.trim {
            Some(rx) => Some(rx.blocking_recv().map_err(|_| SessionError::TrimAborted)??),
            None => None,
        };

        Ok(RecordingSummary {
            session_id: self.session_id,
            stats: finalized.stats,
            trim,
        })
    }

    pub async fn finished(self) -> Result<RecordingSummary, SessionError> {
        let finalized = self.rx.await.map_err(|_| SessionError::FinalizeDropped)??;

        let trim = match finalized.trim {
            Some(rx) => Some(rx.await.map_err(|_| SessionError::TrimAborted)??),
            None => None,
        };

        Ok(RecordingSummary {
            session_id: self.session_id,
            stats: finalized.stats,
            trim,
        })
    }
}

/// One recording from first sample to trimmed container
pub struct RecordingSession {
    id: Uuid,
    config: RecordingConfig,
    sink: SampleSink,
    video_tx: Sender<VideoEvent>,
    worker: Option<JoinHandle<bool>>,
    audio: Option<AudioInput>,
    audio_stopped: StopGate,
    store: Option<Arc<dyn ContainerStore>>,
}

impl RecordingSession {
    pub fn start(writer: Arc<dyn Writer>, config: RecordingConfig) -> Result<Self, SessionError> {
        let id = Uuid::new_v4();
        let timecode = config
            .timecode_byte_width
            .map(TimecodeEncoder::new)
            .transpose()?;
        let resampler = match config.output_fps {
            Some(fps) => FixedRateResampler::with_fps(fps),
            None => FixedRateResampler::new(None),
        };

        let sink = SampleSink {
            writer,
            clock: Arc::new(SessionClock::new()),
            counters: Arc::new(SessionCounters::default()),
        };

        let (video_tx, video_rx) = crossbeam_channel::bounded(config.video_queue_capacity.max(1));
        let worker = VideoWorker {
            sink: sink.clone(),
            tracker: SequenceTracker::new(),
            resampler,
            timecode,
            described: None,
        };
        let handle = std::thread::Builder::new()
            .name("crabsync-video".to_string())
            .spawn(move || worker.run(video_rx))
            .map_err(|e| SessionError::Spawn(e.to_string()))?;

        let audio_stopped = Arc::new(RwLock::new(false));
        let audio = AudioInput {
            sink: sink.clone(),
            tracker: SequenceTracker::new(),
            stopped: audio_stopped.clone(),
        };

        log::info!(
            "Recording session {} started: output {}, fps {:?}, timecode {:?}",
            id,
            sink.writer.output_path().display(),
            config.output_fps,
            config.timecode_byte_width
        );

        Ok(Self {
            id,
            config,
            sink,
            video_tx,
            worker: Some(handle),
            audio: Some(audio),
            audio_stopped,
            store: None,
        })
    }

    /// Container access for the trim pass
    pub fn with_container_store(mut self, store: Arc<dyn ContainerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<SessionClock> {
        self.sink.clock.clone()
    }

    pub fn video_input(&self) -> VideoInput {
        VideoInput {
            tx: self.video_tx.clone(),
            counters: self.sink.counters.clone(),
        }
    }

    /// The audio input; only the first call returns it
    pub fn take_audio_input(&mut self) -> Option<AudioInput> {
        self.audio.take()
    }

    /// Live counters
    pub fn stats(&self) -> RecordingStats {
        self.sink.counters.snapshot(
            self.sink.clock.snapshot(),
            false,
            self.sink.writer.output_path().display().to_string(),
        )
    }

    /// Stop both inputs, end the writer session and finalize the container
    ///
    /// The held frame of an incomplete output slot is discarded. Once the
    /// writer reports completion the session clock is reset and the trim pass
    /// starts on its own thread.
    pub fn stop(mut self) -> StopHandle {
        let (tx, rx) = oneshot::channel();
        let handle = StopHandle {
            session_id: self.id.to_string(),
            rx,
        };
        log::info!("Stopping recording session {}", self.id);

        // Blocks until an audio sample already past the check is written
        close_gate(&self.audio_stopped);
        let discarded = match self.join_worker() {
            Ok(discarded) => discarded,
            Err(e) => {
                let _ = tx.send(Err(e));
                return handle;
            }
        };

        let writer = self.sink.writer.clone();
        match self.sink.clock.end() {
            Some(end) => writer.end_session(end),
            None => log::warn!("Session {} stopped before any sample was written", self.id),
        }

        let clock = self.sink.clock.clone();
        let counters = self.sink.counters.clone();
        let output_path: PathBuf = writer.output_path().to_path_buf();
        let trim = self.trim_engine();
        let id = self.id;

        writer.finalize(Box::new(move |result| {
            let stats = counters.snapshot(
                clock.snapshot(),
                discarded,
                output_path.display().to_string(),
            );
            clock.reset();

            let finalized = match result {
                Ok(()) => {
                    log::info!(
                        "Session {} finalized: {} video, {} audio, {} timecode samples over {:.3}s",
                        id,
                        stats.video_frames,
                        stats.audio_frames,
                        stats.timecode_samples,
                        stats.duration_secs
                    );
                    Ok(Finalized {
                        stats,
                        trim: trim.map(|engine| engine.spawn(output_path)),
                    })
                }
                Err(e) => {
                    log::error!("Session {} failed to finalize: {}", id, e);
                    Err(e)
                }
            };
            let _ = tx.send(finalized);
        }));

        handle
    }

    fn trim_engine(&self) -> Option<TrimEngine> {
        if !self.config.trim_after_finalize {
            return None;
        }
        match &self.store {
            Some(store) => Some(TrimEngine::new(store.clone())),
            None => {
                log::warn!("Trim enabled but no container store attached, skipping trim");
                None
            }
        }
    }

    fn join_worker(&mut self) -> Result<bool, SessionError> {
        let Some(worker) = self.worker.take() else {
            return Ok(false);
        };
        // The worker may already be gone if it panicked; join reports that
        let _ = self.video_tx.send(VideoEvent::Stop);
        worker.join().map_err(|_| {
            log::error!("Video worker of session {} panicked", self.id);
            SessionError::WorkerPanicked
        })
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.worker.is_some() {
            log::warn!("Recording session {} dropped without stop", self.id);
            close_gate(&self.audio_stopped);
            let _ = self.join_worker();
        }
    }
}

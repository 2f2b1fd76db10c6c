//! Tests for the recording module

#[cfg(test)]
mod recording_tests {
    use crate::errors::SessionError;
    use crate::recording::{Delivery, FinalizeCallback, RecordingConfig, RecordingSession, Writer};
    use crate::sample::{CapturedSample, DecodedSample, MediaSample, StreamTag};
    use crate::testing::{
        synthetic_audio_chunk, synthetic_video_frame, synthetic_video_frame_with_timecode,
        MemoryContainerStore, MemoryWriter, SyntheticStream,
    };
    use crate::timecode::{decode_record, SmpteTime, FLAG_DROP_FRAME};
    use crate::timing::{TimeRange, Timestamp};
    use crate::trim::TrimOutcome;
    use crossbeam_channel::{Receiver, Sender};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup(path: &str) -> (Arc<MemoryContainerStore>, Arc<MemoryWriter>) {
        let store = Arc::new(MemoryContainerStore::new());
        let writer = Arc::new(MemoryWriter::new(path, store.clone()));
        (store, writer)
    }

    /// Parks every audio readiness check until the test releases it
    struct ParkingWriter {
        inner: Arc<MemoryWriter>,
        parked: Sender<()>,
        release: Receiver<()>,
    }

    impl Writer for ParkingWriter {
        fn is_ready_for_more_data(&self, stream: StreamTag) -> bool {
            if stream == StreamTag::Audio {
                let _ = self.parked.send(());
                let _ = self.release.recv();
            }
            self.inner.is_ready_for_more_data(stream)
        }

        fn append(&self, stream: StreamTag, sample: MediaSample) -> Result<(), SessionError> {
            self.inner.append(stream, sample)
        }

        fn start_session(&self, at: Timestamp) {
            self.inner.start_session(at)
        }

        fn end_session(&self, at: Timestamp) {
            self.inner.end_session(at)
        }

        fn finalize(&self, completion: FinalizeCallback) {
            self.inner.finalize(completion)
        }

        fn output_path(&self) -> &Path {
            self.inner.output_path()
        }
    }

    fn config() -> RecordingConfig {
        RecordingConfig::passthrough()
            .with_trim(false)
            .with_video_queue_capacity(1024)
    }

    #[test]
    fn test_config_builders() {
        let config = RecordingConfig::new(25).with_timecode(8).with_trim(false);
        assert_eq!(config.output_fps, Some(25));
        assert_eq!(config.timecode_byte_width, Some(8));
        assert!(!config.trim_after_finalize);

        assert_eq!(
            RecordingConfig::default().with_video_queue_capacity(0).video_queue_capacity,
            1
        );
        assert_eq!(RecordingConfig::passthrough().output_fps, None);
    }

    #[test]
    fn test_config_from_file_sections() {
        let mut file = crate::config::CrabSyncConfig::default();
        file.timecode.enabled = true;
        file.timecode.byte_width = 8;
        file.resampler.output_fps = None;
        file.pipeline.video_queue_capacity = 7;

        let config = RecordingConfig::from_config(&file);
        assert_eq!(config.output_fps, None);
        assert_eq!(config.timecode_byte_width, Some(8));
        assert_eq!(config.video_queue_capacity, 7);

        file.timecode.enabled = false;
        assert_eq!(RecordingConfig::from_config(&file).timecode_byte_width, None);
    }

    #[test]
    fn test_recording_workflow() {
        let (_store, writer) = setup("/virtual/workflow.mov");
        let mut session = RecordingSession::start(writer.clone(), config()).unwrap();
        let video = session.video_input();
        let mut audio = session.take_audio_input().unwrap();
        let clock = session.clock();
        let stream = SyntheticStream::default();

        for n in 0..10 {
            assert_eq!(
                audio.submit(synthetic_audio_chunk(n, &stream, Timestamp::ZERO)).unwrap(),
                Delivery::Written
            );
        }
        for n in 0..6 {
            video.submit_captured(synthetic_video_frame(n, 30, Timestamp::ZERO)).unwrap();
        }

        let summary = session.stop().wait().unwrap();
        let stats = summary.stats;

        assert_eq!(stats.video_frames_in, 6);
        assert_eq!(stats.video_frames, 6);
        assert_eq!(stats.audio_frames, 10);
        assert_eq!(stats.video_gaps, 0);
        assert_eq!(stats.audio_gaps, 0);
        assert_eq!(stats.skipped_not_ready, 0);
        assert!(!stats.discarded_held_frame);
        assert!(summary.trim.is_none());

        assert_eq!(writer.start_calls(), 1);
        assert_eq!(writer.session_start(), Some(Timestamp::ZERO));
        assert_eq!(writer.session_end(), Some(Timestamp::new(10 * 1024, 48_000)));
        assert!(writer.is_finalized());
        assert!(stats.clock.initialized);
        assert!(!clock.is_initialized());
    }

    #[test]
    fn test_writer_back_pressure_skips_samples() {
        let (_store, writer) = setup("/virtual/busy.mov");
        writer.set_ready(StreamTag::Audio, false);

        let mut session = RecordingSession::start(writer.clone(), config()).unwrap();
        let mut audio = session.take_audio_input().unwrap();
        let stream = SyntheticStream::default();

        let delivery = audio.submit(synthetic_audio_chunk(0, &stream, Timestamp::ZERO)).unwrap();
        assert_eq!(delivery, Delivery::Skipped);
        // A skipped sample never opens the writer session
        assert_eq!(writer.start_calls(), 0);

        writer.set_ready(StreamTag::Audio, true);
        let delivery = audio.submit(synthetic_audio_chunk(1, &stream, Timestamp::ZERO)).unwrap();
        assert_eq!(delivery, Delivery::Written);

        let stats = session.stop().wait().unwrap().stats;
        assert_eq!(stats.skipped_not_ready, 1);
        assert_eq!(stats.audio_frames, 1);
        assert_eq!(writer.samples_for(StreamTag::Audio).len(), 1);
    }

    #[test]
    fn test_sequence_gaps_are_counted_not_corrected() {
        let (_store, writer) = setup("/virtual/gaps.mov");
        let mut session = RecordingSession::start(writer.clone(), config()).unwrap();
        let video = session.video_input();
        let mut audio = session.take_audio_input().unwrap();
        let stream = SyntheticStream::default();

        for n in [0, 1, 3, 4] {
            video.submit_captured(synthetic_video_frame(n, 30, Timestamp::ZERO)).unwrap();
        }
        audio.submit(synthetic_audio_chunk(0, &stream, Timestamp::ZERO)).unwrap();
        audio
            .submit(synthetic_audio_chunk(1, &stream, Timestamp::ZERO).with_discontinuity(true))
            .unwrap();
        assert_eq!(audio.gap_count(), 1);

        let stats = session.stop().wait().unwrap().stats;
        assert_eq!(stats.video_gaps, 1);
        assert_eq!(stats.audio_gaps, 1);
        assert_eq!(stats.video_frames, 4);
    }

    #[test]
    fn test_decoded_frames_share_the_video_pipeline() {
        let (_store, writer) = setup("/virtual/decoded.mov");
        let mut session =
            RecordingSession::start(writer.clone(), config().with_timecode(4)).unwrap();
        let video = session.video_input();

        let decoder = {
            let video = video.clone();
            std::thread::spawn(move || {
                for n in 0..5u64 {
                    let sample = MediaSample::new(
                        StreamTag::Video,
                        vec![n as u8],
                        Timestamp::new(n as i64, 30),
                        Timestamp::new(1, 30),
                    );
                    let smpte = SmpteTime::from_frame_count(n as i64, 3);
                    video.submit_decoded(DecodedSample::new(sample, Some(smpte))).unwrap();
                }
            })
        };
        decoder.join().unwrap();

        let stats = session.stop().wait().unwrap().stats;
        assert_eq!(stats.video_frames, 5);
        assert_eq!(stats.timecode_samples, 5);
        assert_eq!(writer.samples_for(StreamTag::Video).len(), 5);
    }

    #[test]
    fn test_timecode_track() {
        let (_store, writer) = setup("/virtual/timecode.mov");
        let config = RecordingConfig::new(30)
            .with_trim(false)
            .with_timecode(4)
            .with_video_queue_capacity(1024);
        let session = RecordingSession::start(writer.clone(), config).unwrap();
        let video = session.video_input();

        // 30fps drop-frame
        for n in 0..3 {
            video
                .submit_captured(synthetic_video_frame_with_timecode(n, 30, Timestamp::ZERO, 2))
                .unwrap();
        }
        // A plain frame carries no timecode
        video.submit_captured(synthetic_video_frame(3, 30, Timestamp::ZERO)).unwrap();

        let stats = session.stop().wait().unwrap().stats;
        assert_eq!(stats.timecode_samples, 3);
        assert_eq!(stats.timecode_errors, 0);

        let timecode = writer.samples_for(StreamTag::Timecode);
        let numbers: Vec<i64> = timecode
            .iter()
            .map(|s| decode_record(&s.payload).unwrap().frame_number)
            .collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert_eq!(timecode[1].pts, Timestamp::new(1, 30));

        let formats = writer.timecode_formats();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].frame_quanta, 30);
        assert_ne!(formats[0].flags & FLAG_DROP_FRAME, 0);
        assert_eq!(formats[0].frame_duration, Timestamp::new(1, 30));
    }

    #[test]
    fn test_invalid_timecode_width_rejected_at_start() {
        let (_store, writer) = setup("/virtual/bad.mov");
        let result = RecordingSession::start(writer, config().with_timecode(2));
        assert!(matches!(result, Err(SessionError::Encoding(_))));
    }

    #[test]
    fn test_held_frame_discarded_at_stop() {
        let (_store, writer) = setup("/virtual/held.mov");
        let config = RecordingConfig::new(10)
            .with_trim(false)
            .with_video_queue_capacity(1024);
        let session = RecordingSession::start(writer.clone(), config).unwrap();
        let video = session.video_input();

        // 31 frames at 30fps: ten full 100ms slots, then a frame in an open slot
        for n in 0..31 {
            video.submit_captured(synthetic_video_frame(n, 30, Timestamp::ZERO)).unwrap();
        }

        let stats = session.stop().wait().unwrap().stats;
        assert_eq!(stats.video_frames_in, 31);
        assert_eq!(stats.video_frames, 10);
        assert!(stats.discarded_held_frame);

        let frames = writer.samples_for(StreamTag::Video);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.pts, Timestamp::new(i as i64, 10));
            assert_eq!(frame.duration, Timestamp::new(1, 10));
        }
    }

    #[test]
    fn test_inputs_rejected_after_stop() {
        let (_store, writer) = setup("/virtual/stopped.mov");
        let mut session = RecordingSession::start(writer, config()).unwrap();
        let video = session.video_input();
        let mut audio = session.take_audio_input().unwrap();
        assert!(session.take_audio_input().is_none());

        session.stop().wait().unwrap();

        let frame = synthetic_video_frame(0, 30, Timestamp::ZERO);
        assert_eq!(video.submit_captured(frame), Err(SessionError::Stopped));
        let chunk = synthetic_audio_chunk(0, &SyntheticStream::default(), Timestamp::ZERO);
        assert_eq!(audio.submit(chunk), Err(SessionError::Stopped));
    }

    #[test]
    fn test_stop_waits_for_in_flight_audio() {
        let (_store, memory) = setup("/virtual/in_flight.mov");
        let (parked_tx, parked_rx) = crossbeam_channel::bounded(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded(1);
        let writer = Arc::new(ParkingWriter {
            inner: memory.clone(),
            parked: parked_tx,
            release: release_rx,
        });

        let mut session = RecordingSession::start(writer, config()).unwrap();
        let clock = session.clock();
        let mut audio = session.take_audio_input().unwrap();

        let producer = std::thread::spawn(move || {
            let chunk = synthetic_audio_chunk(0, &SyntheticStream::default(), Timestamp::ZERO);
            let delivery = audio.submit(chunk);
            (delivery, audio)
        });
        // The submit is now inside the writer, past the stopped check
        parked_rx.recv().unwrap();

        let stopper = std::thread::spawn(move || session.stop().wait());
        std::thread::sleep(Duration::from_millis(50));
        assert!(!memory.is_finalized());
        release_tx.send(()).unwrap();

        let (delivery, mut audio) = producer.join().unwrap();
        assert_eq!(delivery, Ok(Delivery::Written));
        let summary = stopper.join().unwrap().unwrap();

        assert_eq!(summary.stats.audio_frames, 1);
        assert_eq!(summary.stats.write_errors, 0);
        assert_eq!(memory.start_calls(), 1);
        assert!(memory.is_finalized());
        assert!(!clock.is_initialized());

        let chunk = synthetic_audio_chunk(1, &SyntheticStream::default(), Timestamp::ZERO);
        assert_eq!(audio.submit(chunk), Err(SessionError::Stopped));
        assert_eq!(memory.start_calls(), 1);
        assert!(!clock.is_initialized());
    }

    #[test]
    fn test_full_queue_drops_frames() {
        let (_store, writer) = setup("/virtual/full.mov");
        // Whatever the worker cannot keep up with is dropped, never blocked on
        let session = RecordingSession::start(
            writer.clone(),
            config().with_video_queue_capacity(1),
        )
        .unwrap();
        let video = session.video_input();
        for n in 0..200 {
            video.submit_captured(synthetic_video_frame(n, 30, Timestamp::ZERO)).unwrap();
        }

        let stats = session.stop().wait().unwrap().stats;
        assert_eq!(stats.video_frames_in, 200);
        assert_eq!(stats.video_frames + stats.dropped_frames, 200);
        assert_eq!(writer.samples_for(StreamTag::Video).len() as u64, stats.video_frames);
    }

    #[test]
    fn test_finalize_failure_is_reported() {
        let (store, writer) = setup("/virtual/failed.mov");
        writer.set_fail_finalize(true);
        let session = RecordingSession::start(writer.clone(), RecordingConfig::passthrough())
            .unwrap()
            .with_container_store(store.clone());
        let clock = session.clock();
        session
            .video_input()
            .submit_captured(synthetic_video_frame(0, 30, Timestamp::ZERO))
            .unwrap();

        let result = session.stop().wait();
        assert!(matches!(result, Err(SessionError::Writer(_))));
        assert!(!clock.is_initialized());
        assert!(store.movie(Path::new("/virtual/failed.mov")).is_none());
    }

    #[test]
    fn test_audio_lead_is_trimmed() {
        let path = "/virtual/lead.mov";
        let (store, writer) = setup(path);
        let session_config = RecordingConfig::new(30).with_video_queue_capacity(1024);
        let mut session = RecordingSession::start(writer.clone(), session_config)
            .unwrap()
            .with_container_store(store.clone());
        let video = session.video_input();
        let mut audio = session.take_audio_input().unwrap();
        let stream = SyntheticStream::default();

        // Audio starts 500ms before video and runs slightly past it
        let audio_start = Timestamp::from_millis(-500);
        for n in 0..stream.audio_chunks_for(1.5) {
            audio.submit(synthetic_audio_chunk(n, &stream, audio_start)).unwrap();
        }
        for n in 0..stream.video_frames_for(1.0) {
            video.submit_captured(synthetic_video_frame(n, 30, Timestamp::ZERO)).unwrap();
        }

        let summary = session.stop().wait().unwrap();
        let seconds = |s: i64| Timestamp::from_secs(s);
        match summary.trim {
            Some(TrimOutcome::Trimmed { kept, visual, audible }) => {
                let expected_kept = TimeRange::from_start_end(
                    Timestamp::from_millis(500),
                    Timestamp::from_millis(1500),
                );
                assert_eq!(kept, expected_kept);
                let expected = TimeRange::from_start_end(Timestamp::ZERO, seconds(1));
                assert_eq!(visual, Some(expected));
                assert_eq!(audible, Some(expected));
            }
            other => panic!("expected trim, got {:?}", other),
        }
        assert_eq!(store.header_writes(), 1);

        let movie = store.movie(Path::new(path)).unwrap();
        assert_eq!(movie.visual_range(), movie.audible_range());
    }

    #[tokio::test]
    async fn test_finished_in_async_context() {
        let (store, writer) = setup("/virtual/async.mov");
        let session = RecordingSession::start(writer, RecordingConfig::passthrough())
            .unwrap()
            .with_container_store(store);
        session
            .video_input()
            .submit_captured(synthetic_video_frame(0, 30, Timestamp::ZERO))
            .unwrap();

        let summary = session.stop().finished().await.unwrap();
        assert_eq!(summary.stats.video_frames, 1);
        // Video only: nothing audible to compare against
        assert!(matches!(summary.trim, Some(TrimOutcome::Untouched { .. })));
    }

    #[tokio::test]
    async fn test_blocking_wait_rejected_in_async_context() {
        let (_store, writer) = setup("/virtual/blocking.mov");
        let session = RecordingSession::start(writer.clone(), config()).unwrap();

        let result = session.stop().wait();
        assert_eq!(result.err(), Some(SessionError::BlockingInRuntime));
    }

    #[test]
    fn test_live_stats_and_writer_path() {
        let (_store, writer) = setup("/virtual/live.mov");
        let mut session = RecordingSession::start(writer.clone(), config()).unwrap();
        let mut audio = session.take_audio_input().unwrap();
        let chunk = CapturedSample::new(
            MediaSample::new(
                StreamTag::Audio,
                vec![0u8; 4],
                Timestamp::ZERO,
                Timestamp::from_millis(20),
            ),
            0,
        );
        audio.submit(chunk).unwrap();

        let stats = session.stats();
        assert_eq!(stats.audio_frames, 1);
        assert_eq!(stats.output_path, writer.output_path().display().to_string());
        assert_eq!(stats.clock.duration, Timestamp::from_millis(20));
        session.stop().wait().unwrap();
    }
}

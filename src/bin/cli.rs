use anyhow::{anyhow, bail, Context, Result};
use crabsync::recording::{RecordingConfig, RecordingSession};
use crabsync::testing::{
    synthetic_audio_chunk, synthetic_video_frame, MemoryContainerStore, MemoryWriter,
    SyntheticStream,
};
use crabsync::timecode::{frame_quanta, SmpteTime, TimecodeEncoder, TimecodeFormatType};
use crabsync::timing::Timestamp;
use crabsync::CrabSyncConfig;
use std::env;
use std::sync::Arc;

fn main() -> Result<()> {
    crabsync::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabsync-cli <timecode|simulate> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "timecode" => cmd_timecode(&args),
        "simulate" => cmd_simulate(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn value_after<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{} requires a value", flag))
}

fn cmd_timecode(args: &[String]) -> Result<()> {
    // Parse args: timecode <HH:MM:SS:FF> [--type <n>] [--width 4|8] [--negative] [--json]
    let mut text = None;
    let mut frame_type = 3u32;
    let mut width = 4usize;
    let mut negative = false;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--type" => {
                i += 1;
                frame_type = value_after(args, i, "--type")?.parse()?;
            }
            "--width" => {
                i += 1;
                width = value_after(args, i, "--width")?.parse()?;
            }
            "--negative" => negative = true,
            "--json" => json = true,
            other => {
                if text.is_none() {
                    text = Some(other.to_string());
                }
            }
        }
        i += 1;
    }

    let text = text.context("timecode value required, e.g. 00:01:00;00")?;
    let mut time = SmpteTime::parse(&text, frame_type)?;
    if negative {
        time = time.with_negative(true);
    }

    let encoder = TimecodeEncoder::new(width)?;
    let record = encoder.encode(&time)?;
    let payload = record.to_bytes()?;
    let hex: String = payload.iter().map(|b| format!("{:02x}", b)).collect();
    // Frame duration of one frame at the frame type's nominal rate
    let quanta = i64::from(frame_quanta(frame_type));
    let format = encoder.format_for(&time, Timestamp::new(1, quanta))?;
    let fourcc_bytes = TimecodeFormatType::from_byte_width(width)?.fourcc();
    let fourcc = String::from_utf8_lossy(&fourcc_bytes).to_string();

    if json {
        let out = serde_json::json!({
            "timecode": time.to_string(),
            "frame_number": record.frame_number,
            "payload": hex,
            "fourcc": fourcc,
            "format": format,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Timecode:     {}", time);
        println!("Frame number: {}", record.frame_number);
        println!("Payload:      {} ({} bytes, {})", hex, width, fourcc);
        println!(
            "Format:       quanta {}, flags {:#x}{}",
            format.frame_quanta,
            format.flags,
            if format.is_drop_frame() { " (drop-frame)" } else { "" }
        );
    }
    Ok(())
}

fn cmd_simulate(args: &[String]) -> Result<()> {
    // Parse args: simulate [--fps <n>] [--seconds <s>] [--audio-lead-ms <m>] [--json]
    let file_config = CrabSyncConfig::load_or_default();
    file_config.validate()?;

    let mut fps = file_config.resampler.output_fps.unwrap_or(30);
    let mut seconds = 2.0f64;
    let mut audio_lead_ms = 250i64;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--fps" => {
                i += 1;
                fps = value_after(args, i, "--fps")?.parse()?;
            }
            "--seconds" => {
                i += 1;
                seconds = value_after(args, i, "--seconds")?.parse()?;
            }
            "--audio-lead-ms" => {
                i += 1;
                audio_lead_ms = value_after(args, i, "--audio-lead-ms")?.parse()?;
            }
            "--json" => json = true,
            other => bail!("Unknown argument: {}", other),
        }
        i += 1;
    }
    if fps == 0 || seconds.is_nan() || seconds <= 0.0 {
        bail!("--fps and --seconds must be positive");
    }

    let store = Arc::new(MemoryContainerStore::new());
    let writer = Arc::new(MemoryWriter::new("simulated.mov", store.clone()));
    let mut config = RecordingConfig::from_config(&file_config);
    config.output_fps = Some(fps);
    config.trim_after_finalize = true;
    // Producers here are faster than real time; size the queue for the whole take
    let frames = (seconds * fps as f64).round() as usize;
    config.video_queue_capacity = config.video_queue_capacity.max(frames);

    let mut session = RecordingSession::start(writer, config)?.with_container_store(store);
    let video = session.video_input();
    let mut audio = session
        .take_audio_input()
        .context("audio input already taken")?;

    let stream = SyntheticStream {
        fps,
        ..SyntheticStream::default()
    };
    let audio_start = Timestamp::from_millis(-audio_lead_ms);
    let audio_seconds = seconds + audio_lead_ms as f64 / 1000.0;

    // Audio first, so a lead opens the session before video arrives
    let audio_thread = std::thread::spawn(move || -> Result<()> {
        for n in 0..stream.audio_chunks_for(audio_seconds) {
            audio.submit(synthetic_audio_chunk(n, &stream, audio_start))?;
        }
        Ok(())
    });
    audio_thread
        .join()
        .map_err(|_| anyhow!("audio producer panicked"))??;

    for n in 0..frames as u64 {
        video.submit_captured(synthetic_video_frame(n, fps, Timestamp::ZERO))?;
    }

    let summary = session.stop().wait()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let stats = &summary.stats;
        println!("Session:   {}", summary.session_id);
        println!(
            "Video:     {} in, {} written, {} dropped",
            stats.video_frames_in, stats.video_frames, stats.dropped_frames
        );
        println!("Audio:     {} written", stats.audio_frames);
        println!("Skipped:   {}", stats.skipped_not_ready);
        println!("Duration:  {:.3}s", stats.duration_secs);
        match &summary.trim {
            Some(outcome) => println!("Trim:      {}", serde_json::to_string(outcome)?),
            None => println!("Trim:      disabled"),
        }
    }
    Ok(())
}

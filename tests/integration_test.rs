//! Integration tests for the engine control surface
//!
//! These tests drive `EngineHandle` end to end against the simulated backend:
//! - Play-record output file shape and contents
//! - Stop idempotence across every mode
//! - Multi-channel source handling for single-channel playback
//! - Play cursor behaviour across callbacks

use std::f32::consts::TAU;
use std::path::Path;
use std::sync::Arc;

use whizwordz_audio::config::{AudioConfig, RecordingConfig};
use whizwordz_audio::engine::{CallbackResult, SimulatedBackend};
use whizwordz_audio::{EngineConfig, EngineHandle, StreamRole};

fn engine_in(dir: &Path) -> (Arc<SimulatedBackend>, EngineHandle) {
    let config = EngineConfig {
        audio: AudioConfig::default(),
        recording: RecordingConfig {
            recordings_dir: dir.join("Recordings"),
            file_prefix: "rec_".to_string(),
        },
    };
    let backend = Arc::new(SimulatedBackend::new());
    let engine = EngineHandle::new(backend.clone(), config);
    (backend, engine)
}

fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// A one-second 16 kHz sine is resampled to 48 kHz and recorded in stereo.
#[test]
fn test_play_record_sine_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, engine) = engine_in(dir.path());

    let source = dir.path().join("sine_16k.wav");
    let sine: Vec<i16> = (0..16_000)
        .map(|i| ((TAU * 440.0 * i as f32 / 16_000.0).sin() * 32767.0).round() as i16)
        .collect();
    write_wav(&source, 1, 16_000, &sine);

    engine.start_play_record(&source, 0.0).unwrap();
    assert_eq!(engine.status().unwrap().playback_len, 48_000);

    // 250 callbacks of 192 frames cover the source exactly
    for _ in 0..250 {
        backend.pump(192);
    }
    assert_eq!(engine.play_cursor(), 48_000);

    let summary = engine.stop_play_record().unwrap().unwrap();
    assert_eq!(summary.frames_written, 48_000);
    assert_eq!(summary.file_len, 44 + 48_000 * 4);
    assert!(!summary.write_failed);

    let recorded = engine.last_recorded_file_path().unwrap();
    assert_eq!(recorded, summary.path);
    let name = recorded.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("rec_") && name.ends_with(".wav"));

    let mut reader = hound::WavReader::open(&recorded).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48_000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 48_000);

    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    let mic: Vec<i16> = samples.iter().step_by(2).copied().collect();
    let play: Vec<i16> = samples.iter().skip(1).step_by(2).copied().collect();
    assert!(mic.iter().all(|&s| s == 0), "no capture injected");
    // Every third output frame lands exactly on a source sample
    for (i, &sample) in sine.iter().enumerate().step_by(97) {
        let expected = (sample as f32 / 32768.0 * 32767.0).round() as i16;
        assert!((play[i * 3] - expected).abs() <= 1);
    }
    let peak = play.iter().map(|s| s.unsigned_abs()).max().unwrap();
    assert!(peak > 32000);
}

#[test]
fn test_every_stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, engine) = engine_in(dir.path());

    for _ in 0..2 {
        engine.stop_full_duplex().unwrap();
        assert_eq!(engine.stop_play_record().unwrap(), None);
        engine.stop_playback().unwrap();
    }
    assert_eq!(backend.total_opened(), 0);
    assert_eq!(backend.total_closed(), 0);

    let source = dir.path().join("clip.wav");
    write_wav(&source, 1, 48_000, &[1000; 48]);
    engine.start_full_duplex(3.0).unwrap();
    engine.start_play_record(&source, 0.0).unwrap();
    engine.play_left_channel(&source).unwrap();
    assert_eq!(engine.status().unwrap().live_roles, StreamRole::ALL.to_vec());

    for _ in 0..2 {
        engine.stop_full_duplex().unwrap();
        engine.stop_play_record().unwrap();
        engine.stop_playback().unwrap();
    }
    assert_eq!(backend.total_opened(), 5);
    assert_eq!(backend.total_closed(), 5);
    assert!(engine.status().unwrap().live_roles.is_empty());
}

#[test]
fn test_left_channel_of_stereo_source() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, engine) = engine_in(dir.path());

    // 96 stereo frames at 48 kHz: left ramps up, right is constant
    let source = dir.path().join("stereo.wav");
    let interleaved: Vec<i16> = (0..96i16).flat_map(|i| [i * 100, -20_000]).collect();
    write_wav(&source, 2, 48_000, &interleaved);

    engine.play_left_channel(&source).unwrap();
    assert_eq!(engine.status().unwrap().playback_len, 96);

    let blocks = backend.pump(192);
    let rendered = &blocks[0].samples;
    for i in 0..96 {
        assert_eq!(rendered[i], (i as i16 * 100) as f32 / 32768.0);
    }
    assert!(rendered[96..].iter().all(|&s| s == 0.0));

    assert_eq!(backend.pump(192)[0].result, CallbackResult::Stop);
    assert!(!engine.is_playing());
    engine.stop_playback().unwrap();
}

#[test]
fn test_cursor_is_monotonic_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, engine) = engine_in(dir.path());

    let source = dir.path().join("clip.wav");
    write_wav(&source, 1, 44_100, &[4096; 1000]);
    engine.play_left_channel(&source).unwrap();
    let len = engine.status().unwrap().playback_len;
    assert_eq!(len, 1000 * 48_000 / 44_100);

    let mut last = engine.play_cursor();
    assert_eq!(last, 0);
    for _ in 0..10 {
        let blocks = backend.pump(192);
        let cursor = engine.play_cursor();
        assert!(cursor >= last);
        assert!(cursor <= len);
        if cursor == len {
            if let Some(block) = blocks.first() {
                let emitted = len - last;
                assert!(block.samples[emitted..].iter().all(|&s| s == 0.0));
            }
        }
        last = cursor;
    }
    assert_eq!(last, len);
}

#[test]
fn test_passthrough_and_recording_run_side_by_side() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, engine) = engine_in(dir.path());
    let source = dir.path().join("clip.wav");
    write_wav(&source, 1, 48_000, &[0; 192]);

    engine.start_full_duplex(0.0).unwrap();
    engine.start_play_record(&source, -6.0).unwrap();

    backend.inject_capture(&[0.5; 192]);
    let blocks = backend.pump(192);
    assert_eq!(blocks.len(), 2);

    let summary = engine.stop_play_record().unwrap().unwrap();
    assert_eq!(summary.frames_written, 192);
    let reader = hound::WavReader::open(&summary.path).unwrap();
    let first_mic = reader.into_samples::<i16>().next().unwrap().unwrap();
    // 0.5 at -6 dB
    let expected = (0.5 * 10f32.powf(-6.0 / 20.0) * 32767.0).round() as i16;
    assert_eq!(first_mic, expected);

    engine.stop_full_duplex().unwrap();
}

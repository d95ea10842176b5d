//! Render callbacks for the three engine modes.
//!
//! Each callback owns everything it reads on the real-time thread: the
//! consumer end of the capture ring, an immutable `Arc<[f32]>` snapshot of
//! the playback buffer, and pre-allocated scratch buffers. The only values
//! shared with the control thread are atomics (play cursor, stream state)
//! and the recording sink, which never blocks.
//!
//! # Architecture
//! ```text
//! EngineHandle::start_*()
//!   └─> FullDuplexCallback / PlayRecordCallback / LeftChannelCallback
//!       └─> StreamLifecycle::open_render()
//!           └─> RenderCallback::render() [Real-time thread]
//!               ├─> CaptureConsumer::pull() [non-blocking]
//!               ├─> playback buffer read, cursor publish [atomic]
//!               └─> RecordingSink::append() [try_lock]
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::capture::CaptureConsumer;
use super::dsp::to_pcm16;
use super::recording::{RecordingSink, RECORDING_CHANNELS};
use crate::engine::backend::{CallbackResult, RenderCallback};
use crate::engine::stream::{StreamState, StreamStateFlag};

/// Read position into a playback buffer, published by the render callback.
///
/// Never decreases during a run and never exceeds the buffer length.
#[derive(Debug, Clone, Default)]
pub struct PlayCursor(Arc<AtomicUsize>);

impl PlayCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn publish(&self, position: usize) {
        self.0.store(position, Ordering::Release);
    }
}

/// Next sample of `source` at `*position`, or silence once exhausted.
#[inline]
fn next_sample(source: &[f32], position: &mut usize) -> Option<f32> {
    let sample = source.get(*position).copied()?;
    *position += 1;
    Some(sample)
}

/// Microphone passthrough with gain.
pub struct FullDuplexCallback {
    capture: CaptureConsumer,
    gain: f32,
}

impl FullDuplexCallback {
    pub fn new(capture: CaptureConsumer, gain: f32) -> Self {
        Self { capture, gain }
    }
}

impl RenderCallback for FullDuplexCallback {
    fn render(&mut self, out: &mut [f32]) -> CallbackResult {
        let pulled = self.capture.pull(out);
        for sample in &mut out[..pulled] {
            *sample *= self.gain;
        }
        // Nothing captured yet: silence, never stale buffer contents
        out[pulled..].fill(0.0);
        CallbackResult::Continue
    }
}

/// Plays a source buffer while recording microphone and playback to a stereo file.
pub struct PlayRecordCallback {
    capture: CaptureConsumer,
    gain: f32,
    source: Arc<[f32]>,
    position: usize,
    cursor: PlayCursor,
    sink: Option<Arc<RecordingSink>>,
    mic: Vec<f32>,
    pcm: Vec<i16>,
}

impl PlayRecordCallback {
    /// `block_frames` sizes the scratch buffers; larger device buffers are
    /// processed in blocks of that size. Without a sink the source still plays.
    pub fn new(
        capture: CaptureConsumer,
        gain: f32,
        source: Arc<[f32]>,
        cursor: PlayCursor,
        sink: Option<Arc<RecordingSink>>,
        block_frames: usize,
    ) -> Self {
        let block_frames = block_frames.max(1);
        cursor.publish(0);
        Self {
            capture,
            gain,
            source,
            position: 0,
            cursor,
            sink,
            mic: vec![0.0; block_frames],
            pcm: vec![0; block_frames * RECORDING_CHANNELS as usize],
        }
    }
}

impl RenderCallback for PlayRecordCallback {
    fn render(&mut self, out: &mut [f32]) -> CallbackResult {
        let block_frames = self.mic.len();
        for block in out.chunks_mut(block_frames) {
            let frames = block.len();
            let pulled = self.capture.pull(&mut self.mic[..frames]);

            for (i, slot) in block.iter_mut().enumerate() {
                let mic = if i < pulled { self.mic[i] * self.gain } else { 0.0 };
                let play = next_sample(&self.source, &mut self.position).unwrap_or(0.0);
                *slot = play;
                self.pcm[2 * i] = to_pcm16(mic);
                self.pcm[2 * i + 1] = to_pcm16(play);
            }

            if let Some(sink) = &self.sink {
                sink.append(&self.pcm[..frames * 2]);
            }
        }

        self.cursor.publish(self.position);
        CallbackResult::Continue
    }
}

/// Plays the first channel of a file once, then stops its own stream.
pub struct LeftChannelCallback {
    source: Arc<[f32]>,
    position: usize,
    cursor: PlayCursor,
    state: StreamStateFlag,
}

impl LeftChannelCallback {
    pub fn new(source: Arc<[f32]>, cursor: PlayCursor, state: StreamStateFlag) -> Self {
        cursor.publish(0);
        Self {
            source,
            position: 0,
            cursor,
            state,
        }
    }
}

impl RenderCallback for LeftChannelCallback {
    fn render(&mut self, out: &mut [f32]) -> CallbackResult {
        let mut emitted = 0;
        for slot in out.iter_mut() {
            *slot = match next_sample(&self.source, &mut self.position) {
                Some(sample) => {
                    emitted += 1;
                    sample
                }
                None => 0.0,
            };
        }
        self.cursor.publish(self.position);

        if emitted == 0 && self.position >= self.source.len() {
            self.state.set(StreamState::Closed);
            return CallbackResult::Stop;
        }
        CallbackResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::{CaptureProducer, CaptureRing};

    fn ring() -> (CaptureProducer, CaptureConsumer) {
        CaptureRing::new(1024)
    }

    fn source(samples: &[f32]) -> Arc<[f32]> {
        Arc::from(samples.to_vec())
    }

    #[test]
    fn test_full_duplex_applies_gain() {
        let (mut producer, consumer) = ring();
        let mut callback = FullDuplexCallback::new(consumer, 0.5);
        producer.push_slice(&[0.4, -0.8, 1.0]);

        let mut out = [9.0; 3];
        assert_eq!(callback.render(&mut out), CallbackResult::Continue);
        assert_eq!(out, [0.2, -0.4, 0.5]);
    }

    #[test]
    fn test_full_duplex_silence_when_nothing_captured() {
        let (_producer, consumer) = ring();
        let mut callback = FullDuplexCallback::new(consumer, 1.0);

        let mut out = [0.3; 8];
        callback.render(&mut out);
        assert_eq!(out, [0.0; 8]);
    }

    #[test]
    fn test_full_duplex_zeroes_tail_after_short_read() {
        let (mut producer, consumer) = ring();
        let mut callback = FullDuplexCallback::new(consumer, 1.0);
        producer.push_slice(&[0.1, 0.2]);

        let mut out = [0.9; 5];
        callback.render(&mut out);
        assert_eq!(out, [0.1, 0.2, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_left_channel_emits_then_stops() {
        let cursor = PlayCursor::new();
        let state = StreamStateFlag::new(StreamState::Open);
        let mut callback =
            LeftChannelCallback::new(source(&[0.1, 0.2, 0.3]), cursor.clone(), state.clone());

        let mut out = [1.0; 2];
        assert_eq!(callback.render(&mut out), CallbackResult::Continue);
        assert_eq!(out, [0.1, 0.2]);
        assert_eq!(cursor.position(), 2);

        assert_eq!(callback.render(&mut out), CallbackResult::Continue);
        assert_eq!(out, [0.3, 0.0]);
        assert_eq!(cursor.position(), 3);
        assert_eq!(state.get(), StreamState::Open);

        assert_eq!(callback.render(&mut out), CallbackResult::Stop);
        assert_eq!(out, [0.0, 0.0]);
        assert_eq!(cursor.position(), 3);
        assert_eq!(state.get(), StreamState::Closed);
    }

    #[test]
    fn test_left_channel_empty_source_stops_immediately() {
        let state = StreamStateFlag::new(StreamState::Open);
        let mut callback = LeftChannelCallback::new(source(&[]), PlayCursor::new(), state.clone());

        let mut out = [0.5; 4];
        assert_eq!(callback.render(&mut out), CallbackResult::Stop);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(state.get(), StreamState::Closed);
    }

    #[test]
    fn test_play_record_writes_stereo_mic_and_play() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let sink = Arc::new(RecordingSink::create(&path, 48_000).unwrap());

        let (mut producer, consumer) = ring();
        producer.push_slice(&[0.5, 0.5]);
        let cursor = PlayCursor::new();
        let mut callback = PlayRecordCallback::new(
            consumer,
            1.0,
            source(&[0.25, -0.25, 1.0]),
            cursor.clone(),
            Some(Arc::clone(&sink)),
            2,
        );

        let mut out = [9.0; 4];
        assert_eq!(callback.render(&mut out), CallbackResult::Continue);
        assert_eq!(out, [0.25, -0.25, 1.0, 0.0]);
        assert_eq!(cursor.position(), 3);
        assert_eq!(sink.frames_written(), 4);

        sink.finalize().unwrap();
        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(
            samples,
            vec![16384, 8192, 16384, -8192, 0, 32767, 0, 0]
        );
    }

    #[test]
    fn test_play_record_cursor_is_monotonic_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::create(&dir.path().join("m.wav"), 48_000).unwrap());
        let (_producer, consumer) = ring();
        let cursor = PlayCursor::new();
        let mut callback = PlayRecordCallback::new(
            consumer,
            1.0,
            source(&[0.1; 10]),
            cursor.clone(),
            Some(sink),
            4,
        );

        let mut last = 0;
        let mut out = [0.0; 3];
        for _ in 0..8 {
            assert_eq!(callback.render(&mut out), CallbackResult::Continue);
            let position = cursor.position();
            assert!(position >= last);
            assert!(position <= 10);
            last = position;
        }
        assert_eq!(last, 10);
        assert_eq!(out, [0.0; 3]);
    }

    #[test]
    fn test_play_record_handles_blocks_larger_than_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::create(&dir.path().join("big.wav"), 48_000).unwrap());
        let (_producer, consumer) = ring();
        let mut callback = PlayRecordCallback::new(
            consumer,
            1.0,
            source(&[0.5; 5]),
            PlayCursor::new(),
            Some(Arc::clone(&sink)),
            2,
        );

        let mut out = [0.0; 7];
        callback.render(&mut out);
        assert_eq!(out, [0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
        assert_eq!(sink.frames_written(), 7);
    }
}

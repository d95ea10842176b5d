//! EngineHandle: control surface for the audio modes.
//!
//! All state lives in one `Mutex<EngineState>` taken by every control
//! operation; no callback ever takes it. Stopping or restarting a mode always
//! closes its streams before anything the callbacks read is touched.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::audio::callback::{
    FullDuplexCallback, LeftChannelCallback, PlayCursor, PlayRecordCallback,
};
use crate::audio::capture::{CaptureRing, CaptureStats};
use crate::audio::dsp::db_to_gain;
use crate::audio::recording::{RecordingSink, RecordingSummary};
use crate::audio::recording_path::timestamped_recording_path;
use crate::audio::source::load_playback_source;
use crate::config::EngineConfig;
use crate::engine::backend::{platform_backend, StreamBackend};
use crate::engine::stream::{StreamLifecycle, StreamRole, StreamSlot};
use crate::error::{log_audio_error, AudioError};

/// Snapshot of an in-progress recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingStatus {
    pub path: PathBuf,
    pub frames_written: u64,
    pub frames_dropped: u64,
    pub write_failed: bool,
}

/// Point-in-time view of the engine for hosts and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub backend: String,
    /// Roles whose stream is open and has not stopped itself
    pub live_roles: Vec<StreamRole>,
    pub play_cursor: usize,
    pub playback_len: usize,
    pub gain: f32,
    pub last_recorded_file: Option<PathBuf>,
    pub recording: Option<RecordingStatus>,
    pub last_recording: Option<RecordingSummary>,
    /// Microphone samples lost because the capture ring was full
    pub capture_dropped: u64,
    pub audio_session_id: i32,
}

struct Slots {
    full_duplex_input: StreamSlot,
    full_duplex_output: StreamSlot,
    record_input: StreamSlot,
    play_output: StreamSlot,
    left_channel_output: StreamSlot,
}

impl Slots {
    fn new() -> Self {
        Self {
            full_duplex_input: StreamSlot::new(StreamRole::FullDuplexInput),
            full_duplex_output: StreamSlot::new(StreamRole::FullDuplexOutput),
            record_input: StreamSlot::new(StreamRole::RecordInput),
            play_output: StreamSlot::new(StreamRole::PlayOutput),
            left_channel_output: StreamSlot::new(StreamRole::LeftChannelOutput),
        }
    }

    fn get(&self, role: StreamRole) -> &StreamSlot {
        match role {
            StreamRole::FullDuplexInput => &self.full_duplex_input,
            StreamRole::FullDuplexOutput => &self.full_duplex_output,
            StreamRole::RecordInput => &self.record_input,
            StreamRole::PlayOutput => &self.play_output,
            StreamRole::LeftChannelOutput => &self.left_channel_output,
        }
    }

    fn get_mut(&mut self, role: StreamRole) -> &mut StreamSlot {
        match role {
            StreamRole::FullDuplexInput => &mut self.full_duplex_input,
            StreamRole::FullDuplexOutput => &mut self.full_duplex_output,
            StreamRole::RecordInput => &mut self.record_input,
            StreamRole::PlayOutput => &mut self.play_output,
            StreamRole::LeftChannelOutput => &mut self.left_channel_output,
        }
    }
}

struct EngineState {
    gain: f32,
    cursor: PlayCursor,
    playback_len: usize,
    last_path: Option<PathBuf>,
    recording: Option<Arc<RecordingSink>>,
    last_summary: Option<RecordingSummary>,
    full_duplex_capture: Option<Arc<CaptureStats>>,
    record_capture: Option<Arc<CaptureStats>>,
    slots: Slots,
}

impl EngineState {
    fn new() -> Self {
        Self {
            gain: 1.0,
            cursor: PlayCursor::new(),
            playback_len: 0,
            last_path: None,
            recording: None,
            last_summary: None,
            full_duplex_capture: None,
            record_capture: None,
            slots: Slots::new(),
        }
    }
}

/// Owner of every stream, buffer and recording the engine uses.
pub struct EngineHandle {
    config: EngineConfig,
    lifecycle: StreamLifecycle,
    state: Mutex<EngineState>,
}

impl EngineHandle {
    pub fn new(backend: Arc<dyn StreamBackend>, config: EngineConfig) -> Self {
        let config = config.sanitized();
        tracing::info!(
            backend = backend.name(),
            sample_rate = config.audio.sample_rate,
            frames_per_callback = config.audio.frames_per_callback,
            "[EngineHandle] created"
        );
        Self {
            lifecycle: StreamLifecycle::new(backend, config.audio.clone()),
            config,
            state: Mutex::new(EngineState::new()),
        }
    }

    /// Engine on this platform's device backend with the platform config.
    pub fn with_platform_defaults() -> Self {
        Self::new(platform_backend(), EngineConfig::load())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, EngineState>, AudioError> {
        self.state.lock().map_err(|_| AudioError::LockPoisoned {
            component: "engine_state".to_string(),
        })
    }

    fn close(&self, state: &mut EngineState, role: StreamRole) {
        self.lifecycle.close(state.slots.get_mut(role));
    }

    // ========================================================================
    // FULL-DUPLEX PASSTHROUGH
    // ========================================================================

    /// Route the microphone to the speaker with `gain_db` applied.
    ///
    /// Restarting replaces both streams of the previous session.
    pub fn start_full_duplex(&self, gain_db: f32) -> Result<(), AudioError> {
        let mut state = self.lock_state()?;
        self.close(&mut state, StreamRole::FullDuplexOutput);
        self.close(&mut state, StreamRole::FullDuplexInput);

        let gain = db_to_gain(gain_db);
        state.gain = gain;

        let (producer, consumer) = CaptureRing::new(self.config.audio.capture_ring_frames);
        state.full_duplex_capture = Some(consumer.stats());
        self.lifecycle
            .open_capture(state.slots.get_mut(StreamRole::FullDuplexInput), producer);
        self.lifecycle.open_render(
            state.slots.get_mut(StreamRole::FullDuplexOutput),
            Box::new(FullDuplexCallback::new(consumer, gain)),
        );

        tracing::info!(gain_db, gain, "[EngineHandle] full-duplex started");
        Ok(())
    }

    /// Stop passthrough. Safe to call when not running.
    pub fn stop_full_duplex(&self) -> Result<(), AudioError> {
        let mut state = self.lock_state()?;
        self.close(&mut state, StreamRole::FullDuplexOutput);
        self.close(&mut state, StreamRole::FullDuplexInput);
        tracing::info!("[EngineHandle] full-duplex stopped");
        Ok(())
    }

    // ========================================================================
    // PLAY WHILE RECORDING
    // ========================================================================

    /// Play `source` while recording microphone (left) and playback (right)
    /// to a new timestamped file.
    ///
    /// An unreadable source plays as silence. If the file cannot be created
    /// playback still runs and nothing is recorded. A recording already in
    /// progress is stopped and finalized first.
    pub fn start_play_record(&self, source: &Path, gain_db: f32) -> Result<(), AudioError> {
        let mut state = self.lock_state()?;
        self.close(&mut state, StreamRole::PlayOutput);
        self.close(&mut state, StreamRole::RecordInput);
        if state.recording.is_some() {
            tracing::warn!("[EngineHandle] play-record restarted, finalizing previous recording");
            Self::finalize_recording(&mut state)?;
        }

        let gain = db_to_gain(gain_db);
        state.gain = gain;

        let buffer = load_playback_source(source, self.config.audio.sample_rate);
        state.playback_len = buffer.len();
        let cursor = PlayCursor::new();
        state.cursor = cursor.clone();

        let path = timestamped_recording_path(
            &self.config.recording.recordings_dir,
            &self.config.recording.file_prefix,
        );
        let sink = match RecordingSink::create(&path, self.config.audio.sample_rate) {
            Ok(sink) => {
                state.last_path = Some(path.clone());
                let sink = Arc::new(sink);
                state.recording = Some(Arc::clone(&sink));
                Some(sink)
            }
            Err(err) => {
                log_audio_error(&err, "start_play_record");
                None
            }
        };

        let (producer, consumer) = CaptureRing::new(self.config.audio.capture_ring_frames);
        state.record_capture = Some(consumer.stats());
        self.lifecycle
            .open_capture(state.slots.get_mut(StreamRole::RecordInput), producer);
        self.lifecycle.open_render(
            state.slots.get_mut(StreamRole::PlayOutput),
            Box::new(PlayRecordCallback::new(
                consumer,
                gain,
                buffer,
                cursor,
                sink,
                self.config.audio.frames_per_callback,
            )),
        );

        tracing::info!(
            source = %source.display(),
            recording = ?state.last_path,
            playback_frames = state.playback_len,
            gain_db,
            "[EngineHandle] play-record started"
        );
        Ok(())
    }

    /// Stop play-record and finalize the file.
    ///
    /// Returns `Ok(None)` when no recording was in progress.
    pub fn stop_play_record(&self) -> Result<Option<RecordingSummary>, AudioError> {
        let mut state = self.lock_state()?;
        self.close(&mut state, StreamRole::PlayOutput);
        self.close(&mut state, StreamRole::RecordInput);
        let summary = Self::finalize_recording(&mut state)?;
        if let Some(summary) = &summary {
            tracing::info!(
                path = %summary.path.display(),
                frames = summary.frames_written,
                dropped = summary.frames_dropped,
                bytes = summary.file_len,
                "[EngineHandle] recording finalized"
            );
        }
        Ok(summary)
    }

    /// Streams feeding the sink must already be closed.
    fn finalize_recording(
        state: &mut EngineState,
    ) -> Result<Option<RecordingSummary>, AudioError> {
        let Some(sink) = state.recording.take() else {
            return Ok(None);
        };
        match sink.finalize() {
            Ok(summary) => {
                if summary.is_some() {
                    state.last_summary = summary.clone();
                }
                Ok(summary)
            }
            Err(err) => {
                log_audio_error(&err, "finalize_recording");
                Err(err)
            }
        }
    }

    // ========================================================================
    // SINGLE-CHANNEL PLAYBACK
    // ========================================================================

    /// Play the first channel of `source` once; the stream stops itself at the end.
    pub fn play_left_channel(&self, source: &Path) -> Result<(), AudioError> {
        let mut state = self.lock_state()?;
        self.close(&mut state, StreamRole::LeftChannelOutput);

        let buffer = load_playback_source(source, self.config.audio.sample_rate);
        state.playback_len = buffer.len();
        let cursor = PlayCursor::new();
        state.cursor = cursor.clone();

        let slot = state.slots.get_mut(StreamRole::LeftChannelOutput);
        let callback = LeftChannelCallback::new(buffer, cursor, slot.state_flag());
        self.lifecycle.open_render(slot, Box::new(callback));

        tracing::info!(
            source = %source.display(),
            playback_frames = state.playback_len,
            "[EngineHandle] left-channel playback started"
        );
        Ok(())
    }

    /// Stop single-channel playback, including a stream that already stopped itself.
    pub fn stop_playback(&self) -> Result<(), AudioError> {
        let mut state = self.lock_state()?;
        self.close(&mut state, StreamRole::LeftChannelOutput);
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Path of the most recently created recording file.
    pub fn last_recorded_file_path(&self) -> Option<PathBuf> {
        self.lock_state().ok()?.last_path.clone()
    }

    /// Session id of the active capture stream, 0 when none is open.
    pub fn audio_session_id(&self) -> i32 {
        match self.lock_state() {
            Ok(state) => Self::session_id(&state),
            Err(_) => 0,
        }
    }

    fn session_id(state: &EngineState) -> i32 {
        [StreamRole::FullDuplexInput, StreamRole::RecordInput]
            .iter()
            .map(|role| state.slots.get(*role).session_id())
            .find(|id| *id != 0)
            .unwrap_or(0)
    }

    /// Position of the most recently started playback.
    pub fn play_cursor(&self) -> usize {
        self.lock_state()
            .map(|state| state.cursor.position())
            .unwrap_or(0)
    }

    /// True while a playback stream (left-channel or play-record) is live.
    pub fn is_playing(&self) -> bool {
        self.lock_state()
            .map(|state| {
                state.slots.get(StreamRole::LeftChannelOutput).is_live()
                    || state.slots.get(StreamRole::PlayOutput).is_live()
            })
            .unwrap_or(false)
    }

    pub fn status(&self) -> Result<EngineStatus, AudioError> {
        let state = self.lock_state()?;
        let live_roles = StreamRole::ALL
            .iter()
            .copied()
            .filter(|role| state.slots.get(*role).is_live())
            .collect();
        let recording = state.recording.as_ref().map(|sink| RecordingStatus {
            path: sink.path().to_path_buf(),
            frames_written: sink.frames_written(),
            frames_dropped: sink.frames_dropped(),
            write_failed: sink.write_failed(),
        });

        Ok(EngineStatus {
            backend: self.lifecycle.backend_name().to_string(),
            live_roles,
            play_cursor: state.cursor.position(),
            playback_len: state.playback_len,
            gain: state.gain,
            last_recorded_file: state.last_path.clone(),
            recording,
            last_recording: state.last_summary.clone(),
            capture_dropped: [&state.full_duplex_capture, &state.record_capture]
                .into_iter()
                .flatten()
                .map(|stats| stats.dropped())
                .sum(),
            audio_session_id: Self::session_id(&state),
        })
    }

    /// Close every stream and finalize any open recording.
    pub fn shutdown(&self) -> Result<(), AudioError> {
        let mut state = self.lock_state()?;
        for role in StreamRole::ALL {
            self.close(&mut state, role);
        }
        Self::finalize_recording(&mut state)?;
        Ok(())
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log_audio_error(&err, "EngineHandle::drop");
        }
    }
}

//! Stream lifecycle: one slot per role, opened and closed through a backend.
//!
//! A failed open is logged and leaves the slot empty so the mode keeps
//! running without that stream. Closing is idempotent.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::capture::CaptureProducer;
use crate::config::AudioConfig;
use crate::error::log_audio_error;

use super::backend::{DeviceStream, RenderCallback, StreamBackend, StreamEndpoint, StreamRequest};

/// Purpose of a stream within the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamRole {
    FullDuplexInput,
    FullDuplexOutput,
    RecordInput,
    PlayOutput,
    LeftChannelOutput,
}

impl StreamRole {
    pub const ALL: [StreamRole; 5] = [
        StreamRole::FullDuplexInput,
        StreamRole::FullDuplexOutput,
        StreamRole::RecordInput,
        StreamRole::PlayOutput,
        StreamRole::LeftChannelOutput,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StreamRole::FullDuplexInput => "full_duplex_input",
            StreamRole::FullDuplexOutput => "full_duplex_output",
            StreamRole::RecordInput => "record_input",
            StreamRole::PlayOutput => "play_output",
            StreamRole::LeftChannelOutput => "left_channel_output",
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tri-state lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum StreamState {
    Unopened = 0,
    Open = 1,
    Closed = 2,
}

impl StreamState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StreamState::Open,
            2 => StreamState::Closed,
            _ => StreamState::Unopened,
        }
    }
}

/// State shared between a slot and the callback of its stream.
///
/// A render callback that stops itself marks the flag `Closed` from the
/// real-time thread.
#[derive(Debug, Clone)]
pub struct StreamStateFlag(Arc<AtomicU8>);

impl StreamStateFlag {
    pub fn new(state: StreamState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    pub fn get(&self) -> StreamState {
        StreamState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: StreamState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Holder for at most one stream of a given role.
pub struct StreamSlot {
    role: StreamRole,
    state: StreamStateFlag,
    stream: Option<Box<dyn DeviceStream>>,
}

impl StreamSlot {
    pub fn new(role: StreamRole) -> Self {
        Self {
            role,
            state: StreamStateFlag::new(StreamState::Unopened),
            stream: None,
        }
    }

    pub fn role(&self) -> StreamRole {
        self.role
    }

    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    /// Flag handed to the callback driving this slot's stream.
    pub fn state_flag(&self) -> StreamStateFlag {
        self.state.clone()
    }

    /// True while a stream is held and has not stopped itself.
    pub fn is_live(&self) -> bool {
        self.stream.is_some() && self.state() == StreamState::Open
    }

    /// True while a device resource is held, even if its callback has stopped.
    pub fn holds_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Session id of the held stream, 0 when empty.
    pub fn session_id(&self) -> i32 {
        self.stream.as_ref().map_or(0, |stream| stream.session_id())
    }
}

/// Opens and closes slot streams with the fixed engine profile.
pub struct StreamLifecycle {
    backend: Arc<dyn StreamBackend>,
    audio: AudioConfig,
}

impl StreamLifecycle {
    pub fn new(backend: Arc<dyn StreamBackend>, audio: AudioConfig) -> Self {
        Self { backend, audio }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn audio(&self) -> &AudioConfig {
        &self.audio
    }

    /// Open a capture stream feeding `producer`. Returns whether the slot is open.
    pub fn open_capture(&self, slot: &mut StreamSlot, producer: CaptureProducer) -> bool {
        let request = StreamRequest::capture(&self.audio);
        self.open(slot, &request, StreamEndpoint::Capture(producer))
    }

    /// Open a render stream driving `callback`. Returns whether the slot is open.
    pub fn open_render(&self, slot: &mut StreamSlot, callback: Box<dyn RenderCallback>) -> bool {
        let request = StreamRequest::render(&self.audio);
        self.open(slot, &request, StreamEndpoint::Render(callback))
    }

    fn open(&self, slot: &mut StreamSlot, request: &StreamRequest, endpoint: StreamEndpoint) -> bool {
        self.close(slot);
        let previous = slot.state();
        // Mark open before the first callback can run and stop itself
        slot.state.set(StreamState::Open);

        match self.backend.open(request, endpoint) {
            Ok(stream) => {
                tracing::info!(
                    role = %slot.role,
                    backend = self.backend.name(),
                    session_id = stream.session_id(),
                    "stream opened"
                );
                slot.stream = Some(stream);
                true
            }
            Err(err) => {
                slot.state.set(previous);
                log_audio_error(&err, &format!("open {}", slot.role));
                false
            }
        }
    }

    /// Stop and release the slot's stream. No-op for an empty slot.
    pub fn close(&self, slot: &mut StreamSlot) {
        let Some(stream) = slot.stream.take() else {
            return;
        };

        if let Err(err) = stream.close() {
            log_audio_error(&err, &format!("close {}", slot.role));
        }
        slot.state.set(StreamState::Closed);
        tracing::info!(role = %slot.role, "stream closed");
    }
}

//! Oboe-based stream backend for Android
//!
//! Every stream is opened as a low-latency, shared, mono `f32` stream with
//! its own callback. Capture streams request the unprocessed input preset so
//! the platform applies no noise suppression or echo cancellation, and ask
//! for a fresh audio session id that callers can hand to platform effects.

use ::oboe::{
    AudioInputCallback, AudioInputStreamSafe, AudioOutputCallback, AudioOutputStreamSafe,
    AudioStream, AudioStreamAsync, AudioStreamBuilder, DataCallbackResult, Error as OboeError,
    Input, InputPreset, Mono, Output, PerformanceMode, RawAudioStreamBase, SessionId, SharingMode,
};

use crate::audio::capture::CaptureProducer;
use crate::error::{log_audio_error, AudioError};

use super::{
    check_direction, CallbackResult, DeviceStream, RenderCallback, StreamBackend, StreamEndpoint,
    StreamRequest,
};

/// Android backend built on AAudio / OpenSL ES through oboe-rs.
#[derive(Default)]
pub struct OboeBackend;

impl OboeBackend {
    pub fn new() -> Self {
        Self
    }

    fn open_capture(
        request: &StreamRequest,
        producer: CaptureProducer,
    ) -> Result<OboeStream, AudioError> {
        let builder = AudioStreamBuilder::default()
            .set_performance_mode(performance_mode(request))
            .set_sharing_mode(SharingMode::Shared)
            .set_direction::<Input>()
            .set_sample_rate(request.sample_rate as i32)
            .set_channel_count::<Mono>()
            .set_format::<f32>()
            .set_frames_per_callback(request.frames_per_callback as i32)
            .set_session_id(SessionId::Allocate);
        let builder = if request.unprocessed_input {
            builder.set_input_preset(InputPreset::Unprocessed)
        } else {
            builder
        };

        let mut stream = builder
            .set_callback(CaptureBridge { producer })
            .open_stream()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Input stream: {:?}", e),
            })?;

        stream.start().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to start input stream: {:?}", e),
        })?;

        let session_id = raw_session_id(&stream);
        Ok(OboeStream {
            session_id,
            inner: Inner::Capture(stream),
        })
    }

    fn open_render(
        request: &StreamRequest,
        callback: Box<dyn RenderCallback>,
    ) -> Result<OboeStream, AudioError> {
        let mut stream = AudioStreamBuilder::default()
            .set_performance_mode(performance_mode(request))
            .set_sharing_mode(SharingMode::Shared)
            .set_direction::<Output>()
            .set_sample_rate(request.sample_rate as i32)
            .set_channel_count::<Mono>()
            .set_format::<f32>()
            .set_frames_per_callback(request.frames_per_callback as i32)
            .set_callback(RenderBridge { callback })
            .open_stream()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Output stream: {:?}", e),
            })?;

        stream.start().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to start output stream: {:?}", e),
        })?;

        let session_id = raw_session_id(&stream);
        Ok(OboeStream {
            session_id,
            inner: Inner::Render(stream),
        })
    }
}

fn performance_mode(request: &StreamRequest) -> PerformanceMode {
    if request.low_latency {
        PerformanceMode::LowLatency
    } else {
        PerformanceMode::None
    }
}

// The typed getter panics on ids outside its two named variants, so read the raw field.
fn raw_session_id<S: RawAudioStreamBase>(stream: &S) -> i32 {
    let id = stream._raw_base().mSessionId as i32;
    id.max(0)
}

impl StreamBackend for OboeBackend {
    fn name(&self) -> &'static str {
        "oboe"
    }

    fn open(
        &self,
        request: &StreamRequest,
        endpoint: StreamEndpoint,
    ) -> Result<Box<dyn DeviceStream>, AudioError> {
        check_direction(request, &endpoint)?;

        let stream = match endpoint {
            StreamEndpoint::Capture(producer) => Self::open_capture(request, producer)?,
            StreamEndpoint::Render(callback) => Self::open_render(request, callback)?,
        };

        tracing::debug!(
            direction = ?request.direction,
            sample_rate = request.sample_rate,
            session_id = stream.session_id,
            "oboe stream started"
        );

        Ok(Box::new(stream))
    }
}

/// Pushes microphone samples into the capture ring.
struct CaptureBridge {
    producer: CaptureProducer,
}

impl AudioInputCallback for CaptureBridge {
    type FrameType = (f32, Mono);

    fn on_audio_ready(
        &mut self,
        _stream: &mut dyn AudioInputStreamSafe,
        frames: &[f32],
    ) -> DataCallbackResult {
        // Real-time audio callback - NO ALLOCATIONS, LOCKS, OR BLOCKING!
        self.producer.push_slice(frames);
        DataCallbackResult::Continue
    }

    fn on_error_after_close(&mut self, _stream: &mut dyn AudioInputStreamSafe, error: OboeError) {
        log_audio_error(&stream_failure(error), "oboe capture stream");
    }
}

/// Hands the output buffer to the engine's render callback.
struct RenderBridge {
    callback: Box<dyn RenderCallback>,
}

impl AudioOutputCallback for RenderBridge {
    type FrameType = (f32, Mono);

    fn on_audio_ready(
        &mut self,
        _stream: &mut dyn AudioOutputStreamSafe,
        frames: &mut [f32],
    ) -> DataCallbackResult {
        match self.callback.render(frames) {
            CallbackResult::Continue => DataCallbackResult::Continue,
            CallbackResult::Stop => DataCallbackResult::Stop,
        }
    }

    fn on_error_after_close(&mut self, _stream: &mut dyn AudioOutputStreamSafe, error: OboeError) {
        log_audio_error(&stream_failure(error), "oboe render stream");
    }
}

/// Disconnects (device unplugged, route change) arrive after oboe has closed the stream.
fn stream_failure(error: OboeError) -> AudioError {
    AudioError::StreamFailure {
        reason: format!("{:?}", error),
    }
}

enum Inner {
    Capture(AudioStreamAsync<Input, CaptureBridge>),
    Render(AudioStreamAsync<Output, RenderBridge>),
}

struct OboeStream {
    session_id: i32,
    inner: Inner,
}

// SAFETY: the stream handle is only touched by the control thread that owns
// the EngineHandle lock; callbacks run on oboe's own thread and own their state.
unsafe impl Send for OboeStream {}

impl DeviceStream for OboeStream {
    fn session_id(&self) -> i32 {
        self.session_id
    }

    fn close(self: Box<Self>) -> Result<(), AudioError> {
        let OboeStream { inner, .. } = *self;
        // Stop blocks until the callback has returned; drop then closes the stream
        let result = match inner {
            Inner::Capture(mut stream) => stream.stop(),
            Inner::Render(mut stream) => stream.stop(),
        };
        result.map_err(|e| AudioError::HardwareError {
            details: format!("Failed to stop stream: {:?}", e),
        })
    }
}

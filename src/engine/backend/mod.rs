//! Backend abstractions for device streams.
//!
//! A backend opens one mono `f32` stream per call and starts it before
//! returning. Capture streams feed a [`CaptureProducer`]; render streams
//! drive a [`RenderCallback`] on the platform's real-time thread.

use std::sync::Arc;

use crate::audio::capture::CaptureProducer;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Direction of a device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Capture,
    Render,
}

/// Fixed stream profile requested from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub direction: StreamDirection,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub frames_per_callback: usize,
    /// Request the low-latency performance mode
    pub low_latency: bool,
    /// Request the raw capture path (no noise suppression / echo cancellation)
    pub unprocessed_input: bool,
}

impl StreamRequest {
    pub fn capture(config: &AudioConfig) -> Self {
        Self {
            direction: StreamDirection::Capture,
            sample_rate: config.sample_rate,
            channel_count: 1,
            frames_per_callback: config.frames_per_callback,
            low_latency: true,
            unprocessed_input: true,
        }
    }

    pub fn render(config: &AudioConfig) -> Self {
        Self {
            direction: StreamDirection::Render,
            sample_rate: config.sample_rate,
            channel_count: 1,
            frames_per_callback: config.frames_per_callback,
            low_latency: true,
            unprocessed_input: false,
        }
    }
}

/// Value returned from a render callback to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    Continue,
    /// Ask the platform to stop invoking this callback
    Stop,
}

/// Real-time render handler.
///
/// Implementations must not allocate, lock or block inside `render`.
pub trait RenderCallback: Send + 'static {
    /// Fill `out` with mono samples.
    fn render(&mut self, out: &mut [f32]) -> CallbackResult;
}

/// What a stream is wired to.
pub enum StreamEndpoint {
    Capture(CaptureProducer),
    Render(Box<dyn RenderCallback>),
}

impl StreamEndpoint {
    pub fn direction(&self) -> StreamDirection {
        match self {
            StreamEndpoint::Capture(_) => StreamDirection::Capture,
            StreamEndpoint::Render(_) => StreamDirection::Render,
        }
    }
}

/// An opened, started device stream.
pub trait DeviceStream: Send {
    /// Platform-assigned audio session id, 0 when the platform has none.
    fn session_id(&self) -> i32;

    /// Stop and release the stream.
    ///
    /// Returns only once the device has quiesced: no callback runs after this.
    fn close(self: Box<Self>) -> Result<(), AudioError>;
}

/// Trait implemented by platform-specific audio backends.
pub trait StreamBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Open and start a stream described by `request`.
    fn open(
        &self,
        request: &StreamRequest,
        endpoint: StreamEndpoint,
    ) -> Result<Box<dyn DeviceStream>, AudioError>;
}

fn check_direction(request: &StreamRequest, endpoint: &StreamEndpoint) -> Result<(), AudioError> {
    if request.direction != endpoint.direction() {
        return Err(AudioError::StreamOpenFailed {
            reason: format!(
                "{:?} request wired to a {:?} endpoint",
                request.direction,
                endpoint.direction()
            ),
        });
    }
    Ok(())
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        mod oboe;
        pub use self::oboe::OboeBackend;

        /// Backend for the device this build targets.
        pub fn platform_backend() -> Arc<dyn StreamBackend> {
            Arc::new(OboeBackend::new())
        }
    } else {
        mod cpal;
        pub use self::cpal::CpalBackend;

        /// Backend for the device this build targets.
        pub fn platform_backend() -> Arc<dyn StreamBackend> {
            Arc::new(CpalBackend::new())
        }
    }
}

mod simulated;
pub use simulated::{RenderedBlock, SimulatedBackend};

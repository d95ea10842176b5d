//! CPAL-based stream backend for desktop platforms (Linux, macOS, Windows)
//!
//! Streams are opened on the default host's default devices at the requested
//! rate. Devices that only expose multichannel layouts are handled here: capture
//! keeps the first channel, render copies the mono signal to every channel.

use ::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::capture::CaptureProducer;
use crate::error::{log_audio_error, AudioError};

use super::{
    check_direction, CallbackResult, DeviceStream, RenderCallback, StreamBackend, StreamDirection,
    StreamEndpoint, StreamRequest,
};

/// Upper bound on frames handed to a render callback in one call.
const SCRATCH_FRAMES: usize = 4096;

/// Desktop backend driving the default input and output devices.
pub struct CpalBackend {
    host_id: ::cpal::HostId,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host_id: ::cpal::default_host().id(),
        }
    }

    fn device(&self, direction: StreamDirection) -> Result<::cpal::Device, AudioError> {
        let host = ::cpal::host_from_id(self.host_id).map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Host unavailable: {}", e),
        })?;
        let device = match direction {
            StreamDirection::Capture => host.default_input_device(),
            StreamDirection::Render => host.default_output_device(),
        };
        device.ok_or_else(|| AudioError::StreamOpenFailed {
            reason: format!("No default {:?} device found", direction),
        })
    }

    /// Device channel layout at the requested rate.
    fn stream_config(
        device: &::cpal::Device,
        request: &StreamRequest,
    ) -> Result<::cpal::StreamConfig, AudioError> {
        let default = match request.direction {
            StreamDirection::Capture => device.default_input_config(),
            StreamDirection::Render => device.default_output_config(),
        }
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default config: {:?}", e),
        })?;

        if default.sample_format() != ::cpal::SampleFormat::F32 {
            return Err(AudioError::StreamOpenFailed {
                reason: format!(
                    "Only F32 sample format is supported, device offers {:?}",
                    default.sample_format()
                ),
            });
        }

        Ok(::cpal::StreamConfig {
            channels: default.channels(),
            sample_rate: ::cpal::SampleRate(request.sample_rate),
            buffer_size: ::cpal::BufferSize::Default,
        })
    }

    fn build_capture(
        device: &::cpal::Device,
        config: &::cpal::StreamConfig,
        mut producer: CaptureProducer,
    ) -> Result<::cpal::Stream, AudioError> {
        let channels = config.channels.max(1) as usize;
        let mut mono = vec![0.0f32; SCRATCH_FRAMES];

        device
            .build_input_stream(
                config,
                move |data: &[f32], _: &::cpal::InputCallbackInfo| {
                    if channels == 1 {
                        producer.push_slice(data);
                        return;
                    }
                    // De-interleave: keep the first channel
                    for block in data.chunks(channels * SCRATCH_FRAMES) {
                        let frames = block.len() / channels;
                        for (slot, frame) in mono.iter_mut().zip(block.chunks_exact(channels)) {
                            *slot = frame[0];
                        }
                        producer.push_slice(&mono[..frames]);
                    }
                },
                |err| log_audio_error(&stream_failure(err), "cpal capture stream"),
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Capture stream: {:?}", e),
            })
    }

    fn build_render(
        device: &::cpal::Device,
        config: &::cpal::StreamConfig,
        mut callback: Box<dyn RenderCallback>,
    ) -> Result<::cpal::Stream, AudioError> {
        let channels = config.channels.max(1) as usize;
        let mut mono = vec![0.0f32; SCRATCH_FRAMES];
        // CPAL has no way to stop a stream from its own callback
        let mut halted = false;

        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &::cpal::OutputCallbackInfo| {
                    if halted {
                        data.fill(0.0);
                        return;
                    }
                    for block in data.chunks_mut(channels * SCRATCH_FRAMES) {
                        let frames = block.len() / channels;
                        let scratch = &mut mono[..frames];
                        if callback.render(scratch) == CallbackResult::Stop {
                            halted = true;
                        }
                        for (frame, sample) in block.chunks_exact_mut(channels).zip(scratch.iter())
                        {
                            frame.fill(*sample);
                        }
                        if halted {
                            break;
                        }
                    }
                },
                |err| log_audio_error(&stream_failure(err), "cpal render stream"),
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Render stream: {:?}", e),
            })
    }
}

/// Runtime stream errors are reported on CPAL's error callback, never the data one.
fn stream_failure(err: ::cpal::StreamError) -> AudioError {
    AudioError::StreamFailure {
        reason: err.to_string(),
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(
        &self,
        request: &StreamRequest,
        endpoint: StreamEndpoint,
    ) -> Result<Box<dyn DeviceStream>, AudioError> {
        check_direction(request, &endpoint)?;

        let device = self.device(request.direction)?;
        let config = Self::stream_config(&device, request)?;

        let stream = match endpoint {
            StreamEndpoint::Capture(producer) => Self::build_capture(&device, &config, producer)?,
            StreamEndpoint::Render(callback) => Self::build_render(&device, &config, callback)?,
        };

        stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to start {:?} stream: {}", request.direction, e),
        })?;

        tracing::debug!(
            direction = ?request.direction,
            sample_rate = request.sample_rate,
            channels = config.channels,
            "cpal stream started"
        );

        Ok(Box::new(CpalStream(stream)))
    }
}

/// Owned CPAL stream.
struct CpalStream(::cpal::Stream);

// SAFETY: the stream is created, paused and dropped only by the thread that
// holds the owning EngineHandle lock; the handle is never used concurrently.
unsafe impl Send for CpalStream {}

impl DeviceStream for CpalStream {
    fn session_id(&self) -> i32 {
        0
    }

    fn close(self: Box<Self>) -> Result<(), AudioError> {
        let result = self.0.pause().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to pause stream: {}", e),
        });
        // Dropping joins the device thread; no callback runs afterwards
        drop(self);
        result
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::capture::CaptureProducer;
use crate::error::AudioError;

use super::{
    check_direction, CallbackResult, DeviceStream, RenderCallback, StreamBackend, StreamDirection,
    StreamEndpoint, StreamRequest,
};

/// Deterministic backend used for tests and dry runs.
///
/// Nothing runs on its own: callers push microphone samples with
/// [`SimulatedBackend::inject_capture`] and drive render callbacks with
/// [`SimulatedBackend::pump`]. Callbacks run while the registry lock is
/// held, so closing a stream waits for an in-flight callback to finish,
/// mirroring the synchronous close of a real device.
pub struct SimulatedBackend {
    registry: Arc<Mutex<Registry>>,
    fail_capture: AtomicBool,
    fail_render: AtomicBool,
}

/// Output of one render callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub session_id: i32,
    pub samples: Vec<f32>,
    pub result: CallbackResult,
}

#[derive(Default)]
struct Registry {
    next_session_id: i32,
    captures: Vec<(i32, CaptureProducer)>,
    renders: Vec<RenderEntry>,
    opened: usize,
    closed: usize,
}

struct RenderEntry {
    session_id: i32,
    callback: Box<dyn RenderCallback>,
    halted: bool,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            fail_capture: AtomicBool::new(false),
            fail_render: AtomicBool::new(false),
        }
    }

    /// Make subsequent opens in `direction` fail, as an unavailable device would.
    pub fn set_fail_opens(&self, direction: StreamDirection, fail: bool) {
        match direction {
            StreamDirection::Capture => self.fail_capture.store(fail, Ordering::SeqCst),
            StreamDirection::Render => self.fail_render.store(fail, Ordering::SeqCst),
        }
    }

    /// Deliver microphone samples to every open capture stream.
    pub fn inject_capture(&self, samples: &[f32]) {
        let mut registry = self.lock();
        for (_, producer) in registry.captures.iter_mut() {
            producer.push_slice(samples);
        }
    }

    /// Invoke every live render callback once with `frames` frames.
    ///
    /// A callback that returns [`CallbackResult::Stop`] is not invoked again.
    pub fn pump(&self, frames: usize) -> Vec<RenderedBlock> {
        let mut registry = self.lock();
        registry
            .renders
            .iter_mut()
            .filter(|entry| !entry.halted)
            .map(|entry| {
                let mut samples = vec![0.0; frames];
                let result = entry.callback.render(&mut samples);
                if result == CallbackResult::Stop {
                    entry.halted = true;
                }
                RenderedBlock {
                    session_id: entry.session_id,
                    samples,
                    result,
                }
            })
            .collect()
    }

    pub fn open_capture_streams(&self) -> usize {
        self.lock().captures.len()
    }

    /// Render streams registered and not yet closed (halted ones included).
    pub fn open_render_streams(&self) -> usize {
        self.lock().renders.len()
    }

    pub fn total_opened(&self) -> usize {
        self.lock().opened
    }

    pub fn total_closed(&self) -> usize {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panicking test callback must not wedge the remaining assertions
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn open(
        &self,
        request: &StreamRequest,
        endpoint: StreamEndpoint,
    ) -> Result<Box<dyn DeviceStream>, AudioError> {
        check_direction(request, &endpoint)?;

        let failing = match request.direction {
            StreamDirection::Capture => &self.fail_capture,
            StreamDirection::Render => &self.fail_render,
        };
        if failing.load(Ordering::SeqCst) {
            return Err(AudioError::StreamOpenFailed {
                reason: format!("simulated {:?} device unavailable", request.direction),
            });
        }

        let mut registry = self.lock();
        registry.next_session_id += 1;
        registry.opened += 1;
        let session_id = registry.next_session_id;

        match endpoint {
            StreamEndpoint::Capture(producer) => registry.captures.push((session_id, producer)),
            StreamEndpoint::Render(callback) => registry.renders.push(RenderEntry {
                session_id,
                callback,
                halted: false,
            }),
        }

        Ok(Box::new(SimulatedStream {
            session_id,
            registry: Arc::clone(&self.registry),
        }))
    }
}

struct SimulatedStream {
    session_id: i32,
    registry: Arc<Mutex<Registry>>,
}

impl DeviceStream for SimulatedStream {
    fn session_id(&self) -> i32 {
        self.session_id
    }

    fn close(self: Box<Self>) -> Result<(), AudioError> {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = self.session_id;
        registry.captures.retain(|(session_id, _)| *session_id != id);
        registry.renders.retain(|entry| entry.session_id != id);
        registry.closed += 1;
        Ok(())
    }
}

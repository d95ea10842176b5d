//! Engine module housing stream management and the control surface.
//!
//! `backend` abstracts the platform audio APIs, `stream` tracks one stream
//! per role, and `core` exposes the `EngineHandle` the host drives.

pub mod backend;
pub mod core;
pub mod stream;

#[cfg(target_os = "android")]
pub use backend::OboeBackend;
#[cfg(not(target_os = "android"))]
pub use backend::CpalBackend;
pub use backend::{
    platform_backend, CallbackResult, DeviceStream, RenderCallback, RenderedBlock,
    SimulatedBackend, StreamBackend, StreamDirection, StreamEndpoint, StreamRequest,
};
pub use self::core::{EngineHandle, EngineStatus, RecordingStatus};
pub use stream::{StreamLifecycle, StreamRole, StreamSlot, StreamState, StreamStateFlag};

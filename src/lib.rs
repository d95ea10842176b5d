// WhizWordz Audio Core - Rust Audio Engine
// Duplex streaming, play-while-recording and prompt playback

// Module declarations
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;

// Re-exports for convenience
pub use audio::RecordingSummary;
pub use config::EngineConfig;
pub use engine::{EngineHandle, EngineStatus, StreamRole};
pub use error::{AudioError, ErrorCode};

/// Install the Android log sink for `tracing` events.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    match tracing_android::layer("WhizWordz") {
        Ok(layer) => {
            // Already installed when the library is reloaded
            let _ = tracing_subscriber::registry().with(layer).try_init();
        }
        Err(err) => log::error!("Failed to create Android log layer: {}", err),
    }
}

/// Install a formatted subscriber on stderr honouring `RUST_LOG`.
#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// JNI_OnLoad is called when the native library is loaded by Android
/// This function initializes the Android context required by oboe-rs
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn JNI_OnLoad(
    vm: jni::JavaVM,
    _reserved: *mut std::ffi::c_void,
) -> jni::sys::jint {
    init_logging();

    tracing::info!("JNI_OnLoad called - initializing Android context");

    // SAFETY: the JavaVM pointer is valid for the life of the process and
    // this runs once per library load, before any Oboe stream is opened.
    // Stream opening needs only the VM; no application context is passed.
    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            std::ptr::null_mut(),
        );
    }

    tracing::info!("Android context initialized successfully");

    jni::sys::JNI_VERSION_1_6
}

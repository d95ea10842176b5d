// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants shared with the host application.
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Failed to open a device stream
    pub const STREAM_OPEN_FAILED: i32 = 1001;

    /// Hardware error while starting or stopping a stream
    pub const HARDWARE_ERROR: i32 = 1002;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1003;

    /// Audio stream disconnected or failed unexpectedly
    pub const STREAM_FAILURE: i32 = 1004;

    /// Playback source could not be opened or read
    pub const SOURCE_UNREADABLE: i32 = 1005;

    /// Recording container could not be created, written or finalized
    pub const RECORDING_FAILED: i32 = 1006;
}

/// Log an audio error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
/// Never called from a real-time callback.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Stream failed after it was opened
    StreamFailure { reason: String },

    /// Playback source missing or unreadable
    SourceUnreadable { path: String, reason: String },

    /// Recording container I/O failed
    RecordingFailed { path: String, reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::SourceUnreadable { .. } => AudioErrorCodes::SOURCE_UNREADABLE,
            AudioError::RecordingFailed { .. } => AudioErrorCodes::RECORDING_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::SourceUnreadable { path, reason } => {
                format!("Cannot read playback source {}: {}", path, reason)
            }
            AudioError::RecordingFailed { path, reason } => {
                format!("Recording {} failed: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            AudioErrorCodes::HARDWARE_ERROR
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            AudioErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            AudioError::StreamFailure {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_FAILURE
        );
        assert_eq!(
            AudioError::SourceUnreadable {
                path: "a.wav".to_string(),
                reason: "missing".to_string()
            }
            .code(),
            AudioErrorCodes::SOURCE_UNREADABLE
        );
        assert_eq!(
            AudioError::RecordingFailed {
                path: "b.wav".to_string(),
                reason: "disk full".to_string()
            }
            .code(),
            AudioErrorCodes::RECORDING_FAILED
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::HardwareError {
            details: "test error".to_string(),
        };
        assert_eq!(err.message(), "Hardware error: test error");

        let err = AudioError::RecordingFailed {
            path: "rec_1.wav".to_string(),
            reason: "disk full".to_string(),
        };
        assert!(err.message().contains("rec_1.wav"));
        assert!(err.message().contains("disk full"));
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::LockPoisoned {
            component: "engine_state".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
    }
}

// Error types for the audio core
//
// Structured errors with numeric codes suitable for reporting across the
// host application boundary.

mod audio;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};

/// Error codes for structured error reporting
///
/// Gives every error type a numeric code and message so the host can
/// handle failures without parsing strings.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

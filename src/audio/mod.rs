// Audio module - sample processing, container I/O and real-time callbacks

pub mod callback;
pub mod capture;
pub mod dsp;
pub mod recording;
pub mod recording_path;
pub mod resample;
pub mod source;
pub mod wav;

// Re-export commonly used types for convenience
pub use callback::{FullDuplexCallback, LeftChannelCallback, PlayCursor, PlayRecordCallback};
pub use capture::{CaptureConsumer, CaptureProducer, CaptureRing, CaptureStats};
pub use recording::{RecordingSink, RecordingSummary, RECORDING_CHANNELS};
pub use source::load_playback_source;
pub use wav::{read_first_channel, DecodedSource, PcmFormat, WavWriter};

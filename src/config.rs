//! Configuration management for the audio core
//!
//! Runtime configuration is loaded from JSON so stream sizing and the
//! recordings location can be adjusted without recompilation. Every field
//! falls back to the values the engine was tuned with.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed operating rate for all device streams and internal buffers.
pub const OPERATING_SAMPLE_RATE: u32 = 48_000;

/// Frames delivered per real-time callback (4 ms at 48 kHz).
pub const FRAMES_PER_CALLBACK: usize = 192;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

/// Device stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate requested from every device stream
    pub sample_rate: u32,
    /// Frames per data callback requested from the device
    pub frames_per_callback: usize,
    /// Capacity of the capture ring buffer in mono frames
    pub capture_ring_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: OPERATING_SAMPLE_RATE,
            frames_per_callback: FRAMES_PER_CALLBACK,
            // 16 callbacks of headroom between capture and render threads
            capture_ring_frames: FRAMES_PER_CALLBACK * 16,
        }
    }
}

impl AudioConfig {
    /// Replace zero sizes, which no device stream or ring can use, with defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let mut config = self;
        if config.sample_rate == 0 {
            log::warn!(
                "[Config] sample_rate is 0. Using {}.",
                defaults.sample_rate
            );
            config.sample_rate = defaults.sample_rate;
        }
        if config.frames_per_callback == 0 {
            log::warn!(
                "[Config] frames_per_callback is 0. Using {}.",
                defaults.frames_per_callback
            );
            config.frames_per_callback = defaults.frames_per_callback;
        }
        if config.capture_ring_frames == 0 {
            log::warn!(
                "[Config] capture_ring_frames is 0. Using {}.",
                defaults.capture_ring_frames
            );
            config.capture_ring_frames = defaults.capture_ring_frames;
        }
        config
    }
}

/// Recording output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Application-scoped directory that receives recordings
    pub recordings_dir: PathBuf,
    /// File name prefix placed before the timestamp
    pub file_prefix: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            recordings_dir: default_recordings_dir(),
            file_prefix: "rec_".to_string(),
        }
    }
}

#[cfg(target_os = "android")]
fn default_recordings_dir() -> PathBuf {
    PathBuf::from("/sdcard/Recordings/WhizWordz")
}

#[cfg(not(target_os = "android"))]
fn default_recordings_dir() -> PathBuf {
    PathBuf::from("recordings")
}

impl EngineConfig {
    /// Load configuration from JSON file
    ///
    /// Falls back to [`EngineConfig::default`] when the file is missing or
    /// cannot be parsed; the failure is logged rather than returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config.sanitized()
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Same configuration with unusable audio sizes replaced by defaults.
    pub fn sanitized(self) -> Self {
        Self {
            audio: self.audio.sanitized(),
            recording: self.recording,
        }
    }

    /// Android builds ship no config file; the APK-scoped defaults apply.
    #[cfg(target_os = "android")]
    pub fn load() -> Self {
        log::info!("[Config] Using default configuration on Android");
        Self::default()
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/engine_config.json")
    }
}

//! Recording sink shared by the play-record callback and the control thread.
//!
//! The callback appends through [`RecordingSink::append`], which uses
//! `try_lock` and therefore never blocks the audio thread. The control
//! thread finalizes only after the render stream has been closed, so in
//! practice the lock is uncontended; a contended append drops the block and
//! counts it.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::wav::{PcmFormat, WavWriter};
use crate::error::AudioError;

/// Channels in every recording: microphone left, playback right.
pub const RECORDING_CHANNELS: u16 = 2;

type FileWriter = WavWriter<BufWriter<File>>;

/// Outcome of a finalized recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub frames_written: u64,
    pub frames_dropped: u64,
    pub file_len: u64,
    /// True when at least one append failed with an I/O error.
    pub write_failed: bool,
}

/// Open container file fed from the real-time thread.
pub struct RecordingSink {
    path: PathBuf,
    writer: Mutex<Option<FileWriter>>,
    frames_written: AtomicU64,
    frames_dropped: AtomicU64,
    write_failed: AtomicBool,
}

impl RecordingSink {
    /// Create the file (and its directory) and write a placeholder header.
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self, AudioError> {
        let fail = |err: std::io::Error| AudioError::RecordingFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        };

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(fail)?;
        }
        let file = File::create(path).map_err(fail)?;
        let writer = WavWriter::new(
            BufWriter::new(file),
            PcmFormat::new(RECORDING_CHANNELS, sample_rate),
        )
        .map_err(fail)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(Some(writer)),
            frames_written: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            write_failed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append interleaved stereo samples. Real-time safe: never blocks.
    pub fn append(&self, interleaved: &[i16]) {
        let frames = (interleaved.len() / RECORDING_CHANNELS as usize) as u64;
        let mut guard = match self.writer.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.frames_dropped.fetch_add(frames, Ordering::Relaxed);
                return;
            }
        };

        match guard.as_mut() {
            Some(writer) => match writer.write_samples(interleaved) {
                Ok(()) => {
                    self.frames_written.fetch_add(frames, Ordering::Relaxed);
                }
                Err(_) => {
                    self.write_failed.store(true, Ordering::Relaxed);
                    self.frames_dropped.fetch_add(frames, Ordering::Relaxed);
                }
            },
            // Already finalized
            None => {
                self.frames_dropped.fetch_add(frames, Ordering::Relaxed);
            }
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn write_failed(&self) -> bool {
        self.write_failed.load(Ordering::Relaxed)
    }

    pub fn is_finalized(&self) -> bool {
        match self.writer.lock() {
            Ok(guard) => guard.is_none(),
            Err(_) => true,
        }
    }

    /// Patch the header sizes and close the file.
    ///
    /// Must only be called once the stream feeding this sink is closed.
    /// A second call returns `Ok(None)`.
    pub fn finalize(&self) -> Result<Option<RecordingSummary>, AudioError> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "recording_sink".to_string(),
            })?
            .take();

        let Some(writer) = writer else {
            return Ok(None);
        };

        let buffered = writer.finalize().map_err(|err| AudioError::RecordingFailed {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        })?;
        let file = buffered
            .into_inner()
            .map_err(|err| AudioError::RecordingFailed {
                path: self.path.display().to_string(),
                reason: err.error().to_string(),
            })?;
        let file_len = file.metadata().map(|meta| meta.len()).unwrap_or(0);

        Ok(Some(RecordingSummary {
            path: self.path.clone(),
            frames_written: self.frames_written(),
            frames_dropped: self.frames_dropped(),
            file_len,
            write_failed: self.write_failed(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_append_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rec_test.wav");
        let sink = RecordingSink::create(&path, 48_000).unwrap();

        sink.append(&[1, 2, 3, 4, 5, 6]);
        sink.append(&[7, 8]);
        assert_eq!(sink.frames_written(), 4);

        let summary = sink.finalize().unwrap().unwrap();
        assert_eq!(summary.frames_written, 4);
        assert_eq!(summary.file_len, 44 + 16);
        assert!(!summary.write_failed);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 48_000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.duration(), 4);
    }

    #[test]
    fn test_finalize_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::create(&dir.path().join("a.wav"), 48_000).unwrap();
        assert!(sink.finalize().unwrap().is_some());
        assert!(sink.finalize().unwrap().is_none());
        assert!(sink.is_finalized());
    }

    #[test]
    fn test_append_after_finalize_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::create(&dir.path().join("b.wav"), 48_000).unwrap();
        sink.finalize().unwrap();
        sink.append(&[0; 8]);
        assert_eq!(sink.frames_written(), 0);
        assert_eq!(sink.frames_dropped(), 4);
    }

    #[test]
    fn test_contended_append_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::create(&dir.path().join("c.wav"), 48_000).unwrap();
        let _held = sink.writer.lock().unwrap();
        sink.append(&[0; 4]);
        assert_eq!(sink.frames_dropped(), 2);
    }

    #[test]
    fn test_create_in_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let result = RecordingSink::create(&blocker.join("rec.wav"), 48_000);
        assert!(matches!(result, Err(AudioError::RecordingFailed { .. })));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_is_reported() {
        // Every write to /dev/full fails with ENOSPC once the buffer flushes
        let sink = RecordingSink::create(Path::new("/dev/full"), 48_000).unwrap();
        let block = [1000i16; 2 * 4096];
        sink.append(&block);
        sink.append(&block);

        assert!(sink.write_failed());
        assert!(sink.frames_dropped() > 0);
        assert!(sink.frames_written() < 8192);

        let result = sink.finalize();
        assert!(matches!(result, Err(AudioError::RecordingFailed { .. })));
        // The writer is consumed even when finalizing fails
        assert!(sink.is_finalized());
    }
}

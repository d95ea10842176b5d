//! Playback source loading: decode the first channel, convert to the operating rate.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use super::resample::resample_linear;
use super::wav::read_first_channel;
use crate::error::{log_audio_error, AudioError};

/// Load `path` as a mono buffer at `target_rate`.
///
/// Never fails: an unreadable file is logged and yields an empty buffer,
/// which plays as silence. A declared rate of 0 is taken as `target_rate`.
pub fn load_playback_source(path: &Path, target_rate: u32) -> Arc<[f32]> {
    match decode(path) {
        Ok((samples, source_rate)) => {
            let source_rate = if source_rate == 0 {
                target_rate
            } else {
                source_rate
            };
            let resampled = resample_linear(&samples, source_rate, target_rate);
            tracing::debug!(
                path = %path.display(),
                source_rate,
                source_frames = samples.len(),
                frames = resampled.len(),
                "playback source loaded"
            );
            Arc::from(resampled)
        }
        Err(err) => {
            log_audio_error(&err, "load_playback_source");
            Arc::from(Vec::new())
        }
    }
}

fn decode(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let unreadable = |err: std::io::Error| AudioError::SourceUnreadable {
        path: path.display().to_string(),
        reason: err.to_string(),
    };
    let file = File::open(path).map_err(unreadable)?;
    let decoded = read_first_channel(file).map_err(unreadable)?;
    Ok((decoded.samples, decoded.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(path: &Path, channels: u16, sample_rate: u32, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in frames {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = load_playback_source(&dir.path().join("absent.wav"), 48_000);
        assert!(source.is_empty());
    }

    #[test]
    fn test_same_rate_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_fixture(&path, 1, 48_000, &[16384, -16384, 0]);

        let source = load_playback_source(&path, 48_000);
        assert_eq!(&source[..], &[0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_stereo_source_keeps_left_channel_and_resamples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // 100 frames of (left = 8192, right = -32768) at 24 kHz
        let frames: Vec<i16> = (0..100).flat_map(|_| [8192, -32768]).collect();
        write_fixture(&path, 2, 24_000, &frames);

        let source = load_playback_source(&path, 48_000);
        assert_eq!(source.len(), 200);
        assert!(source.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_truncated_header_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        std::fs::write(&path, b"RIFF\x00\x00").unwrap();
        assert!(load_playback_source(&path, 48_000).is_empty());
    }
}

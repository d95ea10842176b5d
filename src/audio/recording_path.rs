//! Timestamped output locations for new recordings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<dir>/<prefix><YYYYMMDD_HHMMSS>.wav` for the given instant.
///
/// Uniqueness is only guaranteed at one-second resolution.
pub fn recording_path_at<Tz: TimeZone>(dir: &Path, prefix: &str, at: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!("{}{}.wav", prefix, at.format(TIMESTAMP_FORMAT)))
}

/// Recording path stamped with the current local wall-clock time.
pub fn timestamped_recording_path(dir: &Path, prefix: &str) -> PathBuf {
    recording_path_at(dir, prefix, &Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_format_matches_convention() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = recording_path_at(Path::new("/sdcard/Recordings/WhizWordz"), "rec_", &at);
        assert_eq!(
            path,
            PathBuf::from("/sdcard/Recordings/WhizWordz/rec_20240309_070501.wav")
        );
    }

    #[test]
    fn test_uses_local_offset_of_timestamp() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let at = tz.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let path = recording_path_at(Path::new("out"), "take_", &at);
        assert_eq!(path, PathBuf::from("out/take_20251231_235959.wav"));
    }

    #[test]
    fn test_now_has_expected_shape() {
        let path = timestamped_recording_path(Path::new("dir"), "rec_");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("rec_"));
        assert!(name.ends_with(".wav"));
        // rec_ + 8 digits + _ + 6 digits + .wav
        assert_eq!(name.len(), 4 + 15 + 4);
    }
}

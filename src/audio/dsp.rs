//! Sample-level helpers shared by the callback pipelines.

/// Convert a decibel value to a linear gain factor (`10^(dB/20)`).
pub fn db_to_gain(gain_db: f32) -> f32 {
    10.0_f32.powf(gain_db / 20.0)
}

/// Convert a normalized sample to 16-bit PCM using `round(sample * 32767)`.
///
/// Values pushed past full scale by gain are clamped instead of wrapping.
#[inline]
pub fn to_pcm16(sample: f32) -> i16 {
    let scaled = (sample * i16::MAX as f32).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Convert a 16-bit PCM sample to a normalized float.
#[inline]
pub fn from_pcm16(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_gain_at_zero_db() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_minus_twenty_db_is_one_tenth() {
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_plus_six_db_roughly_doubles() {
        assert!((db_to_gain(6.0) - 1.995_262).abs() < 1e-4);
    }

    #[test]
    fn test_pcm16_rounds() {
        assert_eq!(to_pcm16(0.0), 0);
        assert_eq!(to_pcm16(1.0), 32767);
        assert_eq!(to_pcm16(-1.0), -32767);
        // 0.5 * 32767 = 16383.5 rounds away from zero
        assert_eq!(to_pcm16(0.5), 16384);
    }

    #[test]
    fn test_pcm16_clamps_overdriven_samples() {
        assert_eq!(to_pcm16(3.0), i16::MAX);
        assert_eq!(to_pcm16(-3.0), i16::MIN);
    }

    #[test]
    fn test_from_pcm16_range() {
        assert_eq!(from_pcm16(i16::MIN), -1.0);
        assert!(from_pcm16(i16::MAX) < 1.0);
    }
}

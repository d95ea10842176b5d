//! Linear-interpolation sample-rate conversion
//!
//! Playback material arrives at whatever rate it was recorded with, while
//! every device stream runs at the fixed operating rate. Conversion happens
//! once at mode start on the control thread, never inside a callback.

/// Number of output samples produced for `input_len` samples
/// (`floor(input_len * target_rate / source_rate)`).
pub fn resampled_len(input_len: usize, source_rate: u32, target_rate: u32) -> usize {
    if source_rate == 0 || source_rate == target_rate {
        return input_len;
    }
    (input_len as u64 * target_rate as u64 / source_rate as u64) as usize
}

/// Resample `input` from `source_rate` to `target_rate`.
///
/// Equal rates produce an identity copy. A `source_rate` of 0 means the rate
/// is unknown and is treated as already matching `target_rate`.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == 0 || source_rate == target_rate || input.is_empty() {
        return input.to_vec();
    }

    let out_len = resampled_len(input.len(), source_rate, target_rate);
    let last = input.len() - 1;
    let step = source_rate as f64 / target_rate as f64;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = pos - idx as f64;
            let a = input[idx.min(last)] as f64;
            let b = input[(idx + 1).min(last)] as f64;
            (a * (1.0 - frac) + b * frac) as f32
        })
        .collect()
}

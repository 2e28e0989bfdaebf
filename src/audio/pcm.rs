use crate::constants::SAMPLE_RATE;
use crate::error::EarprintError;

/// One least-significant bit of 16-bit PCM, in float terms. The stereo
/// cancellation heuristic measures channel means against this.
const LSB_16: f32 = 1.0 / 32768.0;

/// Check source parameters and return the integer decimation factor down
/// to `SAMPLE_RATE`. Only integer-factor downsampling is supported: the
/// source rate must be a positive multiple of 11025 Hz.
pub fn decimation_factor(sample_rate: u32) -> Result<u32, EarprintError> {
    if sample_rate < SAMPLE_RATE || sample_rate % SAMPLE_RATE != 0 {
        return Err(EarprintError::InvalidParams(format!(
            "sample rate {} is not a positive multiple of {}",
            sample_rate, SAMPLE_RATE
        )));
    }
    Ok(sample_rate / SAMPLE_RATE)
}

/// Downsample by averaging consecutive blocks of `factor` samples. A
/// partial tail block is dropped.
pub fn decimate(samples: &[f32], factor: u32) -> Vec<f32> {
    let factor = factor as usize;
    if factor <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(factor)
        .map(|block| block.iter().sum::<f32>() / factor as f32)
        .collect()
}

/// Average two channels into mono.
///
/// When the mix collapses (its mean lands under one LSB) while the
/// individual channels carry near mirror-opposite bias, the channels are
/// cancelling each other and the left channel is taken as-is instead.
pub fn mix_to_mono(left: &[f32], right: &[f32]) -> Vec<f32> {
    let len = left.len().min(right.len());
    if len == 0 {
        return Vec::new();
    }

    let mix: Vec<f32> = (0..len).map(|i| (left[i] + right[i]) / 2.0).collect();

    let mix_avg = mix.iter().map(|&s| s as f64).sum::<f64>() / len as f64;
    if mix_avg.abs() < LSB_16 as f64 {
        let avg_l = left[..len].iter().map(|&s| s as f64).sum::<f64>() / len as f64;
        let avg_r = right[..len].iter().map(|&s| s as f64).sum::<f64>() / len as f64;
        if (avg_l + avg_r).abs() < LSB_16 as f64 && avg_l.abs() >= LSB_16 as f64 {
            return left[..len].to_vec();
        }
    }

    mix
}

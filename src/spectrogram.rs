use rustfft::{num_complex::Complex, FftPlanner};

use crate::constants::*;
use crate::error::EarprintError;

/// Silence floor: a spectrogram whose strongest magnitude falls below this
/// is not fingerprintable.
const ZERO_SIGNAL_FLOOR: f32 = 1e-6;

/// Dynamic-range clamp: cells below `max / MAG_RANGE` are raised to it
/// before the log so the floor stays finite.
const MAG_RANGE: f32 = 1e6;

/// A log-magnitude spectrogram, `FFT_HALF_WIN_SIZE` frequency rows by one
/// column per STFT frame. After normalization the mean over all cells is
/// zero, so cell values express prominence relative to the whole track
/// rather than absolute energy.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    rows: Vec<Vec<f32>>,
}

impl Spectrogram {
    /// Number of frequency rows (bins). Row 0 is DC.
    pub fn num_bins(&self) -> usize {
        self.rows.len()
    }

    /// Number of time columns (STFT frames).
    pub fn num_frames(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// One frequency row across all frames.
    pub fn row(&self, bin: usize) -> &[f32] {
        &self.rows[bin]
    }

    pub fn value(&self, bin: usize, frame: usize) -> f32 {
        self.rows[bin][frame]
    }

    /// Copy one time column into `out` (`out.len() == num_bins()`).
    pub fn column_into(&self, frame: usize, out: &mut [f32]) {
        for (bin, row) in self.rows.iter().enumerate() {
            out[bin] = row[frame];
        }
    }
}

/// Build the normalized spectrogram of a mono PCM stream at `SAMPLE_RATE`.
///
/// Windows the input with a Hann window, takes the magnitude of the
/// DC..Nyquist half-spectrum per frame, clamps the dynamic range to
/// `MAG_RANGE`, moves to natural-log scale and subtracts the global mean.
/// The Nyquist row is dropped so exactly `FFT_HALF_WIN_SIZE` rows remain.
///
/// Fails with `ZeroSignal` when no magnitude rises above the silence floor
/// (silence, or an empty stream).
pub fn build_spectrogram(pcm: &[f32]) -> Result<Spectrogram, EarprintError> {
    if pcm.is_empty() {
        return Err(EarprintError::ZeroSignal);
    }

    // Hann of FFT_WIN_SIZE + 2 with the zero endpoints dropped: symmetric,
    // nowhere zero.
    let window: Vec<f32> = (1..=FFT_WIN_SIZE)
        .map(|i| {
            let x = i as f64 / (FFT_WIN_SIZE + 1) as f64;
            (0.5 * (1.0 - (2.0 * std::f64::consts::PI * x).cos())) as f32
        })
        .collect();

    let stride = FFT_WIN_SIZE - FFT_OVERLAP;
    let num_frames = (pcm.len() + stride - 1) / stride;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_WIN_SIZE);

    let mut rows: Vec<Vec<f32>> = vec![Vec::with_capacity(num_frames); FFT_HALF_WIN_SIZE + 1];
    let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FFT_WIN_SIZE];

    for frame in 0..num_frames {
        let offs = frame * stride;
        let tail = pcm.len().min(offs + FFT_WIN_SIZE);

        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = if offs + i < tail { pcm[offs + i] } else { 0.0 };
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process(&mut buffer);

        for (bin, row) in rows.iter_mut().enumerate() {
            row.push(buffer[bin].norm());
        }
    }

    let mut max_mag = 0.0f32;
    for row in &rows {
        for &mag in row {
            max_mag = max_mag.max(mag);
        }
    }

    if max_mag < ZERO_SIGNAL_FLOOR {
        return Err(EarprintError::ZeroSignal);
    }

    // Log scale with a bounded floor, then remove the overall loudness bias
    // so the peak picker compares relative prominence.
    let min_mag = max_mag / MAG_RANGE;
    let mut mean = 0.0f64;
    let mut cells = 0usize;
    for row in rows.iter_mut() {
        for mag in row.iter_mut() {
            let log_mag = (mag.max(min_mag) as f64).ln();
            *mag = log_mag as f32;
            mean += log_mag;
            cells += 1;
        }
    }
    mean /= cells as f64;

    for row in rows.iter_mut() {
        for mag in row.iter_mut() {
            *mag -= mean as f32;
        }
    }

    // Drop the Nyquist row.
    rows.truncate(FFT_HALF_WIN_SIZE);

    Ok(Spectrogram { rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, secs: f64) -> Vec<f32> {
        let n = (secs * SAMPLE_RATE as f64) as usize;
        (0..n)
            .map(|i| {
                (2.0 * std::f64::consts::PI * freq * i as f64 / SAMPLE_RATE as f64).sin() as f32
            })
            .collect()
    }

    #[test]
    fn silence_is_rejected() {
        let pcm = vec![0.0f32; 5 * SAMPLE_RATE as usize];
        assert_eq!(build_spectrogram(&pcm), Err(EarprintError::ZeroSignal));
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(build_spectrogram(&[]), Err(EarprintError::ZeroSignal));
    }

    #[test]
    fn dimensions() {
        let pcm = sine(440.0, 1.0);
        let spec = build_spectrogram(&pcm).unwrap();
        assert_eq!(spec.num_bins(), FFT_HALF_WIN_SIZE);

        let stride = FFT_WIN_SIZE - FFT_OVERLAP;
        let expected = (pcm.len() + stride - 1) / stride;
        assert_eq!(spec.num_frames(), expected);
    }

    #[test]
    fn short_input_is_one_padded_frame() {
        let pcm = sine(440.0, 0.01); // 110 samples, well under one window
        let spec = build_spectrogram(&pcm).unwrap();
        assert_eq!(spec.num_frames(), 1);
    }

    #[test]
    fn normalized_mean_is_zero() {
        let pcm = sine(440.0, 2.0);
        let spec = build_spectrogram(&pcm).unwrap();

        let mut sum = 0.0f64;
        let mut cells = 0usize;
        for bin in 0..spec.num_bins() {
            for &v in spec.row(bin) {
                sum += v as f64;
                cells += 1;
            }
        }
        // The dropped Nyquist row shifts the mean a hair off zero.
        assert!((sum / cells as f64).abs() < 1e-2);
    }

    #[test]
    fn tone_energy_lands_on_its_bin() {
        let pcm = sine(440.0, 1.0);
        let spec = build_spectrogram(&pcm).unwrap();

        let bin_hz = SAMPLE_RATE as f64 / FFT_WIN_SIZE as f64;
        let target = (440.0 / bin_hz).round() as usize;

        // Mid-track column: the tone bin must dominate a far-away bin.
        let col = spec.num_frames() / 2;
        assert!(spec.value(target, col) > spec.value(target + 300, col) + 5.0);
    }
}

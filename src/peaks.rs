use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::gaussian::GaussianCache;
use crate::spectrogram::Spectrogram;

/// One constellation point: an STFT frame index and a frequency bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
    /// Time, in frame units (spectrogram column).
    pub time: u32,
    /// Frequency, in bin units (spectrogram row). 0 = DC.
    pub bin: u32,
}

/// A candidate within one column, kept with its magnitude while it competes
/// for the per-frame slots.
#[derive(Debug, Clone, Copy)]
struct BinVal {
    bin: usize,
    val: f32,
}

/// Sort candidates by descending magnitude; equal magnitudes fall back to
/// the lower bin. Spectrogram cells are finite by construction.
fn by_magnitude_desc(a: &BinVal, b: &BinVal) -> std::cmp::Ordering {
    b.val
        .partial_cmp(&a.val)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then(a.bin.cmp(&b.bin))
}

/// Extract the constellation of a normalized spectrogram.
///
/// Two passes over the frames, both maintaining a per-row threshold
/// envelope that decays by `DECAY_COEFF` each column and is re-raised by
/// the Gaussian spread of every accepted peak:
///
/// * forward scan — flags per-frame local maxima that clear the envelope,
///   capped at `MAX_PEAKS_PER_FRAME` strongest per column;
/// * reverse filter — walks the flags right-to-left, dropping peaks that no
///   longer clear the envelope and letting a surviving peak suppress a
///   same-row flag one column to its right.
///
/// A sustained note therefore collapses to its onset; lingering echoes and
/// late copies of a stronger earlier event are pruned. Emission is
/// column-major: time ascending, bin ascending within a frame.
pub fn find_peaks(spectrogram: &Spectrogram) -> Vec<Peak> {
    if spectrogram.num_frames() == 0 || spectrogram.num_bins() == 0 {
        return Vec::new();
    }

    let mut gauss = GaussianCache::new();
    let mut flags = scan_for_peaks(spectrogram, &mut gauss);
    filter_peaks(spectrogram, &mut flags, &mut gauss);

    let mut peaks = Vec::new();
    for col in 0..spectrogram.num_frames() {
        for (bin, row_flags) in flags.iter().enumerate() {
            if row_flags[col] {
                peaks.push(Peak {
                    time: col as u32,
                    bin: bin as u32,
                });
            }
        }
    }

    peaks
}

/// Forward pass: returns the candidate bitmap, `flags[bin][col]`.
fn scan_for_peaks(spectrogram: &Spectrogram, gauss: &mut GaussianCache) -> Vec<Vec<bool>> {
    let num_rows = spectrogram.num_bins();
    let num_cols = spectrogram.num_frames();

    // Seed the envelope from the loudest cells of the first few frames so
    // the scan does not flag everything at the very start of the track.
    let warmup = num_cols.min(10);
    let mut row_max = vec![0.0f32; num_rows];
    for (bin, slot) in row_max.iter_mut().enumerate() {
        for col in 0..warmup {
            *slot = slot.max(spectrogram.value(bin, col));
        }
    }
    let mut thresh = spread_from_vector(&row_max, gauss);

    let mut flags = vec![vec![false; num_cols]; num_rows];
    let mut column = vec![0.0f32; num_rows];
    let mut candidates: Vec<BinVal> = Vec::new();

    for col in 0..num_cols {
        spectrogram.column_into(col, &mut column);

        candidates.clear();
        for (bin, &is_max) in loc_max(&column).iter().enumerate() {
            if is_max && column[bin] > thresh[bin] {
                candidates.push(BinVal {
                    bin,
                    val: column[bin],
                });
            }
        }

        candidates.sort_by(by_magnitude_desc);
        candidates.truncate(MAX_PEAKS_PER_FRAME);

        for cand in &candidates {
            spread_peak(&mut thresh, gauss, cand.bin, cand.val);
            flags[cand.bin][col] = true;
        }

        fade(&mut thresh, DECAY_COEFF);
    }

    flags
}

/// Reverse pass: prunes the bitmap in place.
fn filter_peaks(spectrogram: &Spectrogram, flags: &mut [Vec<bool>], gauss: &mut GaussianCache) {
    let num_rows = spectrogram.num_bins();
    let num_cols = spectrogram.num_frames();

    let mut last_col = vec![0.0f32; num_rows];
    spectrogram.column_into(num_cols - 1, &mut last_col);
    let mut thresh = spread_from_vector(&last_col, gauss);

    let mut col_peaks: Vec<BinVal> = Vec::new();

    for col in (0..num_cols).rev() {
        col_peaks.clear();
        for bin in 0..num_rows {
            if flags[bin][col] {
                col_peaks.push(BinVal {
                    bin,
                    val: spectrogram.value(bin, col),
                });
            }
        }

        col_peaks.sort_by(by_magnitude_desc);

        for peak in &col_peaks {
            if peak.val > thresh[peak.bin] {
                spread_peak(&mut thresh, gauss, peak.bin, peak.val);
                // A peak dominating this column supersedes a weaker flag
                // one column to its right.
                if col + 1 < num_cols {
                    flags[peak.bin][col + 1] = false;
                }
            } else {
                flags[peak.bin][col] = false;
            }
        }

        fade(&mut thresh, DECAY_COEFF);
    }
}

/// Local maxima along a vector. Endpoints compare against their single
/// neighbour; an interior point must be at least as large as both. Equal
/// neighbours (plateaus) count on both sides.
pub fn loc_max(vec: &[f32]) -> Vec<bool> {
    let l = vec.len();
    if l == 0 {
        return Vec::new();
    }
    if l == 1 {
        return vec![true];
    }

    let mut maxima = vec![false; l];
    maxima[0] = vec[0] >= vec[1];
    maxima[l - 1] = vec[l - 1] >= vec[l - 2];
    for i in 1..l - 1 {
        maxima[i] = vec[i - 1] <= vec[i] && vec[i] >= vec[i + 1];
    }

    maxima
}

/// Raise `thresh` by element-wise max against a Gaussian bump of height
/// `val` centered on `bin`.
fn spread_peak(thresh: &mut [f32], gauss: &mut GaussianCache, bin: usize, val: f32) {
    let n = thresh.len();
    let table = gauss.make(n, GAUSSIAN_WIDTH);
    for (i, slot) in thresh.iter_mut().enumerate() {
        let bump = val * table[i + n - bin] as f32;
        if *slot < bump {
            *slot = bump;
        }
    }
}

/// Build a fresh envelope from the local maxima of `vec`, each spread as a
/// Gaussian bump over a zero base.
fn spread_from_vector(vec: &[f32], gauss: &mut GaussianCache) -> Vec<f32> {
    let mut thresh = vec![0.0f32; vec.len()];
    for (bin, &is_max) in loc_max(vec).iter().enumerate() {
        if is_max {
            spread_peak(&mut thresh, gauss, bin, vec[bin]);
        }
    }
    thresh
}

fn fade(thresh: &mut [f32], coeff: f32) {
    for slot in thresh.iter_mut() {
        *slot *= coeff;
    }
}

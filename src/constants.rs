/// Normative constants of the fingerprint format. The hash bit layout and
/// the STFT geometry are co-designed: widening any field width changes the
/// matching tolerances, so these move together or not at all.

// ── PCM / STFT geometry ──

/// Target PCM rate (Hz). Sources must deliver mono audio at this rate.
pub const SAMPLE_RATE: u32 = 11025;

/// STFT window size: 2^(BIN_BITS + 1) so that the kept half-spectrum fits
/// the bin field of the hash.
pub const FFT_WIN_SIZE: usize = 1 << (BIN_BITS + 1);

/// Overlap between adjacent STFT windows.
pub const FFT_OVERLAP: usize = FFT_WIN_SIZE / 2;

/// Rows kept in the spectrogram (DC up to, excluding, Nyquist).
pub const FFT_HALF_WIN_SIZE: usize = FFT_WIN_SIZE / 2;

// ── Hash field widths ──

pub const BIN_BITS: u32 = 10;
pub const BIN_DIFF_BITS: u32 = 6; // signed; do not widen
pub const TIME_DIFF_BITS: u32 = 6;

pub const BIN_MASK: u32 = (1 << BIN_BITS) - 1;
pub const BIN_DIFF_MASK: u32 = (1 << BIN_DIFF_BITS) - 1;
pub const TIME_DIFF_MASK: u32 = (1 << TIME_DIFF_BITS) - 1;

// ── Peak picking ──

/// Width of the Gaussian bump an accepted peak spreads into the threshold
/// envelope (in bins).
pub const GAUSSIAN_WIDTH: f64 = 30.0;

/// Top-N cap on peaks retained per STFT frame.
pub const MAX_PEAKS_PER_FRAME: usize = 6;

/// Per-column decay applied to the threshold envelope.
pub const DECAY_COEFF: f32 = 0.98;

// ── Peak pairing ──

/// Pair budget per anchor peak.
pub const MAX_PAIRS_PER_PEAK: usize = 2;

/// Bin-delta lookahead cap. Half of BIN_DIFF_MASK: the top bit of the
/// bin-diff field carries the sign.
pub const LOOKAHEAD_BIN_DIFF_MAX: u32 = BIN_DIFF_MASK >> 1;

/// Time lookahead window for pairing, in frames.
pub const LOOKAHEAD_TIME_DIFF_MIN: u32 = 3;
pub const LOOKAHEAD_TIME_DIFF_MAX: u32 = TIME_DIFF_MASK;

// ── Matching ──

/// Minimum hash matches landing on one offset bucket before that offset is
/// considered at all.
pub const MIN_ALLOWED_CNT: i32 = 5;

/// Cap on a plausible alignment offset between two tracks (ms).
pub const MAX_TRACK_OFFSET_MS: u32 = 10 * 60 * 1000;

/// Spectrogram columns per second of audio.
pub fn frames_per_sec() -> f64 {
    SAMPLE_RATE as f64 / FFT_OVERLAP as f64
}

pub mod audio;
pub mod constants;
pub mod error;
pub mod gaussian;
pub mod hash;
pub mod matcher;
pub mod peaks;
pub mod spectrogram;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use error::EarprintError;
pub use gaussian::GaussianCache;
pub use hash::{find_hashes, pairs_to_hashes, peaks_to_pairs, Hash, PeakPair};
pub use matcher::{MatchResult, Matcher};
pub use peaks::{find_peaks, Peak};
pub use spectrogram::{build_spectrogram, Spectrogram};

use std::fmt;

/// Errors that can occur while fingerprinting a track.
///
/// The matcher never fails; an uninformative comparison is reported as a
/// zero score instead.
#[derive(Debug, Clone, PartialEq)]
pub enum EarprintError {
    /// A PCM source was opened with unsupported parameters (sample rate
    /// must be a positive multiple of 11025 Hz, integer depth must be 16).
    InvalidParams(String),
    /// The spectrogram's maximum magnitude fell below the silence floor;
    /// the track cannot be fingerprinted.
    ZeroSignal,
    /// The PCM source failed to decode. Opaque to the core.
    Decode(String),
}

impl fmt::Display for EarprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarprintError::InvalidParams(msg) => write!(f, "Invalid source params: {}", msg),
            EarprintError::ZeroSignal => write!(f, "Zero signal: no energy above silence floor"),
            EarprintError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for EarprintError {}

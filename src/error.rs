use thiserror::Error;

/// Errors surfaced by the analysis core.
///
/// Numeric edge cases (silence, empty ranges, zero averages) never produce an
/// error; they resolve to documented fallback values inside each analysis.
/// Only structurally invalid input, decoder failures and configuration
/// problems make it out as an `AnalysisError`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Snapshot or buffer is missing or malformed (no channels, zero sample rate).
    #[error("bad input: {0}")]
    BadInput(String),

    /// The decoder could not produce PCM from the source.
    #[error("decode error: {0}")]
    Decode(String),

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Audio device unavailable or stream failure.
    #[cfg(feature = "device")]
    #[error("audio device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

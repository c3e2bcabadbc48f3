//! Error types for configuration, WAV parsing, and file sinks.

use thiserror::Error;

/// Top-level error for everything outside the render loop itself.
#[derive(Debug, Error)]
pub enum StarterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("WAV parse error: {0}")]
    Wav(#[from] WavError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV write error: {0}")]
    Encode(#[from] hound::Error),
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A `RenderConfig` that cannot produce a valid render.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },
    #[error("sample rate {sample_rate} Hz x {duration} s rounds to zero samples")]
    EmptyRender { sample_rate: u32, duration: f64 },
    #[error("render of {samples} samples exceeds the {max} sample limit")]
    TooLong { samples: f64, max: u64 },
}

/// Failure kinds when reading a RIFF/WAVE container.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WavError {
    #[error("missing '{expected}' marker")]
    BadMagic { expected: &'static str },
    #[error("missing required '{0}' chunk")]
    MissingChunk(&'static str),
    #[error("unsupported sample encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("invalid format chunk: {0}")]
    InvalidFormat(String),
    /// Input ended before a complete header and `data` chunk.
    #[error("file truncated before the sample data")]
    Truncated,
}

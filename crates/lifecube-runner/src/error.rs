//! Error types for the headless runner.
//!
//! [`RunnerError`] wraps every failure mode of a run so the frame loop can
//! propagate with `?`.

use lifecube_core::{ConfigError, EngineError};

/// Top-level error for the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The engine rejected its configuration or a coordinate.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: EngineError,
    },

    /// A frame could not be encoded.
    #[error("frame encoding error: {source}")]
    Encode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A frame could not be written.
    #[error("frame output error: {source}")]
    Output {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

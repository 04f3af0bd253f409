//! Error types for the `lifecube-core` crate.
//!
//! The automaton itself has no recoverable runtime failures: every random
//! draw and every transition is total. The only errors are programmer errors
//! (a coordinate outside the lattice) and construction-time validation
//! failures, both surfaced through [`EngineError`].

use crate::lattice::Coordinate;

/// Errors that can occur when building or addressing the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A coordinate lies outside `[0, size)` on at least one axis.
    #[error("coordinate {coord} is outside the {size}x{size}x{size} lattice")]
    OutOfBounds {
        /// The offending coordinate.
        coord: Coordinate,
        /// Edge length of the lattice.
        size: u16,
    },

    /// The engine configuration was rejected at construction.
    #[error("invalid engine configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl EngineError {
    /// Shorthand for building an [`EngineError::InvalidConfig`].
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

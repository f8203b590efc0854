//! Error types for the forecast core.
//!
//! Runtime outcomes that the simulator handles locally (unroutable paths,
//! failed placements, frame caps) are *not* errors; see the board and
//! simulation modules. Errors here cover the configuration boundary and
//! API misuse only.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the forecast core.
#[derive(Debug, Error)]
pub enum SimError {
    /// Failed to parse a game-rules document.
    #[error("Failed to parse game rules: {message}")]
    RulesParse {
        /// Error message from the underlying parser.
        message: String,
    },

    /// A rules document carried a value the simulator cannot run with.
    #[error("Invalid game rules: {0}")]
    InvalidRules(String),
}

//! Error taxonomy shared by every streaming adapter.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Failures surfaced by the streaming adapters.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The blocking wait for the next element was cancelled.
    #[error("interrupted while waiting for the next element")]
    Interrupted,
    /// A raw record could not be decoded into the requested type.
    #[error("failed to decode record into {target}: {source}")]
    Conversion {
        /// Type the record was being decoded into.
        target: &'static str,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// Transport or cursor failure reported by the data-store collaborator.
    #[error("cursor error: {0}")]
    Resource(String),
    /// A pull was attempted on a sequence in a terminal state.
    #[error("illegal state: sequence already {0}")]
    IllegalState(&'static str),
}

impl StreamError {
    /// True for decode failures, in either isolation policy.
    pub fn is_conversion(&self) -> bool {
        matches!(self, StreamError::Conversion { .. })
    }
}

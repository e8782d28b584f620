//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Sampling failures ([`AuxReplayError::InsufficientHistory`] and
/// [`AuxReplayError::SequencePairNotFound`]) are recoverable: the caller
/// skips or retries its training step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuxReplayError {
    /// The buffer does not hold enough frames for the request.
    #[error("Insufficient history: {needed} frames needed, {held} held")]
    InsufficientHistory {
        /// Minimum number of frames the request needs.
        needed: usize,

        /// Number of frames currently held.
        held: usize,
    },

    /// No terminal-free second window was found for a back-to-back pair.
    #[error("Sequence pair not found after {attempts} attempts")]
    SequencePairNotFound {
        /// Number of attempts made before giving up.
        attempts: usize,
    },

    /// A sequence of zero frames was requested.
    #[error("Requested sequence length must be positive")]
    ZeroLength,

    /// An action index is outside of the action space.
    #[error("Action {action} is out of range for action size {action_size}")]
    ActionOutOfRange {
        /// The offending action.
        action: usize,

        /// Size of the action space.
        action_size: usize,
    },

    /// The replay buffer was configured with an unusable capacity.
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(usize),

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Arrays given together have incompatible shapes or lengths.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A batch was requested from an empty sequence of frames.
    #[error("Empty sequence of frames")]
    EmptySequence,
}

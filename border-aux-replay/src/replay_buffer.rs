//! Replay buffer of experience frames for auxiliary objectives.
//!
//! [`AuxReplayBuffer`] keeps the most recent frames in a fixed-capacity ring
//! and indexes them by reward class. It offers four ways to draw frames:
//!
//! * [`sample_sequence`](AuxReplayBuffer::sample_sequence) - a contiguous
//!   window ending early at an episode boundary (value replay, pixel control),
//! * [`sample_back_to_back`](AuxReplayBuffer::sample_back_to_back) - two
//!   equal-length windows far apart in time or in different episodes,
//! * [`sample_back_to_back_with_retry`](AuxReplayBuffer::sample_back_to_back_with_retry) -
//!   the same with a bounded number of redraws,
//! * [`sample_reward_prediction_quad`](AuxReplayBuffer::sample_reward_prediction_quad) -
//!   four frames ending at a reward-balanced endpoint.
mod base;
mod config;
mod sample;
pub use base::AuxReplayBuffer;
pub use config::AuxReplayBufferConfig;

use anyhow::Result;

/// Interface for buffers that store experiences from environments.
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

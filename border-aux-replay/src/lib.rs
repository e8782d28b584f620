#![warn(missing_docs)]
//! Experience replay for the auxiliary objectives of UNREAL-style agents.
//!
//! An online actor-critic agent can be trained with self-supervised
//! auxiliary objectives computed on replayed experience: value replay, pixel
//! control and reward prediction. This crate provides the replay side of
//! these objectives:
//!
//! * [`ExperienceFrame`] records one transition with the metadata the
//!   objectives need.
//! * [`AuxReplayBuffer`] holds the most recent frames and samples contiguous
//!   sequences, back-to-back sequence pairs and reward-balanced quads.
//! * [`FrameProcessor`] converts rollouts of an actor into frames.
//! * [`calc_pixel_change`](pixel_change::calc_pixel_change) computes the pixel
//!   change maps stored in frames.
//! * [`aux_batch`] turns sampled frames into batches with discounted targets.
//!
//! ```rust
//! use border_aux_replay::{AuxReplayBuffer, AuxReplayBufferConfig, ExperienceFrame, RecurrentState};
//! use ndarray::{Array2, Array3};
//!
//! let config = AuxReplayBufferConfig::default().capacity(100);
//! let mut buffer = AuxReplayBuffer::build(&config).unwrap();
//! for i in 0..50 {
//!     let reward = if i % 10 == 0 { 1.0 } else { 0.0 };
//!     buffer.add_frame(ExperienceFrame::new(
//!         Array3::zeros((84, 84, 3)),
//!         0,
//!         reward,
//!         false,
//!         RecurrentState::zeros(256),
//!         Array2::zeros((20, 20)),
//!         0,
//!         0.0,
//!     ));
//! }
//!
//! let seq = buffer.sample_sequence(21).unwrap();
//! assert_eq!(seq.len(), 21);
//! let quad = buffer.sample_reward_prediction_quad().unwrap();
//! assert_eq!(quad.len(), 4);
//! ```
pub mod aux_batch;
pub mod error;
mod frame;
pub mod pixel_change;
pub mod replay_buffer;
mod step_proc;

pub use error::AuxReplayError;
pub use frame::{concat_action_and_reward, one_hot_action, ExperienceFrame, RecurrentState};
pub use replay_buffer::{AuxReplayBuffer, AuxReplayBufferConfig, ExperienceBufferBase};
pub use step_proc::{FrameProcessor, Rollout};

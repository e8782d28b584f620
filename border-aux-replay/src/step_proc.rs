//! Conversion of rollouts into experience frames.
//!
//! [`FrameProcessor`] turns the per-step arrays of a rollout into
//! [`ExperienceFrame`]s and pushes them into a buffer. It tracks the action
//! and reward of the previous step across rollouts, so that each frame carries
//! the `last_action` and `last_reward` its state was reached with.
use crate::{
    error::AuxReplayError, replay_buffer::ExperienceBufferBase, ExperienceFrame, RecurrentState,
};
use anyhow::Result;
use log::trace;
use ndarray::{Array2, Array3};

/// Steps collected by an actor, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Rollout {
    /// Preprocessed observations.
    pub states: Vec<Array3<f32>>,

    /// Actions taken to reach each state.
    pub actions: Vec<usize>,

    /// Rewards received on reaching each state.
    pub rewards: Vec<f32>,

    /// Pixel change maps of the transitions into each state.
    pub pixel_changes: Vec<Array2<f32>>,

    /// Recurrent states of the policy before each step.
    pub recurrent_states: Vec<RecurrentState>,

    /// Whether the last step of the rollout ended the episode.
    pub terminal: bool,
}

impl Rollout {
    /// Returns the number of steps in the rollout.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the rollout has no step.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Appends the steps of `other`, taking over its terminal flag.
    pub fn extend(&mut self, other: Rollout) {
        self.states.extend(other.states);
        self.actions.extend(other.actions);
        self.rewards.extend(other.rewards);
        self.pixel_changes.extend(other.pixel_changes);
        self.recurrent_states.extend(other.recurrent_states);
        self.terminal = other.terminal;
    }

    fn check_lengths(&self) -> Result<(), AuxReplayError> {
        let n = self.states.len();
        let lens = [
            ("actions", self.actions.len()),
            ("rewards", self.rewards.len()),
            ("pixel_changes", self.pixel_changes.len()),
            ("recurrent_states", self.recurrent_states.len()),
        ];
        for (name, len) in lens.iter() {
            if *len != n {
                return Err(AuxReplayError::ShapeMismatch(format!(
                    "rollout has {} states but {} {}",
                    n, len, name
                )));
            }
        }
        Ok(())
    }
}

/// Converts rollouts into [`ExperienceFrame`]s.
#[derive(Debug, Clone, Default)]
pub struct FrameProcessor {
    last_action: usize,
    last_reward: f32,
    episode_reward: f32,
}

impl FrameProcessor {
    /// Creates a processor at the start of an episode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Action of the most recently processed step.
    pub fn last_action(&self) -> usize {
        self.last_action
    }

    /// Reward of the most recently processed step.
    pub fn last_reward(&self) -> f32 {
        self.last_reward
    }

    /// Sum of rewards of the current episode so far.
    pub fn episode_reward(&self) -> f32 {
        self.episode_reward
    }

    /// Pushes the steps of `rollout` into `buffer`.
    ///
    /// Only the last step of a terminal rollout is marked terminal.
    ///
    /// # Arguments
    ///
    /// * `rollout` - Steps to push, oldest first
    /// * `buffer` - Buffer receiving one [`ExperienceFrame`] per step
    ///
    /// # Returns
    ///
    /// The total reward of the episode if the rollout ended it, in which case
    /// the processor is reset for the next episode, `None` otherwise. Fails
    /// with [`AuxReplayError::ShapeMismatch`] before pushing anything if the
    /// per-step vectors of `rollout` differ in length.
    pub fn process<B>(&mut self, rollout: Rollout, buffer: &mut B) -> Result<Option<f32>>
    where
        B: ExperienceBufferBase<Item = ExperienceFrame>,
    {
        rollout.check_lengths()?;

        let n = rollout.len();
        let is_terminal = rollout.terminal;
        let steps = rollout
            .states
            .into_iter()
            .zip(rollout.actions)
            .zip(rollout.rewards)
            .zip(rollout.pixel_changes)
            .zip(rollout.recurrent_states);

        for (k, ((((state, action), reward), pixel_change), recurrent_state)) in steps.enumerate()
        {
            let terminal = is_terminal && k + 1 == n;
            let frame = ExperienceFrame::new(
                state,
                action,
                reward,
                terminal,
                recurrent_state,
                pixel_change,
                self.last_action,
                self.last_reward,
            );
            buffer.push(frame)?;

            self.episode_reward += reward;
            self.last_action = action;
            self.last_reward = reward;
        }
        trace!("Pushed {} frames, terminal = {}", n, is_terminal);

        if is_terminal && n > 0 {
            let total = self.episode_reward;
            *self = Self::default();
            Ok(Some(total))
        } else {
            Ok(None)
        }
    }
}

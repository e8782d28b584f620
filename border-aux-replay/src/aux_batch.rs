//! Batches of the auxiliary objectives built from sampled frames.
//!
//! * [`PixelControlBatch`] - discounted pixel change returns over a sequence
//!   from [`sample_sequence`](crate::AuxReplayBuffer::sample_sequence).
//! * [`ValueReplayBatch`] - discounted reward returns over such a sequence.
//! * [`RewardPredictionBatch`] - three states and the reward class of the
//!   frame following them, from
//!   [`sample_reward_prediction_quad`](crate::AuxReplayBuffer::sample_reward_prediction_quad).
//!
//! Returns are bootstrapped from the last frame of a sequence unless it is
//! terminal. The model evaluations this needs are supplied through
//! [`AuxBootstrap`].
use crate::{error::AuxReplayError, frame::one_hot_action, ExperienceFrame};
use ndarray::{Array1, Array2, Array3};

/// Model evaluations used to bootstrap auxiliary returns.
pub trait AuxBootstrap {
    /// Maximum over actions of the pixel control Q-values at `state`.
    fn pixel_control_q_max(
        &mut self,
        state: &Array3<f32>,
        last_action_reward: &Array1<f32>,
    ) -> Array2<f32>;

    /// State value at `state`.
    fn value(&mut self, state: &Array3<f32>, last_action_reward: &Array1<f32>) -> f32;
}

/// Batch of the pixel control objective, oldest step first.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelControlBatch {
    /// States.
    pub states: Vec<Array3<f32>>,

    /// One-hot last action followed by last reward.
    pub last_action_rewards: Vec<Array1<f32>>,

    /// One-hot actions.
    pub actions: Vec<Array1<f32>>,

    /// Discounted pixel change returns.
    pub returns: Vec<Array2<f32>>,
}

impl PixelControlBatch {
    /// Builds a batch from a sequence of frames.
    ///
    /// The last frame is only used to bootstrap the returns, so the batch has
    /// one step less than `frames`.
    ///
    /// # Arguments
    ///
    /// * `frames` - Sequence from [`sample_sequence`](crate::AuxReplayBuffer::sample_sequence)
    /// * `gamma_pc` - Discount factor of pixel change returns
    /// * `action_size` - Number of actions, for the one-hot encodings
    /// * `bootstrap` - Model evaluated at the last frame unless it is terminal
    ///
    /// # Returns
    ///
    /// [`AuxReplayError::EmptySequence`] if `frames` is empty and
    /// [`AuxReplayError::ActionOutOfRange`] if an action does not fit
    /// `action_size`.
    pub fn from_frames<B: AuxBootstrap>(
        frames: &[&ExperienceFrame],
        gamma_pc: f32,
        action_size: usize,
        bootstrap: &mut B,
    ) -> Result<Self, AuxReplayError> {
        let (last, rest) = frames.split_last().ok_or(AuxReplayError::EmptySequence)?;

        let mut r = if last.is_terminal() {
            Array2::zeros(last.pixel_change().raw_dim())
        } else {
            let lar = last.encode_last_action_reward(action_size)?;
            bootstrap.pixel_control_q_max(last.state(), &lar)
        };

        let n = rest.len();
        let mut batch = Self {
            states: Vec::with_capacity(n),
            last_action_rewards: Vec::with_capacity(n),
            actions: Vec::with_capacity(n),
            returns: Vec::with_capacity(n),
        };
        for frame in rest.iter().rev() {
            r = frame.pixel_change() + &(r * gamma_pc);
            batch.states.push(frame.state().clone());
            batch.actions.push(one_hot_action(frame.action(), action_size)?);
            batch
                .last_action_rewards
                .push(frame.encode_last_action_reward(action_size)?);
            batch.returns.push(r.clone());
        }
        batch.reverse();

        Ok(batch)
    }

    /// Returns the number of steps in the batch.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the batch has no step.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn reverse(&mut self) {
        self.states.reverse();
        self.last_action_rewards.reverse();
        self.actions.reverse();
        self.returns.reverse();
    }
}

/// Batch of the value replay objective, oldest step first.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueReplayBatch {
    /// States.
    pub states: Vec<Array3<f32>>,

    /// One-hot last action followed by last reward.
    pub last_action_rewards: Vec<Array1<f32>>,

    /// Discounted returns.
    pub returns: Vec<f32>,
}

impl ValueReplayBatch {
    /// Builds a batch from a sequence of frames.
    ///
    /// The last frame is only used to bootstrap the returns.
    pub fn from_frames<B: AuxBootstrap>(
        frames: &[&ExperienceFrame],
        gamma: f32,
        action_size: usize,
        bootstrap: &mut B,
    ) -> Result<Self, AuxReplayError> {
        let (last, rest) = frames.split_last().ok_or(AuxReplayError::EmptySequence)?;

        let mut r = if last.is_terminal() {
            0.0
        } else {
            let lar = last.encode_last_action_reward(action_size)?;
            bootstrap.value(last.state(), &lar)
        };

        let mut states = Vec::with_capacity(rest.len());
        let mut last_action_rewards = Vec::with_capacity(rest.len());
        let mut returns = Vec::with_capacity(rest.len());
        for frame in rest.iter().rev() {
            r = frame.reward() + gamma * r;
            states.push(frame.state().clone());
            last_action_rewards.push(frame.encode_last_action_reward(action_size)?);
            returns.push(r);
        }
        states.reverse();
        last_action_rewards.reverse();
        returns.reverse();

        Ok(Self {
            states,
            last_action_rewards,
            returns,
        })
    }

    /// Returns the number of steps in the batch.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the batch has no step.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Sign of a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardClass {
    /// Exactly zero.
    Zero,

    /// Strictly positive.
    Positive,

    /// Strictly negative.
    Negative,
}

impl RewardClass {
    /// Classifies a reward.
    pub fn from_reward(reward: f32) -> Self {
        if reward == 0.0 {
            Self::Zero
        } else if reward > 0.0 {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    /// One-hot vector in the order zero, positive, negative.
    pub fn one_hot(&self) -> [f32; 3] {
        match self {
            Self::Zero => [1.0, 0.0, 0.0],
            Self::Positive => [0.0, 1.0, 0.0],
            Self::Negative => [0.0, 0.0, 1.0],
        }
    }
}

/// Batch of the reward prediction objective.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardPredictionBatch {
    /// States of the three frames preceding the predicted reward.
    pub states: Vec<Array3<f32>>,

    /// Class of the reward received after them.
    pub target: RewardClass,
}

impl RewardPredictionBatch {
    /// Builds a batch from frames ending at the frame whose reward is
    /// predicted. All frames but the last are inputs.
    pub fn from_frames(frames: &[&ExperienceFrame]) -> Result<Self, AuxReplayError> {
        let (last, rest) = frames.split_last().ok_or(AuxReplayError::EmptySequence)?;
        Ok(Self {
            states: rest.iter().map(|f| f.state().clone()).collect(),
            target: RewardClass::from_reward(last.reward()),
        })
    }
}

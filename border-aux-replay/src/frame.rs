//! Experience frame stored in the replay buffer.
//!
//! A frame records one environment transition together with the metadata the
//! auxiliary objectives need. Frames are immutable once constructed; the
//! replay buffer relies on `reward` and `terminal` never changing after
//! insertion.
use crate::error::AuxReplayError;
use ndarray::{Array1, Array2, Array3};

/// Memory of a recurrent policy, passed through frames uninterpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentState {
    /// Cell state.
    pub c: Array1<f32>,

    /// Hidden state.
    pub h: Array1<f32>,
}

impl RecurrentState {
    /// Creates a recurrent state from its cell and hidden parts.
    pub fn new(c: Array1<f32>, h: Array1<f32>) -> Self {
        Self { c, h }
    }

    /// Returns a zero-filled state with `dim` units in each part.
    pub fn zeros(dim: usize) -> Self {
        Self {
            c: Array1::zeros(dim),
            h: Array1::zeros(dim),
        }
    }
}

/// One environment transition and its auxiliary metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceFrame {
    state: Array3<f32>,
    action: usize,
    reward: f32,
    terminal: bool,
    recurrent_state: RecurrentState,
    pixel_change: Array2<f32>,
    last_action: usize,
    last_reward: f32,
}

impl ExperienceFrame {
    /// Creates a frame.
    ///
    /// * `state` - Preprocessed observation, `(height, width, channels)`.
    /// * `action` - Action taken to reach `state`.
    /// * `reward` - Reward received on reaching `state`.
    /// * `terminal` - Whether the episode ended on reaching `state`.
    /// * `recurrent_state` - Policy memory immediately before this step.
    /// * `pixel_change` - Spatial map of the visual change into `state`.
    /// * `last_action` - Action of the previous transition.
    /// * `last_reward` - Reward of the previous transition.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: Array3<f32>,
        action: usize,
        reward: f32,
        terminal: bool,
        recurrent_state: RecurrentState,
        pixel_change: Array2<f32>,
        last_action: usize,
        last_reward: f32,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            terminal,
            recurrent_state,
            pixel_change,
            last_action,
            last_reward,
        }
    }

    /// Preprocessed observation.
    pub fn state(&self) -> &Array3<f32> {
        &self.state
    }

    /// Action taken to reach this state.
    pub fn action(&self) -> usize {
        self.action
    }

    /// Reward received on reaching this state.
    pub fn reward(&self) -> f32 {
        self.reward
    }

    /// Whether the episode ended on reaching this state.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Policy memory immediately before this step.
    pub fn recurrent_state(&self) -> &RecurrentState {
        &self.recurrent_state
    }

    /// Pixel change map of the transition into this state.
    pub fn pixel_change(&self) -> &Array2<f32> {
        &self.pixel_change
    }

    /// Action of the previous transition.
    pub fn last_action(&self) -> usize {
        self.last_action
    }

    /// Reward of the previous transition.
    pub fn last_reward(&self) -> f32 {
        self.last_reward
    }

    /// Returns the one-hot last action followed by the last reward.
    ///
    /// The returned vector has `action_size + 1` elements. This is the
    /// action-reward conditioning input of every auxiliary objective.
    pub fn encode_last_action_reward(
        &self,
        action_size: usize,
    ) -> Result<Array1<f32>, AuxReplayError> {
        concat_action_and_reward(self.last_action, action_size, self.last_reward)
    }
}

/// Returns a one-hot vector of `action` with `action_size` elements.
pub fn one_hot_action(action: usize, action_size: usize) -> Result<Array1<f32>, AuxReplayError> {
    if action >= action_size {
        return Err(AuxReplayError::ActionOutOfRange {
            action,
            action_size,
        });
    }
    let mut v = Array1::zeros(action_size);
    v[action] = 1.0;
    Ok(v)
}

/// Returns a one-hot vector of `action` with `reward` appended.
///
/// # Arguments
///
/// * `action` - Index of the hot element
/// * `action_size` - Number of actions
/// * `reward` - Value of the last element
///
/// # Returns
///
/// A vector of `action_size + 1` elements, or
/// [`AuxReplayError::ActionOutOfRange`] if `action >= action_size`.
pub fn concat_action_and_reward(
    action: usize,
    action_size: usize,
    reward: f32,
) -> Result<Array1<f32>, AuxReplayError> {
    let mut v = one_hot_action(action, action_size)?.to_vec();
    v.push(reward);
    Ok(Array1::from(v))
}

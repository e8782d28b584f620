//! Ring storage and insertion of [`AuxReplayBuffer`].
use super::{AuxReplayBufferConfig, ExperienceBufferBase};
use crate::{error::AuxReplayError, ExperienceFrame};
use anyhow::Result;
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;

/// Number of frames that must precede a frame for it to be used as the
/// endpoint of a reward prediction quad.
pub(super) const REWARD_HISTORY: usize = 3;

/// Replay buffer of [`ExperienceFrame`]s with reward-stratified indices.
///
/// Frames are held oldest first in a ring of fixed capacity. Each frame has a
/// global index, `base_index + position`, which is stable while the frame is
/// held. Two queues keep the global indices of frames with zero and non-zero
/// reward; frames with fewer than three predecessors are never indexed.
///
/// The buffer is meant to be owned by a single training worker. Every
/// operation, sampling included, takes `&mut self` and the sampled frames
/// borrow the buffer, so sharing it between threads requires an external
/// lock.
///
/// # Type Parameters
///
/// * `R` - Random number generator used for sampling.
pub struct AuxReplayBuffer<R = StdRng> {
    /// Maximum number of frames.
    pub(super) capacity: usize,

    /// Physical slot of the oldest frame.
    pub(super) head: usize,

    /// Number of frames held.
    pub(super) size: usize,

    /// Global index of the oldest frame.
    pub(super) base_index: usize,

    /// Ring storage. Grows up to `capacity`, then slots are overwritten.
    pub(super) frames: Vec<ExperienceFrame>,

    /// Global indices of frames with zero reward.
    pub(super) zero_reward_indices: VecDeque<usize>,

    /// Global indices of frames with non-zero reward.
    pub(super) nonzero_reward_indices: VecDeque<usize>,

    /// Gap between the sequences of a back-to-back pair.
    pub(super) pair_gap: usize,

    /// Attempts to place the second sequence of a pair.
    pub(super) pair_attempts: usize,

    /// Whole draws made by the retrying pair sampler.
    pub(super) max_pair_draws: usize,

    pub(super) rng: R,
}

impl AuxReplayBuffer<StdRng> {
    /// Builds a replay buffer whose generator is seeded with `config.seed`.
    pub fn build(config: &AuxReplayBufferConfig) -> Result<Self, AuxReplayError> {
        Self::with_rng(config, StdRng::seed_from_u64(config.seed))
    }
}

impl<R: Rng> AuxReplayBuffer<R> {
    /// Builds a replay buffer sampling with the given generator.
    ///
    /// `config.seed` is ignored.
    ///
    /// # Arguments
    ///
    /// * `config` - Capacity and back-to-back sampling parameters
    /// * `rng` - Generator used by every sampling operation
    ///
    /// # Errors
    ///
    /// [`AuxReplayError::InvalidCapacity`] if `capacity` is zero, and
    /// [`AuxReplayError::InvalidConfig`] if `pair_gap`, `pair_attempts` or
    /// `max_pair_draws` is zero.
    pub fn with_rng(config: &AuxReplayBufferConfig, rng: R) -> Result<Self, AuxReplayError> {
        if config.capacity == 0 {
            return Err(AuxReplayError::InvalidCapacity(config.capacity));
        }
        let counts = [
            ("pair_gap", config.pair_gap),
            ("pair_attempts", config.pair_attempts),
            ("max_pair_draws", config.max_pair_draws),
        ];
        for (name, value) in counts.iter() {
            if *value == 0 {
                return Err(AuxReplayError::InvalidConfig(format!(
                    "{} must be positive",
                    name
                )));
            }
        }

        Ok(Self {
            capacity: config.capacity,
            head: 0,
            size: 0,
            base_index: 0,
            frames: Vec::with_capacity(config.capacity),
            zero_reward_indices: VecDeque::new(),
            nonzero_reward_indices: VecDeque::new(),
            pair_gap: config.pair_gap,
            pair_attempts: config.pair_attempts,
            max_pair_draws: config.max_pair_draws,
            rng,
        })
    }

    /// Adds a frame, evicting the oldest one if the buffer is full.
    ///
    /// A terminal frame following a terminal frame is discarded, so that no
    /// two adjacent frames are terminal.
    pub fn add_frame(&mut self, frame: ExperienceFrame) {
        if frame.is_terminal() && self.last().map_or(false, |f| f.is_terminal()) {
            info!("Terminal frames continued, discarded");
            return;
        }

        let frame_index = self.base_index + self.size;
        let was_full = self.is_full();

        if frame_index >= REWARD_HISTORY {
            if frame.reward() == 0.0 {
                self.zero_reward_indices.push_back(frame_index);
            } else {
                self.nonzero_reward_indices.push_back(frame_index);
            }
        }

        if was_full {
            self.frames[self.head] = frame;
            self.head = (self.head + 1) % self.capacity;
            self.base_index += 1;

            let cut_frame_index = self.base_index + REWARD_HISTORY;
            trim_front(&mut self.zero_reward_indices, cut_frame_index);
            trim_front(&mut self.nonzero_reward_indices, cut_frame_index);
        } else {
            self.frames.push(frame);
            self.size += 1;
        }
    }

    /// Returns the number of frames held.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if no frame is held.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns `true` if the next insertion evicts a frame.
    pub fn is_full(&self) -> bool {
        self.size >= self.capacity
    }

    /// Maximum number of frames held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Global index of the oldest frame held.
    pub fn base_index(&self) -> usize {
        self.base_index
    }

    /// Global indices of held frames with zero reward, oldest first.
    pub fn zero_reward_indices(&self) -> &VecDeque<usize> {
        &self.zero_reward_indices
    }

    /// Global indices of held frames with non-zero reward, oldest first.
    pub fn nonzero_reward_indices(&self) -> &VecDeque<usize> {
        &self.nonzero_reward_indices
    }

    /// Returns the frame at `pos` frames from the oldest one.
    pub fn get(&self, pos: usize) -> Option<&ExperienceFrame> {
        if pos < self.size {
            Some(&self.frames[self.physical(pos)])
        } else {
            None
        }
    }

    /// Returns the frame with global index `index`, if still held.
    pub fn get_global(&self, index: usize) -> Option<&ExperienceFrame> {
        index
            .checked_sub(self.base_index)
            .and_then(|pos| self.get(pos))
    }

    /// Returns the most recently added frame.
    pub fn last(&self) -> Option<&ExperienceFrame> {
        self.size.checked_sub(1).and_then(|pos| self.get(pos))
    }

    /// Iterates over the held frames, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ExperienceFrame> + '_ {
        (0..self.size).map(move |pos| &self.frames[self.physical(pos)])
    }

    #[inline]
    fn physical(&self, pos: usize) -> usize {
        (self.head + pos) % self.capacity
    }

    /// Frame at a position already checked to be held.
    #[inline]
    pub(super) fn at(&self, pos: usize) -> &ExperienceFrame {
        &self.frames[self.physical(pos)]
    }
}

/// Removes indices below `cut` from the front of `ixs`.
fn trim_front(ixs: &mut VecDeque<usize>, cut: usize) {
    while ixs.front().map_or(false, |&ix| ix < cut) {
        ixs.pop_front();
    }
}

impl<R: Rng> ExperienceBufferBase for AuxReplayBuffer<R> {
    type Item = ExperienceFrame;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.add_frame(tr);
        Ok(())
    }

    fn len(&self) -> usize {
        self.size
    }
}

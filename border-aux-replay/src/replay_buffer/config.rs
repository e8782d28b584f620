//! Configuration of [`AuxReplayBuffer`](super::AuxReplayBuffer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`AuxReplayBuffer`](super::AuxReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use border_aux_replay::AuxReplayBufferConfig;
///
/// let config = AuxReplayBufferConfig::default()
///     .capacity(2000)
///     .seed(7);
/// assert_eq!(config.capacity, 2000);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct AuxReplayBufferConfig {
    /// Maximum number of frames held. The oldest frame is evicted when a
    /// frame is added to a full buffer.
    pub capacity: usize,

    /// Seed of the random number generator used for sampling.
    pub seed: u64,

    /// Minimum distance in frames between the end of the first sequence of a
    /// back-to-back pair and the point where the search for the second
    /// sequence starts. It is also the length of that search.
    pub pair_gap: usize,

    /// Number of times the second window of a back-to-back pair is moved
    /// past a terminal frame before the draw is given up.
    pub pair_attempts: usize,

    /// Number of whole back-to-back draws made by
    /// [`sample_back_to_back_with_retry`](super::AuxReplayBuffer::sample_back_to_back_with_retry).
    pub max_pair_draws: usize,
}

impl Default for AuxReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 2000,
            seed: 42,
            pair_gap: 100,
            pair_attempts: 10,
            max_pair_draws: 100,
        }
    }
}

impl AuxReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of frames held
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed of the generator built by `AuxReplayBuffer::build`
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the gap between the two sequences of a back-to-back pair.
    ///
    /// # Arguments
    ///
    /// * `pair_gap` - Distance in frames, must be positive
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn pair_gap(mut self, pair_gap: usize) -> Self {
        self.pair_gap = pair_gap;
        self
    }

    /// Sets the number of attempts to place the second sequence of a pair.
    ///
    /// # Arguments
    ///
    /// * `pair_attempts` - Number of attempts, must be positive
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn pair_attempts(mut self, pair_attempts: usize) -> Self {
        self.pair_attempts = pair_attempts;
        self
    }

    /// Sets the number of whole draws made when sampling a pair with retry.
    ///
    /// # Arguments
    ///
    /// * `max_pair_draws` - Number of draws, must be positive
    ///
    /// # Returns
    ///
    /// The modified configuration
    pub fn max_pair_draws(mut self, max_pair_draws: usize) -> Self {
        self.max_pair_draws = max_pair_draws;
        self
    }

    /// Loads the configuration from a YAML file.
    ///
    /// Fields missing in the file take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

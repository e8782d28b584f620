//! Sampling operations of [`AuxReplayBuffer`].
use super::{base::REWARD_HISTORY, AuxReplayBuffer};
use crate::{error::AuxReplayError, ExperienceFrame};
use log::{debug, warn};
use rand::Rng;

/// Positions of the two windows of a back-to-back pair and their length.
struct PairPositions {
    start1: usize,
    start2: usize,
    len: usize,
}

impl<R: Rng> AuxReplayBuffer<R> {
    /// Samples a contiguous sequence of at most `length` frames.
    ///
    /// The sequence never starts at a terminal frame and stops at the first
    /// terminal frame it reaches, which is then its last element. Fails with
    /// [`AuxReplayError::InsufficientHistory`] unless more than `length + 1`
    /// frames are held.
    pub fn sample_sequence(
        &mut self,
        length: usize,
    ) -> Result<Vec<&ExperienceFrame>, AuxReplayError> {
        let (start, len) = self.draw_sequence(length)?;
        Ok(self.frames_in(start, len))
    }

    /// Samples two sequences of equal length far apart from each other.
    ///
    /// The first sequence is drawn as in [`Self::sample_sequence`]. The second
    /// one contains no terminal frame and starts either just after an episode
    /// boundary found within `pair_gap` frames of a point `pair_gap` frames
    /// past the end of the first sequence, or, if there is no boundary there,
    /// `pair_gap - 1` frames past that point.
    ///
    /// Fails with [`AuxReplayError::SequencePairNotFound`] if the second
    /// sequence can not be placed; the caller may draw again.
    pub fn sample_back_to_back(
        &mut self,
        length: usize,
    ) -> Result<(Vec<&ExperienceFrame>, Vec<&ExperienceFrame>), AuxReplayError> {
        let p = self.draw_pair(length)?;
        Ok(self.pair_frames(&p))
    }

    /// Calls [`Self::sample_back_to_back`] until it succeeds, at most
    /// `max_pair_draws` times.
    ///
    /// Only [`AuxReplayError::SequencePairNotFound`] leads to another draw;
    /// other errors are returned immediately.
    pub fn sample_back_to_back_with_retry(
        &mut self,
        length: usize,
    ) -> Result<(Vec<&ExperienceFrame>, Vec<&ExperienceFrame>), AuxReplayError> {
        for draw in 0..self.max_pair_draws {
            match self.draw_pair(length) {
                Ok(p) => return Ok(self.pair_frames(&p)),
                Err(AuxReplayError::SequencePairNotFound { attempts }) => {
                    debug!(
                        "Back-to-back draw {} failed after {} attempts",
                        draw, attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "Back-to-back sampling failed in {} draws, episodes may be too short for the buffer",
            self.max_pair_draws
        );
        Err(AuxReplayError::SequencePairNotFound {
            attempts: self.max_pair_draws,
        })
    }

    /// Samples four contiguous frames for reward prediction.
    ///
    /// The last frame is drawn from the frames with zero or non-zero reward
    /// with equal probability, falling back to the other class when one is
    /// empty. Fails with [`AuxReplayError::InsufficientHistory`] if both are
    /// empty.
    pub fn sample_reward_prediction_quad(
        &mut self,
    ) -> Result<Vec<&ExperienceFrame>, AuxReplayError> {
        let end = self.draw_reward_endpoint()?;
        let start = end - REWARD_HISTORY - self.base_index;
        Ok(self.frames_in(start, REWARD_HISTORY + 1))
    }

    /// Returns the start position and length of a sequence.
    fn draw_sequence(&mut self, length: usize) -> Result<(usize, usize), AuxReplayError> {
        if length == 0 {
            return Err(AuxReplayError::ZeroLength);
        }
        if self.size <= length + 1 {
            return Err(AuxReplayError::InsufficientHistory {
                needed: length + 2,
                held: self.size,
            });
        }

        // The extra frame at the end lets the start move past a terminal
        // frame. No two adjacent frames are terminal.
        let mut start = self.rng.gen_range(0..self.size - length - 1);
        if self.at(start).is_terminal() {
            start += 1;
        }

        let mut len = 0;
        for pos in start..start + length {
            len += 1;
            if self.at(pos).is_terminal() {
                break;
            }
        }

        Ok((start, len))
    }

    fn draw_pair(&mut self, length: usize) -> Result<PairPositions, AuxReplayError> {
        let (start1, len) = self.draw_sequence(length)?;
        let anchor = start1 + len - 1 + self.pair_gap;

        let mut start2 = None;
        for k in 0..self.pair_gap {
            let pos = anchor + k;
            if pos >= self.size {
                debug!("Search for an episode boundary ran past the newest frame");
                return Err(AuxReplayError::SequencePairNotFound { attempts: 0 });
            }
            if self.at(pos).is_terminal() {
                start2 = Some(pos + 1);
                break;
            }
        }
        let mut start2 = start2.unwrap_or(anchor + self.pair_gap - 1);

        for attempt in 0..self.pair_attempts {
            if start2 + len > self.size {
                debug!("Second sequence at {} runs past the newest frame", start2);
                return Err(AuxReplayError::SequencePairNotFound { attempts: attempt });
            }
            match (0..len).find(|&l| self.at(start2 + l).is_terminal()) {
                Some(l) => start2 += l + 1,
                None => {
                    return Ok(PairPositions {
                        start1,
                        start2,
                        len,
                    })
                }
            }
        }

        Err(AuxReplayError::SequencePairNotFound {
            attempts: self.pair_attempts,
        })
    }

    /// Returns the global index of the last frame of a reward prediction quad.
    fn draw_reward_endpoint(&mut self) -> Result<usize, AuxReplayError> {
        let from_zero = if self.zero_reward_indices.is_empty() {
            false
        } else if self.nonzero_reward_indices.is_empty() {
            true
        } else {
            self.rng.gen_bool(0.5)
        };

        let ixs = if from_zero {
            &self.zero_reward_indices
        } else {
            &self.nonzero_reward_indices
        };
        if ixs.is_empty() {
            return Err(AuxReplayError::InsufficientHistory {
                needed: REWARD_HISTORY + 1,
                held: self.size,
            });
        }

        Ok(ixs[self.rng.gen_range(0..ixs.len())])
    }

    fn frames_in(&self, start: usize, len: usize) -> Vec<&ExperienceFrame> {
        (start..start + len).map(|pos| self.at(pos)).collect()
    }

    fn pair_frames(&self, p: &PairPositions) -> (Vec<&ExperienceFrame>, Vec<&ExperienceFrame>) {
        let seq1 = self.frames_in(p.start1, p.len);
        let seq2 = self.frames_in(p.start2, p.len);
        debug_assert_eq!(seq1.len(), seq2.len());
        (seq1, seq2)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        AuxReplayBuffer, AuxReplayBufferConfig, AuxReplayError, ExperienceFrame, RecurrentState,
    };
    use ndarray::{Array2, Array3};
    use rand::rngs::{mock::StepRng, StdRng};
    use test_log::test;

    /// A frame whose state holds `label`, so sampled frames can be identified.
    fn frame(label: usize, reward: f32, terminal: bool) -> ExperienceFrame {
        ExperienceFrame::new(
            Array3::from_elem((1, 1, 1), label as f32),
            0,
            reward,
            terminal,
            RecurrentState::zeros(1),
            Array2::zeros((1, 1)),
            0,
            0.0,
        )
    }

    fn label(f: &ExperienceFrame) -> usize {
        f.state()[[0, 0, 0]] as usize
    }

    fn labels(fs: &[&ExperienceFrame]) -> Vec<usize> {
        fs.iter().map(|f| label(f)).collect()
    }

    /// A generator whose draws are all zero: ranges yield their lower bound
    /// and coin flips prefer frames with zero reward.
    fn zero_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    fn buffer_with(capacity: usize, terminals: &[usize], n: usize) -> AuxReplayBuffer<StdRng> {
        let config = AuxReplayBufferConfig::default().capacity(capacity).seed(1);
        let mut buf = AuxReplayBuffer::build(&config).unwrap();
        for i in 0..n {
            buf.add_frame(frame(i, 0.0, terminals.contains(&i)));
        }
        buf
    }

    #[test]
    fn test_sample_sequence_insufficient_history() {
        let mut buf = buffer_with(100, &[], 15);
        assert_eq!(
            buf.sample_sequence(20).err(),
            Some(AuxReplayError::InsufficientHistory {
                needed: 22,
                held: 15
            })
        );
        // len == length + 1 is still not enough
        let mut buf = buffer_with(100, &[], 21);
        assert!(buf.sample_sequence(20).is_err());
        assert_eq!(buf.sample_sequence(0).err(), Some(AuxReplayError::ZeroLength));
    }

    #[test]
    fn test_sample_sequence_from_start() {
        let config = AuxReplayBufferConfig::default().capacity(50);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..30 {
            buf.add_frame(frame(i, 0.0, false));
        }
        let seq = buf.sample_sequence(5).unwrap();
        assert_eq!(labels(&seq), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_sequence_skips_leading_terminal_and_stops_at_terminal() {
        let config = AuxReplayBufferConfig::default().capacity(50);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..30 {
            buf.add_frame(frame(i, 0.0, i == 0 || i == 4));
        }
        let seq = buf.sample_sequence(10).unwrap();
        assert_eq!(labels(&seq), vec![1, 2, 3, 4]);
        assert!(seq.last().unwrap().is_terminal());
    }

    #[test]
    fn test_sample_sequence_only_last_may_be_terminal() {
        let terminals = (0..1000).filter(|i| i % 13 == 5).collect::<Vec<_>>();
        let mut buf = buffer_with(300, &terminals, 1000);
        for _ in 0..500 {
            let seq = buf.sample_sequence(20).unwrap();
            assert!(!seq.is_empty() && seq.len() <= 20);
            assert!(!seq[0].is_terminal() || seq.len() == 1);
            assert!(seq[..seq.len() - 1].iter().all(|f| !f.is_terminal()));
            let ls = labels(&seq);
            assert!(ls.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    #[test]
    fn test_back_to_back_single_episode_from_start() {
        let config = AuxReplayBufferConfig::default().capacity(600);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..500 {
            buf.add_frame(frame(i, 0.0, false));
        }
        let (seq1, seq2) = buf.sample_back_to_back(20).unwrap();
        assert_eq!(labels(&seq1), (0..20).collect::<Vec<_>>());
        // 19 + 100 + 99
        assert_eq!(labels(&seq2), (218..238).collect::<Vec<_>>());
    }

    #[test]
    fn test_back_to_back_with_short_gap() {
        let gap = 10;
        let config = AuxReplayBufferConfig::default().capacity(100).pair_gap(gap);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..60 {
            buf.add_frame(frame(i, 0.0, false));
        }
        let (seq1, seq2) = buf.sample_back_to_back(5).unwrap();
        assert_eq!(labels(&seq1), (0..5).collect::<Vec<_>>());
        // start1 + len - 1 + 2 * gap - 1
        let start2 = 4 + 2 * gap - 1;
        assert_eq!(labels(&seq2), (start2..start2 + 5).collect::<Vec<_>>());

        // A boundary inside the search range 14..24 takes precedence.
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..60 {
            buf.add_frame(frame(i, 0.0, i == 18));
        }
        let (_, seq2) = buf.sample_back_to_back(5).unwrap();
        assert_eq!(labels(&seq2), (19..24).collect::<Vec<_>>());
    }

    #[test]
    fn test_back_to_back_starts_after_episode_boundary() {
        let config = AuxReplayBufferConfig::default().capacity(600);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..500 {
            buf.add_frame(frame(i, 0.0, i == 150));
        }
        let (seq1, seq2) = buf.sample_back_to_back(10).unwrap();
        assert_eq!(labels(&seq1), (0..10).collect::<Vec<_>>());
        assert_eq!(labels(&seq2), (151..161).collect::<Vec<_>>());
    }

    #[test]
    fn test_back_to_back_moves_past_terminal_in_window() {
        let config = AuxReplayBufferConfig::default().capacity(600);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        // No boundary in 109..209, so the window starts at 208 and has to
        // move past 212.
        for i in 0..500 {
            buf.add_frame(frame(i, 0.0, i == 212));
        }
        let (seq1, seq2) = buf.sample_back_to_back(10).unwrap();
        assert_eq!(labels(&seq1), (0..10).collect::<Vec<_>>());
        assert_eq!(labels(&seq2), (213..223).collect::<Vec<_>>());
    }

    #[test]
    fn test_back_to_back_gives_up_after_attempts() {
        let config = AuxReplayBufferConfig::default()
            .capacity(600)
            .pair_attempts(3);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        // Episodes of 4 frames after the search window never fit 10 frames.
        for i in 0..500 {
            buf.add_frame(frame(i, 0.0, i >= 208 && i % 4 == 0));
        }
        assert_eq!(
            buf.sample_back_to_back(10).err(),
            Some(AuxReplayError::SequencePairNotFound { attempts: 3 })
        );
    }

    #[test]
    fn test_back_to_back_runs_past_newest_frame() {
        let config = AuxReplayBufferConfig::default().capacity(600);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..150 {
            buf.add_frame(frame(i, 0.0, false));
        }
        assert!(matches!(
            buf.sample_back_to_back(10),
            Err(AuxReplayError::SequencePairNotFound { .. })
        ));
        assert!(matches!(
            buf.sample_back_to_back_with_retry(10),
            Err(AuxReplayError::SequencePairNotFound { attempts: 100 })
        ));
    }

    #[test]
    fn test_back_to_back_with_retry_does_not_retry_insufficient_history() {
        let mut buf = buffer_with(100, &[], 10);
        assert!(matches!(
            buf.sample_back_to_back_with_retry(20),
            Err(AuxReplayError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_back_to_back_distance() {
        let terminals = (0..2000).filter(|i| i % 97 == 50).collect::<Vec<_>>();
        let mut buf = buffer_with(1000, &terminals, 2000);
        for _ in 0..200 {
            let (seq1, seq2) = buf.sample_back_to_back_with_retry(20).unwrap();
            assert_eq!(seq1.len(), seq2.len());
            assert!(seq2.iter().all(|f| !f.is_terminal()));
            let (s1, s2) = (label(seq1[0]), label(seq2[0]));
            let e1 = label(seq1[seq1.len() - 1]);
            let boundary = terminals.iter().any(|&t| t >= e1 && t < s2);
            assert!(boundary || s2 - s1 >= 100);
        }
    }

    #[test]
    fn test_reward_quad_prefers_zero_with_zero_draw() {
        let config = AuxReplayBufferConfig::default().capacity(20);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        let rewards = [0.0, 0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        for (i, &r) in rewards.iter().enumerate() {
            buf.add_frame(frame(i, r, false));
        }
        let quad = buf.sample_reward_prediction_quad().unwrap();
        assert_eq!(labels(&quad), vec![0, 1, 2, 3]);
        assert_eq!(quad[3].reward(), 0.0);
    }

    #[test]
    fn test_reward_quad_falls_back_to_other_class() {
        let config = AuxReplayBufferConfig::default().capacity(20);
        let mut buf = AuxReplayBuffer::with_rng(&config, zero_rng()).unwrap();
        for i in 0..8 {
            buf.add_frame(frame(i, 1.0, false));
        }
        // The coin prefers zero reward, but there is none.
        let quad = buf.sample_reward_prediction_quad().unwrap();
        assert_eq!(labels(&quad), vec![0, 1, 2, 3]);
        assert_eq!(quad[3].reward(), 1.0);
    }

    #[test]
    fn test_reward_quad_insufficient_history() {
        let mut buf = buffer_with(20, &[], 3);
        assert_eq!(
            buf.sample_reward_prediction_quad().err(),
            Some(AuxReplayError::InsufficientHistory { needed: 4, held: 3 })
        );
    }

    #[test]
    fn test_reward_quad_contiguous_after_eviction() {
        let config = AuxReplayBufferConfig::default().capacity(50).seed(5);
        let mut buf = AuxReplayBuffer::build(&config).unwrap();
        for i in 0..500 {
            let r = if i % 6 == 0 { 1.0 } else { 0.0 };
            buf.add_frame(frame(i, r, false));
        }
        let base = buf.base_index();
        let (mut n_zero, mut n_nonzero) = (0, 0);
        for _ in 0..1000 {
            let quad = buf.sample_reward_prediction_quad().unwrap();
            let ls = labels(&quad);
            assert_eq!(ls.len(), 4);
            assert!(ls.windows(2).all(|w| w[1] == w[0] + 1));
            assert!(ls[0] >= base);
            assert_eq!(quad[3].reward(), if ls[3] % 6 == 0 { 1.0 } else { 0.0 });
            if quad[3].reward() == 0.0 {
                n_zero += 1;
            } else {
                n_nonzero += 1;
            }
        }
        // Classes are balanced although only 1 in 6 frames is rewarded.
        assert!(n_zero > 350 && n_nonzero > 350);
    }
}

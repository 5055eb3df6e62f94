use std::collections::VecDeque;

use rand::Rng;

use crate::action::Action;
use crate::state::StateVector;

/// A reward credited to the (state, action) pair that earned it.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: StateVector,
    pub action: Action,
    pub reward: f64,
    pub next_state: StateVector,
}

/// Fixed-length batch of fresh transitions for on-policy updates.
#[derive(Debug)]
pub struct RolloutBuffer {
    transitions: Vec<Transition>,
    rollout_len: usize,
}

impl RolloutBuffer {
    pub fn new(rollout_len: usize) -> Self {
        let rollout_len = rollout_len.max(1);
        Self {
            transitions: Vec::with_capacity(rollout_len),
            rollout_len,
        }
    }

    /// Returns the full rollout once `rollout_len` transitions have been collected.
    pub fn push(&mut self, transition: Transition) -> Option<Vec<Transition>> {
        self.transitions.push(transition);
        if self.transitions.len() >= self.rollout_len {
            Some(std::mem::take(&mut self.transitions))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Bounded store of past transitions for off-policy updates; the oldest are evicted first.
#[derive(Debug)]
pub struct ReplayBuffer {
    transitions: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            transitions: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Uniform minibatch with replacement; empty until `batch_size` transitions exist.
    pub fn sample<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Vec<&Transition> {
        if batch_size == 0 || self.transitions.len() < batch_size {
            return Vec::new();
        }
        (0..batch_size)
            .map(|_| &self.transitions[rng.random_range(0..self.transitions.len())])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn transition(reward: f64) -> Transition {
        Transition {
            state: StateVector::zeros(1),
            action: Action::Discrete(0),
            reward,
            next_state: StateVector::zeros(1),
        }
    }

    #[test]
    fn test_rollout_emits_when_full() {
        let mut rollout = RolloutBuffer::new(3);
        assert!(rollout.push(transition(1.0)).is_none());
        assert!(rollout.push(transition(2.0)).is_none());
        let batch = rollout.push(transition(3.0)).unwrap();
        assert_eq!(batch.len(), 3);
        assert!(rollout.is_empty());
    }

    #[test]
    fn test_replay_evicts_oldest() {
        let mut replay = ReplayBuffer::new(2);
        for r in [1.0, 2.0, 3.0] {
            replay.push(transition(r));
        }
        assert_eq!(replay.len(), 2);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let batch = replay.sample(8, &mut rng);
        assert!(batch.is_empty());
        let batch = replay.sample(2, &mut rng);
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|t| t.reward > 1.0));
    }
}

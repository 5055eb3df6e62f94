use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{EngineError, Result};
use crate::state::StateVector;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn dot(weights: &[f64], x: &[f64]) -> f64 {
    weights.iter().zip(x).map(|(w, x)| w * x).sum()
}

/// Standard normal sample via Box-Muller.
pub(crate) fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "head", rename_all = "snake_case")]
enum Head {
    /// Gaussian policy whose mean is `sigmoid(w·x + b)`.
    Continuous { weights: Vec<f64>, bias: f64 },
    /// One linear value per ladder rung.
    Discrete { weights: Vec<Vec<f64>>, biases: Vec<f64> },
}

/// Linear model over the flattened state vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    input_dim: usize,
    head: Head,
}

impl LinearPolicy {
    pub fn continuous(input_dim: usize) -> Self {
        Self {
            input_dim,
            head: Head::Continuous {
                weights: vec![0.0; input_dim],
                bias: 0.0,
            },
        }
    }

    pub fn discrete(input_dim: usize, n_actions: usize) -> Self {
        Self {
            input_dim,
            head: Head::Discrete {
                weights: vec![vec![0.0; input_dim]; n_actions],
                biases: vec![0.0; n_actions],
            },
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self.head, Head::Discrete { .. })
    }

    /// Number of rungs for a discrete head, `None` for a continuous one.
    pub fn n_actions(&self) -> Option<usize> {
        match &self.head {
            Head::Discrete { biases, .. } => Some(biases.len()),
            Head::Continuous { .. } => None,
        }
    }

    fn check_dim(&self, state: &StateVector) -> Result<()> {
        if state.len() != self.input_dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.input_dim,
                actual: state.len(),
            });
        }
        Ok(())
    }

    /// Deterministic action: the mean for a continuous head, the best rung for a discrete one.
    pub fn greedy(&self, state: &StateVector) -> Result<Action> {
        self.check_dim(state)?;
        let x = state.as_slice();
        Ok(match &self.head {
            Head::Continuous { weights, bias } => Action::Continuous(sigmoid(dot(weights, x) + bias)),
            Head::Discrete { weights, biases } => {
                let best = weights
                    .iter()
                    .zip(biases)
                    .map(|(w, b)| dot(w, x) + b)
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                Action::Discrete(best)
            },
        })
    }

    /// Exploring action: Gaussian noise around the mean, or a uniform rung with probability `epsilon`.
    pub fn explore<R: Rng>(&self, state: &StateVector, std: f64, epsilon: f64, rng: &mut R) -> Result<Action> {
        let greedy = self.greedy(state)?;
        Ok(match (greedy, &self.head) {
            (Action::Continuous(mean), _) => Action::Continuous((mean + std * standard_normal(rng)).clamp(0.0, 1.0)),
            (Action::Discrete(best), Head::Discrete { biases, .. }) => {
                if !biases.is_empty() && rng.random::<f64>() < epsilon {
                    Action::Discrete(rng.random_range(0..biases.len()))
                } else {
                    Action::Discrete(best)
                }
            },
            (action, _) => action,
        })
    }

    /// One gradient step on a transition.
    ///
    /// Continuous: policy gradient of the Gaussian log-likelihood scaled by `advantage`.
    /// Discrete: regression of the taken rung's value toward `target`.
    pub fn update(&mut self, state: &StateVector, action: Action, advantage: f64, target: f64, lr: f64, std: f64) -> Result<()> {
        self.check_dim(state)?;
        let x = state.as_slice();
        match (&mut self.head, action) {
            (Head::Continuous { weights, bias }, Action::Continuous(a)) => {
                let mean = sigmoid(dot(weights, x) + *bias);
                let var = (std * std).max(1e-6);
                let grad_z = (a - mean) / var * mean * (1.0 - mean);
                let step = lr * advantage * grad_z;
                for (w, xi) in weights.iter_mut().zip(x) {
                    *w += step * xi;
                }
                *bias += step;
            },
            (Head::Discrete { weights, biases }, Action::Discrete(i)) if i < biases.len() => {
                let value = dot(&weights[i], x) + biases[i];
                let step = lr * (target - value);
                for (w, xi) in weights[i].iter_mut().zip(x) {
                    *w += step * xi;
                }
                biases[i] += step;
            },
            _ => {
                return Err(EngineError::ActionMismatch(format!("{action:?}")));
            },
        }
        Ok(())
    }

    /// Value estimate of `action`; the mean itself for a continuous head.
    pub fn value(&self, state: &StateVector, action: Action) -> Result<f64> {
        self.check_dim(state)?;
        let x = state.as_slice();
        Ok(match (&self.head, action) {
            (Head::Discrete { weights, biases }, Action::Discrete(i)) if i < biases.len() => dot(&weights[i], x) + biases[i],
            (Head::Continuous { weights, bias }, _) => sigmoid(dot(weights, x) + bias),
            _ => 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::state::{StateHistory, StateSample};

    fn state(loss: f64) -> StateVector {
        let mut h = StateHistory::new(2);
        h.push(StateSample {
            loss_rate: loss,
            normalized_rtt: 0.2,
            normalized_receiving_throughput: 0.5,
        });
        h.vector()
    }

    #[test]
    fn test_fresh_continuous_policy_is_centered() {
        let p = LinearPolicy::continuous(6);
        assert_eq!(p.greedy(&state(0.0)).unwrap(), Action::Continuous(0.5));
    }

    #[test]
    fn test_dimension_mismatch() {
        let p = LinearPolicy::continuous(4);
        match p.greedy(&state(0.0)) {
            Err(EngineError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 6);
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_positive_advantage_moves_mean_toward_action() {
        let mut p = LinearPolicy::continuous(6);
        let s = state(0.0);
        for _ in 0..50 {
            p.update(&s, Action::Continuous(0.9), 1.0, 0.0, 0.05, 0.1).unwrap();
        }
        match p.greedy(&s).unwrap() {
            Action::Continuous(mean) => assert!(mean > 0.6, "mean {mean}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_discrete_regression_prefers_rewarded_rung() {
        let mut p = LinearPolicy::discrete(6, 4);
        let s = state(0.1);
        for _ in 0..100 {
            p.update(&s, Action::Discrete(2), 0.0, 1.0, 0.1, 0.0).unwrap();
            p.update(&s, Action::Discrete(1), 0.0, -1.0, 0.1, 0.0).unwrap();
        }
        assert_eq!(p.greedy(&s).unwrap(), Action::Discrete(2));
        assert!(p.value(&s, Action::Discrete(2)).unwrap() > 0.5);
    }

    #[test]
    fn test_exploration_stays_in_range() {
        let p = LinearPolicy::discrete(6, 3);
        let c = LinearPolicy::continuous(6);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..200 {
            match p.explore(&state(0.0), 0.1, 0.5, &mut rng).unwrap() {
                Action::Discrete(i) => assert!(i < 3),
                other => panic!("unexpected {other:?}"),
            }
            match c.explore(&state(0.0), 1.0, 0.0, &mut rng).unwrap() {
                Action::Continuous(a) => assert!((0.0..=1.0).contains(&a)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }
}

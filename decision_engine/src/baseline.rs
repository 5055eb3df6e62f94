use tracing::debug;

use crate::action::{Action, ActionSpace};
use crate::state::StateVector;

const LOW_LOSS: f64 = 0.02;
const HIGH_LOSS: f64 = 0.10;
const INCREASE_FACTOR: f64 = 1.05;

/// Loss-driven rate controller in the style of GCC's loss-based estimator.
///
/// Below 2% loss the estimate grows by 5%, above 10% it is cut in proportion to the loss, and in
/// between it is held. It never learns and has no state worth persisting.
#[derive(Clone, Debug)]
pub struct LossBasedBaseline {
    space: ActionSpace,
    min_bps: f64,
    max_bps: f64,
    initial_bps: f64,
    estimate_bps: f64,
}

impl LossBasedBaseline {
    pub fn new(space: ActionSpace, min_bps: f64, max_bps: f64, initial_bps: f64) -> Self {
        let initial_bps = initial_bps.clamp(min_bps, max_bps);
        Self {
            space,
            min_bps,
            max_bps,
            initial_bps,
            estimate_bps: initial_bps,
        }
    }

    pub fn estimate_bps(&self) -> f64 {
        self.estimate_bps
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.space
    }

    pub fn next_estimate(&mut self, loss: f64) -> f64 {
        let next = if loss < LOW_LOSS {
            self.estimate_bps * INCREASE_FACTOR
        } else if loss > HIGH_LOSS {
            self.estimate_bps * (1.0 - 0.5 * loss)
        } else {
            self.estimate_bps
        };
        self.estimate_bps = next.clamp(self.min_bps, self.max_bps);
        self.estimate_bps
    }

    pub fn predict(&mut self, state: &StateVector) -> Action {
        let loss = state.latest().loss_rate;
        let bps = self.next_estimate(loss);
        debug!(loss, bps, "loss-based estimate");
        self.space.from_bps(bps)
    }

    /// Back to the initial estimate for a new call.
    pub fn reset(&mut self) {
        self.estimate_bps = self.initial_bps;
    }
}

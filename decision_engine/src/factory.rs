use std::path::PathBuf;

use tracing::info;

use crate::action::{ActionSpace, ActionSpaceType, BitrateLadder, LadderKind};
use crate::algorithm::Algorithm;
use crate::baseline::LossBasedBaseline;
use crate::checkpoint::Checkpoint;
use crate::engine::{Engine, LearnedEngine, LearnerSettings, Mode};
use crate::error::{EngineError, Result};

/// Everything needed to choose and build the engine for a run.
#[derive(Clone, Debug)]
pub struct EngineFactory {
    pub algorithm: Algorithm,
    pub mode: Mode,
    pub use_loss_baseline: bool,
    pub action_space: ActionSpaceType,
    pub ladder: LadderKind,
    pub history_len: usize,
    pub min_bandwidth_bps: f64,
    pub max_bandwidth_bps: f64,
    pub initial_bandwidth_bps: f64,
    pub learner: LearnerSettings,
    /// Checkpoint file to restore, already resolved to a path.
    pub checkpoint: Option<PathBuf>,
}

impl EngineFactory {
    pub fn action_space(&self) -> ActionSpace {
        match self.action_space {
            ActionSpaceType::Continuous => ActionSpace::Continuous {
                min_bps: self.min_bandwidth_bps,
                max_bps: self.max_bandwidth_bps,
            },
            ActionSpaceType::Discrete => ActionSpace::Discrete(BitrateLadder::of_kind(self.ladder)),
        }
    }

    /// Checks the configuration without building anything.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_bandwidth_bps > 0.0 && self.max_bandwidth_bps > self.min_bandwidth_bps) {
            return Err(EngineError::unsupported(format!(
                "bandwidth range [{}, {}]",
                self.min_bandwidth_bps, self.max_bandwidth_bps
            )));
        }
        if self.use_loss_baseline {
            return Ok(());
        }
        if !self.algorithm.supports(self.action_space) {
            return Err(EngineError::unsupported(format!(
                "{} with a {} action space",
                self.algorithm, self.action_space
            )));
        }
        if self.mode == Mode::Eval && self.checkpoint.is_none() {
            return Err(EngineError::checkpoint(format!("evaluating {} requires a checkpoint", self.algorithm)));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Engine> {
        self.validate()?;
        let space = self.action_space();

        if self.use_loss_baseline {
            info!("Using the loss-based baseline with a {} action space", self.action_space);
            return Ok(Engine::Baseline(LossBasedBaseline::new(
                space,
                self.min_bandwidth_bps,
                self.max_bandwidth_bps,
                self.initial_bandwidth_bps,
            )));
        }

        let ladder = (self.action_space == ActionSpaceType::Discrete).then_some(self.ladder);
        let mut engine =
            LearnedEngine::new(self.algorithm, self.mode, space, ladder, self.history_len, self.learner.clone());

        if let Some(path) = &self.checkpoint {
            engine.restore(Checkpoint::load(path)?)?;
            info!("Restored {} from {path:?} ({} updates)", self.algorithm, engine.updates());
        }

        info!("Using {} in {} mode with a {} action space", self.algorithm, self.mode, self.action_space);
        Ok(Engine::Learned(Box::new(engine)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DecisionEngine, EngineKind};

    fn factory(algorithm: Algorithm, action_space: ActionSpaceType) -> EngineFactory {
        EngineFactory {
            algorithm,
            mode: Mode::Train,
            use_loss_baseline: false,
            action_space,
            ladder: LadderKind::Onrl,
            history_len: 4,
            min_bandwidth_bps: 300_000.0,
            max_bandwidth_bps: 6_000_000.0,
            initial_bandwidth_bps: 300_000.0,
            learner: LearnerSettings {
                seed: Some(3),
                ..Default::default()
            },
            checkpoint: None,
        }
    }

    #[test]
    fn test_unsupported_combinations() {
        assert!(matches!(
            factory(Algorithm::DQN, ActionSpaceType::Continuous).build(),
            Err(EngineError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            factory(Algorithm::TD3, ActionSpaceType::Discrete).build(),
            Err(EngineError::UnsupportedAlgorithm(_))
        ));
        assert!(factory(Algorithm::PPO, ActionSpaceType::Discrete).build().is_ok());
    }

    #[test]
    fn test_eval_requires_checkpoint() {
        let mut f = factory(Algorithm::SAC, ActionSpaceType::Continuous);
        f.mode = Mode::Eval;
        assert!(matches!(f.build(), Err(EngineError::Checkpoint(_))));

        f.use_loss_baseline = true;
        let engine = f.build().unwrap();
        assert_eq!(engine.kind(), EngineKind::LossBaseline);
    }

    #[test]
    fn test_missing_checkpoint_file() {
        let mut f = factory(Algorithm::A2C, ActionSpaceType::Continuous);
        f.checkpoint = Some(PathBuf::from("/nonexistent/A2C-ckpt-fcc-episode1-2024-01-01-00-00-00.json"));
        assert!(matches!(f.build(), Err(EngineError::IO(_))));
    }
}

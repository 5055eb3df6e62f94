use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use utils::ExpWeightedMovingAvg;

use crate::action::{Action, ActionSpace, LadderKind};
use crate::algorithm::Algorithm;
use crate::baseline::LossBasedBaseline;
use crate::buffer::{ReplayBuffer, RolloutBuffer, Transition};
use crate::checkpoint::Checkpoint;
use crate::error::{EngineError, Result};
use crate::linear_policy::LinearPolicy;
use crate::state::StateVector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Mode::Train),
            "eval" => Ok(Mode::Eval),
            other => Err(EngineError::unsupported(format!("mode {other:?}"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => write!(f, "train"),
            Mode::Eval => write!(f, "eval"),
        }
    }
}

/// What kind of engine is behind a [`DecisionEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    LossBaseline,
    Learned(Algorithm),
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::LossBaseline => write!(f, "GCC"),
            EngineKind::Learned(algo) => write!(f, "{algo}"),
        }
    }
}

/// A bandwidth decision policy driven by the episode loop.
pub trait DecisionEngine {
    /// Chooses an action for the current state.
    fn predict(&mut self, state: &StateVector) -> Result<Action>;

    /// Feeds back the reward earned by an earlier prediction.
    fn observe(&mut self, transition: Transition) -> Result<()>;

    /// Persists learned state; engines without any do nothing.
    fn save(&self, path: &Path) -> Result<()>;

    fn kind(&self) -> EngineKind;

    /// Called at the start of each episode.
    fn begin_episode(&mut self) {}
}

/// Hyperparameters of a learned engine.
#[derive(Clone, Debug)]
pub struct LearnerSettings {
    pub learning_rate: f64,
    pub exploration_std: f64,
    pub epsilon: f64,
    pub rollout_len: usize,
    pub replay_capacity: usize,
    pub batch_size: usize,
    pub seed: Option<u64>,
}

impl Default for LearnerSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            exploration_std: 0.1,
            epsilon: 0.1,
            rollout_len: 32,
            replay_capacity: 10_000,
            batch_size: 16,
            seed: None,
        }
    }
}

#[derive(Debug)]
enum Experience {
    OnPolicy(RolloutBuffer),
    OffPolicy(ReplayBuffer),
}

/// A linear policy trained with an on-policy rollout or an off-policy replay scheme,
/// depending on the algorithm.
#[derive(Debug)]
pub struct LearnedEngine {
    algorithm: Algorithm,
    mode: Mode,
    space: ActionSpace,
    ladder: Option<LadderKind>,
    history_len: usize,
    policy: LinearPolicy,
    experience: Experience,
    reward_baseline: ExpWeightedMovingAvg,
    settings: LearnerSettings,
    rng: ChaCha8Rng,
    updates: u64,
}

impl LearnedEngine {
    pub fn new(
        algorithm: Algorithm,
        mode: Mode,
        space: ActionSpace,
        ladder: Option<LadderKind>,
        history_len: usize,
        settings: LearnerSettings,
    ) -> Self {
        let input_dim = history_len * crate::state::FEATURES_PER_SAMPLE;
        let policy = match &space {
            ActionSpace::Continuous { .. } => LinearPolicy::continuous(input_dim),
            ActionSpace::Discrete(ladder) => LinearPolicy::discrete(input_dim, ladder.len()),
        };
        let experience = if algorithm.is_on_policy() {
            Experience::OnPolicy(RolloutBuffer::new(settings.rollout_len))
        } else {
            Experience::OffPolicy(ReplayBuffer::new(settings.replay_capacity))
        };
        let rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };

        Self {
            algorithm,
            mode,
            space,
            ladder,
            history_len,
            policy,
            experience,
            reward_baseline: ExpWeightedMovingAvg::new_count_decay(32.0),
            settings,
            rng,
            updates: 0,
        }
    }

    /// Replaces the fresh policy with the one stored in `checkpoint`, after checking that the
    /// checkpoint was produced for the same algorithm, action space and state shape.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        if checkpoint.algorithm != self.algorithm {
            return Err(EngineError::checkpoint(format!(
                "checkpoint is for {}, engine is {}",
                checkpoint.algorithm, self.algorithm
            )));
        }
        if checkpoint.action_space != self.space.kind() {
            return Err(EngineError::checkpoint(format!(
                "checkpoint uses a {} action space, engine uses {}",
                checkpoint.action_space,
                self.space.kind()
            )));
        }
        let expected = self.policy.input_dim();
        if checkpoint.policy.input_dim() != expected || checkpoint.history_len != self.history_len {
            return Err(EngineError::DimensionMismatch {
                expected,
                actual: checkpoint.policy.input_dim(),
            });
        }
        if checkpoint.policy.n_actions() != self.policy.n_actions() {
            return Err(EngineError::checkpoint("checkpoint ladder size differs from the configured ladder"));
        }

        self.policy = checkpoint.policy;
        self.updates = checkpoint.updates;
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            algorithm: self.algorithm,
            action_space: self.space.kind(),
            ladder: self.ladder,
            history_len: self.history_len,
            updates: self.updates,
            policy: self.policy.clone(),
        }
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn learn_from(&mut self, transition: &Transition, advantage: f64) -> Result<()> {
        self.policy.update(
            &transition.state,
            transition.action,
            advantage,
            transition.reward,
            self.settings.learning_rate,
            self.settings.exploration_std,
        )?;
        self.updates += 1;
        Ok(())
    }
}

impl DecisionEngine for LearnedEngine {
    fn predict(&mut self, state: &StateVector) -> Result<Action> {
        match self.mode {
            Mode::Train => {
                self.policy
                    .explore(state, self.settings.exploration_std, self.settings.epsilon, &mut self.rng)
            },
            Mode::Eval => self.policy.greedy(state),
        }
    }

    fn observe(&mut self, transition: Transition) -> Result<()> {
        if self.mode == Mode::Eval {
            return Ok(());
        }

        match &mut self.experience {
            Experience::OnPolicy(rollout) => {
                let Some(batch) = rollout.push(transition) else {
                    return Ok(());
                };
                let mean = batch.iter().map(|t| t.reward).sum::<f64>() / batch.len() as f64;
                for t in &batch {
                    self.learn_from(t, t.reward - mean)?;
                }
                debug!(algorithm = %self.algorithm, n = batch.len(), mean_reward = mean, "on-policy update");
            },
            Experience::OffPolicy(replay) => {
                replay.push(transition);
                let batch: Vec<Transition> = replay
                    .sample(self.settings.batch_size, &mut self.rng)
                    .into_iter()
                    .cloned()
                    .collect();
                for t in &batch {
                    let advantage = t.reward - self.reward_baseline.value();
                    self.learn_from(t, advantage)?;
                    self.reward_baseline.update(t.reward);
                }
            },
        }
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.checkpoint().save(path)
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Learned(self.algorithm)
    }
}

impl DecisionEngine for LossBasedBaseline {
    fn predict(&mut self, state: &StateVector) -> Result<Action> {
        Ok(LossBasedBaseline::predict(self, state))
    }

    fn observe(&mut self, _transition: Transition) -> Result<()> {
        Ok(())
    }

    fn save(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> EngineKind {
        EngineKind::LossBaseline
    }

    fn begin_episode(&mut self) {
        self.reset();
    }
}

/// The engine chosen once at startup.
#[derive(Debug)]
pub enum Engine {
    Baseline(LossBasedBaseline),
    Learned(Box<LearnedEngine>),
}

impl Engine {
    pub fn action_space(&self) -> &ActionSpace {
        match self {
            Engine::Baseline(b) => b.action_space(),
            Engine::Learned(l) => &l.space,
        }
    }

    /// Predicts and converts the action into bits per second.
    pub fn estimate(&mut self, state: &StateVector) -> Result<(Action, f64)> {
        let action = self.predict(state)?;
        let bps = self.action_space().to_bps(action);
        Ok((action, bps))
    }

    /// Whether periodic checkpoints should be written for this engine.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Engine::Learned(l) if l.mode == Mode::Train)
    }

    pub fn checkpoint_ladder(&self) -> Option<LadderKind> {
        match self {
            Engine::Learned(l) => l.ladder,
            Engine::Baseline(_) => None,
        }
    }
}

impl DecisionEngine for Engine {
    fn predict(&mut self, state: &StateVector) -> Result<Action> {
        match self {
            Engine::Baseline(b) => DecisionEngine::predict(b, state),
            Engine::Learned(l) => l.predict(state),
        }
    }

    fn observe(&mut self, transition: Transition) -> Result<()> {
        match self {
            Engine::Baseline(b) => b.observe(transition),
            Engine::Learned(l) => l.observe(transition),
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        match self {
            Engine::Baseline(b) => b.save(path),
            Engine::Learned(l) => l.save(path),
        }
    }

    fn kind(&self) -> EngineKind {
        match self {
            Engine::Baseline(b) => b.kind(),
            Engine::Learned(l) => l.kind(),
        }
    }

    fn begin_episode(&mut self) {
        match self {
            Engine::Baseline(b) => b.begin_episode(),
            Engine::Learned(l) => {
                info!("{} engine: {} updates so far", l.algorithm, l.updates);
                l.begin_episode()
            },
        }
    }
}

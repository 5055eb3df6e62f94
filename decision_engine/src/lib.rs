pub mod action;
pub mod algorithm;
pub mod baseline;
pub mod buffer;
pub mod checkpoint;
mod engine;
pub mod error;
mod factory;
pub mod linear_policy;
pub mod reward;
pub mod state;

pub use action::{Action, ActionSpace, ActionSpaceType, BitrateLadder, LadderKind};
pub use algorithm::Algorithm;
pub use baseline::LossBasedBaseline;
pub use buffer::Transition;
pub use checkpoint::{Checkpoint, CheckpointName};
pub use engine::{DecisionEngine, Engine, EngineKind, LearnedEngine, LearnerSettings, Mode};
pub use error::{EngineError, Result};
pub use factory::EngineFactory;
pub use reward::{EpisodeStats, RewardInputs, compute_reward};
pub use state::{Normalizer, StateHistory, StateSample, StateVector};

use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Checkpoint Error: {0}")]
    Checkpoint(String),

    #[error("Malformed checkpoint name: {0}")]
    CheckpointName(String),

    #[error("State dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Action {0} does not match the policy head")]
    ActionMismatch(String),

    #[error("Serde JSON Error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn checkpoint(e: impl ToString) -> Self {
        EngineError::Checkpoint(e.to_string())
    }

    pub fn unsupported(e: impl ToString) -> Self {
        EngineError::UnsupportedAlgorithm(e.to_string())
    }
}

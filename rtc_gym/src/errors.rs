use std::fmt::Display;

use decision_engine::EngineError;
use thiserror::Error;

use crate::line_protocol::LineProtocolError;

#[derive(Error, Debug)]
pub enum GymError {
    #[error("Unsupported trace type: {0}")]
    UnsupportedTraceType(String),

    #[error("No traces found: {0}")]
    NoTraces(String),

    #[error("No free port after {0} draws")]
    PortExhausted(usize),

    #[error("Failed to spawn {program}: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Episode {episode} produced no steps in {attempts} attempts")]
    EpisodeRetriesExhausted { episode: u64, attempts: u64 },

    #[error("Invalid call state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Line protocol error: {0}")]
    LineProtocol(#[from] LineProtocolError),

    #[error("Decision engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, GymError>;

pub(crate) fn internal(e: impl Display) -> GymError {
    GymError::InternalError(e.to_string())
}

pub(crate) fn config_error(e: impl Display) -> GymError {
    GymError::Config(e.to_string())
}

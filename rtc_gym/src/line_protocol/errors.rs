use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineProtocolError {
    #[error("Invalid dispatcher state: {0}")]
    State(String),

    #[error("Bandwidth estimate failed: {0}")]
    Estimate(String),

    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LineProtocolError>;

impl LineProtocolError {
    pub(crate) fn bad_state(e: impl Display) -> LineProtocolError {
        LineProtocolError::State(e.to_string())
    }

    pub fn estimate(e: impl Display) -> LineProtocolError {
        LineProtocolError::Estimate(e.to_string())
    }

    /// The peer went away while a reply was being written.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, LineProtocolError::IO(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

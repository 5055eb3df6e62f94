use super::errors::{LineProtocolError, Result};

// The dispatcher alternates between waiting for a line and acting on it. A request is always
// answered before the next line is read; there is no way from `Respond` back into `Ingest`
// without passing through `AwaitLine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    AwaitLine,
    Ingest,
    Respond,
    Finished,
}

impl DispatcherState {
    pub fn transit_to(&mut self, to: Self) -> Result<()> {
        match self {
            Self::AwaitLine => match to {
                Self::Ingest | Self::Respond | Self::Finished => (),
                Self::AwaitLine => return Err(LineProtocolError::bad_state("already awaiting a line")),
            },
            Self::Ingest | Self::Respond => match to {
                Self::AwaitLine => (),
                _ => return Err(LineProtocolError::bad_state("previous line not yet handled")),
            },
            Self::Finished => return Err(LineProtocolError::bad_state("input stream already ended")),
        };

        *self = to;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::DispatcherState;
    use crate::line_protocol::LineProtocolError;

    #[test]
    fn test_state_transit_good() -> Result<()> {
        let mut state = DispatcherState::AwaitLine;
        state.transit_to(DispatcherState::Ingest)?;
        state.transit_to(DispatcherState::AwaitLine)?;
        state.transit_to(DispatcherState::Respond)?;
        state.transit_to(DispatcherState::AwaitLine)?;
        state.transit_to(DispatcherState::Finished)?;

        Ok(())
    }

    #[test]
    fn test_state_transit_bad() -> Result<()> {
        // a request must be answered before another line is handled
        let mut state = DispatcherState::Respond;
        let ret = state.transit_to(DispatcherState::Ingest);
        assert!(matches!(ret, Err(LineProtocolError::State(_))));

        let mut state = DispatcherState::Ingest;
        let ret = state.transit_to(DispatcherState::Finished);
        assert!(matches!(ret, Err(LineProtocolError::State(_))));

        // nothing follows the end of the stream
        let mut state = DispatcherState::Finished;
        let ret = state.transit_to(DispatcherState::AwaitLine);
        assert!(matches!(ret, Err(LineProtocolError::State(_))));

        Ok(())
    }
}

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, ChildStdout};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{Span, debug, warn};

use super::process_wrapping::CapturedCommand;
use crate::errors::{GymError, Result};

/// How a call attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeStatus {
    Success,
    Killed,
    Timeout,
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EpisodeStatus::Success => "SUCCESS",
            EpisodeStatus::Killed => "KILLED",
            EpisodeStatus::Timeout => "TIMEOUT",
        };
        write!(f, "{s}")
    }
}

// A call moves forward only: it is created with its receiver, runs once the sender is up, and
// finishes exactly once. A finished call is never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Created,
    Running,
    Finished(EpisodeStatus),
}

impl CallState {
    pub fn transit_to(&mut self, to: Self) -> Result<()> {
        match self {
            Self::Created => match to {
                Self::Running | Self::Finished(_) => (),
                Self::Created => return Err(GymError::InvalidState("call already created".to_string())),
            },
            Self::Running => match to {
                Self::Finished(_) => (),
                _ => return Err(GymError::InvalidState("call already running".to_string())),
            },
            Self::Finished(status) => {
                return Err(GymError::InvalidState(format!("call already finished with {status}")));
            },
        };

        *self = to;

        Ok(())
    }
}

/// A process handle shared between the session and its watchdog.
type SharedCommand = Arc<Mutex<CapturedCommand>>;

/// Kills the given process trees if not disarmed before `deadline`.
///
/// Kills go through the shared handles, so a child the session already reaped is never
/// signalled. Descendants are still looked up by pid at kill time and may have been replaced
/// between that lookup and the signal.
struct Watchdog {
    disarm: mpsc::Sender<()>,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Watchdog {
    fn arm(deadline: Duration, commands: Vec<SharedCommand>) -> Self {
        let (disarm, disarmed) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = fired.clone();
        let span = Span::current();

        let handle = thread::spawn(move || {
            let _entered = span.enter();
            if let Err(RecvTimeoutError::Timeout) = disarmed.recv_timeout(deadline) {
                warn!("episode watchdog fired after {deadline:?}");
                fired_flag.store(true, Ordering::SeqCst);
                for command in commands {
                    command.lock().kill_tree();
                }
            }
        });

        Self { disarm, fired, handle }
    }

    /// Stops the watchdog, returning whether it had already fired.
    fn disarm(self) -> bool {
        let _ = self.disarm.send(());
        let _ = self.handle.join();
        self.fired.load(Ordering::SeqCst)
    }
}

/// Timing knobs of a running call.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    /// Bounds the whole dispatch phase.
    pub episode_deadline: Duration,
    /// Bounds the wait for both processes once the receiver stream ended.
    pub exit_timeout: Duration,
    pub poll_interval: Duration,
}

/// One running call: the receiver and sender processes of an episode and their supervision.
///
/// Both process trees are killed on every exit path, including drop.
pub struct CallSession {
    state: CallState,
    trace: PathBuf,
    port: u16,
    receiver: SharedCommand,
    sender: Option<SharedCommand>,
    timeouts: SessionTimeouts,
    watchdog: Option<Watchdog>,
    timed_out: bool,
}

impl CallSession {
    pub(crate) fn new(receiver: CapturedCommand, trace: PathBuf, port: u16, timeouts: SessionTimeouts) -> Self {
        Self {
            state: CallState::Created,
            trace,
            port,
            receiver: Arc::new(Mutex::new(receiver)),
            sender: None,
            timeouts,
            watchdog: None,
            timed_out: false,
        }
    }

    /// Attaches the sender and arms the episode watchdog.
    pub(crate) fn start(&mut self, sender: CapturedCommand) -> Result<()> {
        let sender = Arc::new(Mutex::new(sender));
        let commands = vec![self.receiver.clone(), sender.clone()];
        self.sender = Some(sender);
        self.state.transit_to(CallState::Running)?;
        self.watchdog = Some(Watchdog::arm(self.timeouts.episode_deadline, commands));
        Ok(())
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn status(&self) -> Option<EpisodeStatus> {
        match self.state {
            CallState::Finished(status) => Some(status),
            _ => None,
        }
    }

    pub fn trace(&self) -> &Path {
        &self.trace
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The receiver's output stream (read) and input stream (written).
    pub fn receiver_io(&mut self) -> Result<(ChildStdout, ChildStdin)> {
        let mut receiver = self.receiver.lock();
        Ok((receiver.stdout()?, receiver.stdin()?))
    }

    /// Checks that both peers survived their start. If either already exited, the call is
    /// torn down and finishes as `KILLED`.
    pub fn check_started(&mut self) -> Result<bool> {
        let receiver_running = self.receiver.lock().try_wait()?.is_none();
        let sender_running = match self.sender.as_ref() {
            Some(sender) => sender.lock().try_wait()?.is_none(),
            None => false,
        };

        if receiver_running && sender_running {
            return Ok(true);
        }

        warn!("receiver running: {receiver_running}, sender running: {sender_running}; killing the call");
        self.finish(EpisodeStatus::Killed)?;
        Ok(false)
    }

    /// Waits for both processes after the receiver stream ended. Processes still alive after
    /// the exit timeout, or a fired watchdog, make the episode `TIMEOUT`.
    pub fn supervise(&mut self) -> Result<EpisodeStatus> {
        if let Some(status) = self.status() {
            return Ok(status);
        }

        if let Some(watchdog) = self.watchdog.take() {
            self.timed_out |= watchdog.disarm();
        }

        let status = if self.timed_out || !self.wait_for_exit()? {
            EpisodeStatus::Timeout
        } else {
            EpisodeStatus::Success
        };

        self.finish(status)?;
        Ok(status)
    }

    fn wait_for_exit(&mut self) -> Result<bool> {
        let deadline = Instant::now() + self.timeouts.exit_timeout;
        let poll = self.timeouts.poll_interval;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if self.receiver.lock().wait_timeout(remaining, poll)?.is_none() {
            debug!("receiver still running after {:?}", self.timeouts.exit_timeout);
            return Ok(false);
        }

        if let Some(sender) = self.sender.as_ref() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if sender.lock().wait_timeout(remaining, poll)?.is_none() {
                debug!("sender still running after {:?}", self.timeouts.exit_timeout);
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn finish(&mut self, status: EpisodeStatus) -> Result<()> {
        self.teardown();
        self.state.transit_to(CallState::Finished(status))
    }

    /// Kills both process trees. Safe to call any number of times.
    pub fn teardown(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            self.timed_out |= watchdog.disarm();
        }
        self.receiver.lock().kill_tree();
        if let Some(sender) = self.sender.as_ref() {
            sender.lock().kill_tree();
        }
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.teardown();
        if self.status().is_none() {
            debug!("call on port {} dropped before it finished", self.port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_state_transit() -> anyhow::Result<()> {
        let mut state = CallState::Created;
        state.transit_to(CallState::Running)?;
        state.transit_to(CallState::Finished(EpisodeStatus::Success))?;
        assert!(matches!(
            state.transit_to(CallState::Finished(EpisodeStatus::Timeout)),
            Err(GymError::InvalidState(_))
        ));

        // Start check failures go straight from created to finished.
        let mut state = CallState::Created;
        state.transit_to(CallState::Finished(EpisodeStatus::Killed))?;

        let mut state = CallState::Running;
        assert!(state.transit_to(CallState::Created).is_err());
        Ok(())
    }

    #[test]
    fn test_status_display() {
        assert_eq!(EpisodeStatus::Success.to_string(), "SUCCESS");
        assert_eq!(EpisodeStatus::Killed.to_string(), "KILLED");
        assert_eq!(EpisodeStatus::Timeout.to_string(), "TIMEOUT");
    }

    #[cfg(unix)]
    mod process {
        use std::process::Command;

        use tracing_test::traced_test;

        use super::*;

        fn sh(script: &str) -> Command {
            let mut command = Command::new("sh");
            command.arg("-c").arg(script);
            command
        }

        fn session(receiver: &str, sender: &str, episode_deadline: Duration) -> anyhow::Result<CallSession> {
            let receiver = CapturedCommand::new_with_piped_io("receiver", sh(receiver))?;
            let sender = CapturedCommand::new_detached("sender", sh(sender))?;
            let timeouts = SessionTimeouts {
                episode_deadline,
                exit_timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(10),
            };
            let mut session = CallSession::new(receiver, PathBuf::from("trace"), 40000, timeouts);
            session.start(sender)?;
            Ok(session)
        }

        #[test]
        fn test_clean_exit_is_success() -> anyhow::Result<()> {
            let mut session = session("sleep 0.2", "sleep 0.2", Duration::from_secs(30))?;
            assert!(session.check_started()?);
            assert_eq!(session.supervise()?, EpisodeStatus::Success);
            assert_eq!(session.state(), CallState::Finished(EpisodeStatus::Success));
            // Idempotent once finished.
            assert_eq!(session.supervise()?, EpisodeStatus::Success);
            Ok(())
        }

        #[test]
        fn test_early_exit_is_killed() -> anyhow::Result<()> {
            let mut session = session("exit 1", "sleep 30", Duration::from_secs(30))?;
            thread::sleep(Duration::from_millis(300));
            assert!(!session.check_started()?);
            assert_eq!(session.status(), Some(EpisodeStatus::Killed));
            Ok(())
        }

        #[test]
        fn test_watchdog_times_out() -> anyhow::Result<()> {
            let start = Instant::now();
            let mut session = session("sleep 300", "sleep 300", Duration::from_millis(300))?;
            assert!(session.check_started()?);
            thread::sleep(Duration::from_millis(600));
            assert_eq!(session.supervise()?, EpisodeStatus::Timeout);
            assert!(start.elapsed() < Duration::from_secs(5));
            Ok(())
        }

        #[test]
        #[traced_test]
        fn test_watchdog_kills_through_handles() -> anyhow::Result<()> {
            let mut session = session("sleep 300", "sleep 300", Duration::from_millis(200))?;
            assert!(session.check_started()?);
            thread::sleep(Duration::from_millis(1500));

            // The watchdog reaped both children through the shared handles.
            assert!(session.receiver.lock().try_wait()?.is_some());
            let sender = session.sender.clone().ok_or_else(|| anyhow::anyhow!("no sender"))?;
            assert!(sender.lock().try_wait()?.is_some());
            assert!(logs_contain("episode watchdog fired"));
            assert!(logs_contain("killing receiver"));
            assert!(logs_contain("killing sender"));

            assert_eq!(session.supervise()?, EpisodeStatus::Timeout);
            Ok(())
        }
    }
}

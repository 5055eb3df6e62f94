use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use gym_config::groups::call::ConfigValueGroup as CallConfig;
use tracing::{debug, info};

mod port_pool;
mod process_wrapping;
mod session;
mod trace_catalog;

pub use port_pool::{PortPool, is_port_free, write_port_file};
pub use process_wrapping::CapturedCommand;
pub use session::{CallSession, CallState, EpisodeStatus, SessionTimeouts};
pub use trace_catalog::{TraceCatalog, TracePool, TraceSelection, TraceType};

use crate::constants::{PORT_FILE_NAME, RECEIVER_LOG_NAME, SENDER_LOG_NAME};
use crate::errors::{GymError, Result};
use crate::media_config::{NetworkTrace, ReceiverMediaConfig};

/// Everything needed to launch the two peers of a call.
#[derive(Debug, Clone)]
pub struct CallSettings {
    pub call_app: PathBuf,
    pub receiver_config: PathBuf,
    pub sender_config: PathBuf,
    pub dest_ip: String,
    /// Empty runs the sender without shaping.
    pub shaping_tool: String,
    pub sender_start_delay: Duration,
    pub exit_timeout: Duration,
    pub episode_timeout: Duration,
    pub poll_interval: Duration,
}

impl CallSettings {
    /// Resolves the call app and the `receiver_<res>.json` / `sender_<res>.json` media configs
    /// against the base path.
    pub fn from_config(config: &CallConfig, base_path: &Path) -> Self {
        let res = &config.video_res;
        Self {
            call_app: base_path.join(&config.call_app),
            receiver_config: base_path.join(format!("receiver_{res}.json")),
            sender_config: base_path.join(format!("sender_{res}.json")),
            dest_ip: config.dest_ip.clone(),
            shaping_tool: config.shaping_tool.clone(),
            sender_start_delay: config.sender_start_delay,
            exit_timeout: config.exit_timeout,
            episode_timeout: config.episode_timeout,
            poll_interval: config.poll_interval,
        }
    }

    /// Fails if the call app, the shaping tool or the media configs are missing or unreadable.
    pub fn validate(&self) -> Result<()> {
        if !self.call_app.is_file() {
            return Err(GymError::Config(format!("call app {:?} does not exist", self.call_app)));
        }
        if !self.shaping_tool.is_empty() {
            let Some(tool) = resolve_program(&self.shaping_tool) else {
                return Err(GymError::Config(format!("shaping tool {:?} not found", self.shaping_tool)));
            };
            debug!("shaping tool {:?} resolved to {tool:?}", self.shaping_tool);
        }
        if !self.sender_config.is_file() {
            return Err(GymError::Config(format!("sender config {:?} does not exist", self.sender_config)));
        }
        let receiver = ReceiverMediaConfig::read(&self.receiver_config)?;
        if !receiver.enabled {
            return Err(GymError::Config(format!("receiver is disabled in {:?}", self.receiver_config)));
        }
        debug!(
            "receiver config {:?} declares listening port {:?}; episodes use the port file instead",
            self.receiver_config, receiver.listening_port
        );
        Ok(())
    }

    /// The watchdog deadline for a trace: its pattern duration plus the exit timeout for JSON
    /// network traces, capped by the episode timeout.
    pub fn episode_deadline(&self, trace: &Path) -> Duration {
        match NetworkTrace::try_read(trace) {
            Some(network_trace) => (network_trace.total_duration() + self.exit_timeout).min(self.episode_timeout),
            None => self.episode_timeout,
        }
    }

    fn receiver_command(&self, port_file: &Path, episode_dir: &Path) -> Command {
        let mut command = Command::new(&self.call_app);
        command
            .arg(&self.receiver_config)
            .arg(&self.dest_ip)
            .arg(port_file)
            .arg(episode_dir.join(RECEIVER_LOG_NAME))
            .current_dir(episode_dir);
        command
    }

    fn sender_command(&self, trace: &Path, port_file: &Path, episode_dir: &Path) -> Command {
        let mut command = if self.shaping_tool.is_empty() {
            Command::new(&self.call_app)
        } else {
            let mut command = Command::new(&self.shaping_tool);
            command.arg(trace).arg(trace).arg(&self.call_app);
            command
        };
        command
            .arg(&self.sender_config)
            .arg(&self.dest_ip)
            .arg(port_file)
            .arg(episode_dir.join(SENDER_LOG_NAME))
            .current_dir(episode_dir);
        command
    }
}

/// Finds `program` the way `Command` does: as a path when it names a directory, otherwise on `PATH`.
fn resolve_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Launches calls: one trace, one port and a receiver/sender pair per episode.
pub struct Call {
    catalog: TraceCatalog,
    ports: PortPool,
    settings: CallSettings,
}

impl Call {
    pub fn new(catalog: TraceCatalog, ports: PortPool, settings: CallSettings) -> Self {
        Self {
            catalog,
            ports,
            settings,
        }
    }

    pub fn settings(&self) -> &CallSettings {
        &self.settings
    }

    /// Starts the next call with its files under `episode_dir`. The receiver starts first; the
    /// sender follows after the start delay.
    pub fn start_call(&mut self, episode_dir: &Path) -> Result<CallSession> {
        let trace = self.catalog.select_trace().to_path_buf();
        let port = self.ports.allocate_port();

        std::fs::create_dir_all(episode_dir)?;
        let port_file = episode_dir.join(PORT_FILE_NAME);
        write_port_file(&port_file, port)?;

        let timeouts = SessionTimeouts {
            episode_deadline: self.settings.episode_deadline(&trace),
            exit_timeout: self.settings.exit_timeout,
            poll_interval: self.settings.poll_interval,
        };

        info!("Starting call on port {port} with trace {trace:?}");
        let receiver =
            CapturedCommand::new_with_piped_io("receiver", self.settings.receiver_command(&port_file, episode_dir))?;
        let mut session = CallSession::new(receiver, trace, port, timeouts);

        if !self.settings.sender_start_delay.is_zero() {
            thread::sleep(self.settings.sender_start_delay);
        }

        // On failure the session is dropped, which kills the receiver.
        let sender = CapturedCommand::new_detached(
            "sender",
            self.settings.sender_command(session.trace(), &port_file, episode_dir),
        )?;
        session.start(sender)?;

        Ok(session)
    }
}

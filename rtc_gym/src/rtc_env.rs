use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use decision_engine::reward::normalize_rewards;
use decision_engine::{
    Action, CheckpointName, DecisionEngine, Engine, EngineKind, EpisodeStats, Normalizer, RewardInputs, StateHistory,
    StateVector, Transition, compute_reward,
};
use packet_stats::{PacketStatsWindow, WindowConfig};
use tracing::{debug, info, trace, warn};

use crate::call::{Call, EpisodeStatus, TraceType};
use crate::errors::{GymError, Result};
use crate::line_protocol::{self, BandwidthController, LineProtocolError, TelemetryLine, dispatch_loop};

/// Horizons and coefficients the controller turns window statistics into decisions with.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub short_window_ms: u64,
    pub long_window_ms: u64,
    pub history_len: usize,
    pub rtt_coeff: f64,
    pub initial_bandwidth_bps: f64,
    pub normalizer: Normalizer,
    pub window: WindowConfig,
}

/// Connects the receiver's line protocol to the decision engine.
///
/// Telemetry goes into the packet window. On every request the controller samples the window
/// into the state history, credits the reward earned since the previous request to the previous
/// (state, action) pair, and asks the engine for the next estimate.
pub struct GymController {
    settings: ControllerSettings,
    engine: Engine,
    window: PacketStatsWindow,
    history: StateHistory,
    latest_bwe_bps: f64,
    previous: Option<(StateVector, Action)>,
    rewards: Vec<f64>,
    telemetry_lines: u64,
}

impl GymController {
    pub fn new(engine: Engine, settings: ControllerSettings) -> Self {
        let window = PacketStatsWindow::new(WindowConfig {
            initial_horizon_ms: settings.long_window_ms,
            ..settings.window.clone()
        });
        let history = StateHistory::new(settings.history_len);
        let latest_bwe_bps = settings.initial_bandwidth_bps;
        Self {
            settings,
            engine,
            window,
            history,
            latest_bwe_bps,
            previous: None,
            rewards: Vec::new(),
            telemetry_lines: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Clears everything carried by the previous episode.
    pub fn begin_episode(&mut self) {
        self.window.reset();
        self.history.clear();
        self.latest_bwe_bps = self.settings.initial_bandwidth_bps;
        self.previous = None;
        self.rewards.clear();
        self.telemetry_lines = 0;
        self.engine.begin_episode();
    }

    pub fn steps(&self) -> usize {
        self.rewards.len()
    }

    pub fn telemetry_lines(&self) -> u64 {
        self.telemetry_lines
    }

    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    fn decide(&mut self) -> decision_engine::Result<f64> {
        let short = self.settings.short_window_ms;
        let long = self.settings.long_window_ms;

        let sample = self.settings.normalizer.sample(
            self.window.loss_ratio(short),
            self.window.average_delay(short),
            self.window.receiving_rate(short),
        );
        self.history.push(sample);
        let state = self.history.vector();

        let inputs = RewardInputs {
            receiving_rate_bps: self.window.receiving_rate(long),
            average_delay_ms: self.window.average_delay(long),
            loss_ratio: self.window.loss_ratio(long),
        };
        // The estimate the newest packets were sent under, falling back to the last one handed out.
        let reward_bwe_bps = self
            .window
            .latest_bandwidth_prediction()
            .map_or(self.latest_bwe_bps, |bps| bps as f64);
        let reward = compute_reward(inputs, reward_bwe_bps, self.settings.rtt_coeff);
        self.rewards.push(reward);

        if let Some((previous_state, action)) = self.previous.take() {
            self.engine.observe(Transition {
                state: previous_state,
                action,
                reward,
                next_state: state.clone(),
            })?;
        }

        let (action, bps) = self.engine.estimate(&state)?;
        trace!(?sample, reward, bps, "decision");
        self.latest_bwe_bps = bps;
        self.previous = Some((state, action));
        Ok(bps)
    }
}

impl BandwidthController for GymController {
    fn on_telemetry(&mut self, telemetry: TelemetryLine) {
        let record = telemetry.into_record(self.latest_bwe_bps.max(0.0) as u64);
        self.window.on_receive(record);
        self.telemetry_lines += 1;
    }

    fn estimate(&mut self) -> line_protocol::errors::Result<f64> {
        self.decide().map_err(LineProtocolError::estimate)
    }

    fn on_other_line(&mut self, line: &str) {
        if line.starts_with('{') {
            debug!("malformed telemetry: {line}");
        } else {
            trace!("receiver: {line}");
        }
    }
}

/// How episodes are numbered, labelled and persisted.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub trace_type: TraceType,
    /// The first episode number; later than 1 when resuming from a checkpoint.
    pub starting_episode: u64,
    pub total_episodes: u64,
    pub ckpt_interval: u64,
    /// Calls that produce no steps are retried under the same episode number. `None` retries
    /// without limit.
    pub max_episode_retries: Option<u64>,
    pub ckpt_dir: PathBuf,
    /// Per-episode working directories are created under this directory.
    pub episodes_dir: PathBuf,
}

/// The outcome of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeReport {
    pub episode: u64,
    /// 0 for the first call of an episode, then counts retries.
    pub retry: u64,
    pub status: EpisodeStatus,
    pub trace: PathBuf,
    pub port: u16,
    pub telemetry_lines: u64,
    pub stats: EpisodeStats,
    pub checkpoint: Option<PathBuf>,
}

/// Runs episodes one after another: start a call, answer the receiver until its stream ends,
/// supervise the exit, then record and persist.
pub struct RtcEnv {
    call: Call,
    controller: GymController,
    settings: RunSettings,
}

impl RtcEnv {
    pub fn new(call: Call, controller: GymController, settings: RunSettings) -> Self {
        Self {
            call,
            controller,
            settings,
        }
    }

    pub fn controller(&self) -> &GymController {
        &self.controller
    }

    /// Runs episodes up to `total_episodes`. An episode only counts once its call produced at
    /// least one step; killed or silent calls are reported and retried under the same number.
    pub fn run(&mut self) -> Result<Vec<EpisodeReport>> {
        let mut reports = Vec::new();
        let mut episode = self.settings.starting_episode;
        let mut retry = 0;
        while episode <= self.settings.total_episodes {
            let mut report = self.run_episode(episode, retry)?;

            if report.stats.len == 0 {
                warn!(episode, retry, status = %report.status, "Episode {episode} produced no steps");
                reports.push(report);
                retry += 1;
                if let Some(max) = self.settings.max_episode_retries
                    && retry > max
                {
                    self.log_summary(&reports);
                    return Err(GymError::EpisodeRetriesExhausted {
                        episode,
                        attempts: retry,
                    });
                }
                continue;
            }

            report.checkpoint = self.post_episode(episode)?;
            reports.push(report);
            episode += 1;
            retry = 0;
        }
        self.log_summary(&reports);
        Ok(reports)
    }

    fn label(&self) -> String {
        self.controller.engine().kind().to_string()
    }

    fn run_episode(&mut self, episode: u64, retry: u64) -> Result<EpisodeReport> {
        let label = self.label();
        let total = self.settings.total_episodes;
        self.controller.begin_episode();

        let dir_name = match retry {
            0 => format!("episode{episode}"),
            _ => format!("episode{episode}-retry{retry}"),
        };
        let episode_dir = self.settings.episodes_dir.join(dir_name);
        let mut session = self.call.start_call(&episode_dir)?;
        let trace = session.trace().to_path_buf();
        info!(episode, trace = %trace.display(), port = session.port(), "{label} EPISODE {episode}/{total}: Starting");

        let status = if session.check_started()? {
            let (stdout, stdin) = session.receiver_io()?;
            match dispatch_loop(BufReader::new(stdout), stdin, &mut self.controller) {
                Ok(summary) => debug!(?summary, "receiver stream ended"),
                Err(e) if e.is_broken_pipe() => debug!("receiver closed its input: {e}"),
                Err(e) => return Err(e.into()),
            }
            session.supervise()?
        } else {
            EpisodeStatus::Killed
        };

        let stats = EpisodeStats::from_rewards(self.controller.rewards());
        info!(
            episode,
            %status,
            trace = %trace.display(),
            steps = stats.len,
            mean_reward = stats.mean,
            "{label} EPISODE {episode}/{total} Finished (avg. episode reward: {:.4} episode len: {} status: {status})",
            stats.mean,
            stats.len
        );
        debug!("EPISODE {episode} norm step rewards {:?}", normalize_rewards(self.controller.rewards()));

        Ok(EpisodeReport {
            episode,
            retry,
            status,
            port: session.port(),
            trace,
            telemetry_lines: self.controller.telemetry_lines(),
            stats,
            checkpoint: None,
        })
    }

    /// Writes a checkpoint every `ckpt_interval` episodes for engines that learn.
    fn post_episode(&mut self, episode: u64) -> Result<Option<PathBuf>> {
        let engine = self.controller.engine();
        let EngineKind::Learned(algorithm) = engine.kind() else {
            return Ok(None);
        };
        if !engine.is_persistent() || self.settings.ckpt_interval == 0 || episode % self.settings.ckpt_interval != 0 {
            return Ok(None);
        }

        let name = CheckpointName::new(
            algorithm,
            engine.checkpoint_ladder(),
            &self.settings.trace_type.to_string(),
            episode,
        );
        std::fs::create_dir_all(&self.settings.ckpt_dir)?;
        let path = self.settings.ckpt_dir.join(name.file_name());
        engine.save(&path)?;
        info!("Saved checkpoint {}", display_name(&path));
        Ok(Some(path))
    }

    fn log_summary(&self, reports: &[EpisodeReport]) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for report in reports {
            *counts.entry(report.status.to_string()).or_default() += 1;
        }
        let means: Vec<f64> = reports.iter().filter(|r| r.stats.len > 0).map(|r| r.stats.mean).collect();
        let mean_of_means = EpisodeStats::from_rewards(&means).mean;

        info!(
            episodes = means.len(),
            calls = reports.len(),
            ?counts,
            mean_reward = mean_of_means,
            "{} run finished: {} episodes in {} calls, statuses {counts:?}, mean episode reward {mean_of_means:.4}",
            self.label(),
            means.len(),
            reports.len()
        );
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

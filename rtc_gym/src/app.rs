use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{ArgAction, Args, Parser};
use decision_engine::checkpoint::resolve_checkpoint_path;
use decision_engine::{
    ActionSpaceType, Algorithm, CheckpointName, EngineFactory, LadderKind, LearnerSettings, Mode, Normalizer,
};
use gym_config::GymConfig;
use gym_logging::{LoggingConfig, dated_log_dir, init_logging};
use packet_stats::WindowConfig;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::call::{Call, CallSettings, PortPool, TraceCatalog, TraceSelection, TraceType};
use crate::constants::{CHECKPOINTS_DIR, CURRENT_VERSION, EMU_GYM_PATH_ENV, EPISODES_DIR, PROGRAM_NAME, TRAINING_DIR};
use crate::errors::{Result, config_error};
use crate::rtc_env::{ControllerSettings, EpisodeReport, GymController, RtcEnv, RunSettings};

#[derive(Args, Debug)]
struct CliOverrides {
    /// Increase verbosity of output (-v, -vv, etc.)
    #[clap(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Set the output log file or directory. Defaults to the dated log directory under the base path.
    #[clap(long, short)]
    pub log: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Root of the gym layout (traces, media configs, call app). Defaults to $EMU_GYM_PATH.
    #[clap(long)]
    base_path: Option<PathBuf>,

    /// Train the policy, or evaluate a saved one.
    #[clap(long, default_value = "train")]
    mode: Mode,

    /// Trace pools to draw calls from: simple, belgium, fcc, norway, or a "+" combination.
    #[clap(long, default_value = "belgium")]
    trace_type: TraceType,

    /// Learning algorithm: PPO, A2C, DQN, TD3 or SAC.
    #[clap(long, default_value = "PPO")]
    rl_algo: Algorithm,

    #[clap(long, default_value = "continuous")]
    action_space_type: ActionSpaceType,

    /// Bitrate ladder used by discrete action spaces.
    #[clap(long, default_value = "loki")]
    discrete_action_space_type: LadderKind,

    /// Number of the last episode to run.
    #[clap(long, default_value_t = 1)]
    total_episodes: u64,

    /// Save a checkpoint every this many episodes while training.
    #[clap(long, default_value_t = 2)]
    ckpt_interval: u64,

    /// Give up after this many consecutive calls without a single step. Retries forever when unset.
    #[clap(long)]
    max_episode_retries: Option<u64>,

    /// Checkpoint directory. Defaults to rl_training/checkpoints under the base path.
    #[clap(long)]
    ckpt_dir: Option<PathBuf>,

    /// Weight of the delay penalty in the reward.
    #[clap(long, default_value_t = 1.0)]
    rtt_coeff: f64,

    /// Checkpoint to resume from, by name or path.
    #[clap(long)]
    ckpt: Option<String>,

    /// Use the loss-based GCC baseline instead of a learned policy.
    #[clap(long)]
    gcc: bool,

    /// Video resolution of the media configs.
    #[clap(long, value_parser = ["360p", "720p", "1080p"])]
    video_res: Option<String>,

    /// Draw traces at random instead of cycling through them in order.
    #[clap(long)]
    shuffle_traces: bool,
}

/// Runs congestion-control episodes: real-time calls between a sender and a receiver over a
/// shaped network trace, with a decision engine answering the receiver's bandwidth requests.
///
/// The base path ($EMU_GYM_PATH) holds rl_training/traces, the receiver_<res>.json and
/// sender_<res>.json media configs and the call app.
#[derive(Parser, Debug)]
#[clap(name = PROGRAM_NAME, version = CURRENT_VERSION, verbatim_doc_comment)]
pub struct RtcGymApp {
    #[clap(flatten)]
    overrides: CliOverrides,

    #[clap(flatten)]
    run: RunArgs,
}

impl RtcGymApp {
    pub fn run(self) -> Result<()> {
        let config = GymConfig::new();
        let base_path = self.base_path()?;

        let log_config = LoggingConfig::new(
            &config.log,
            self.overrides.log.as_ref().map(|p| p.to_string_lossy().into_owned()),
            Some(dated_log_dir(&base_path)),
            self.overrides.verbose,
            format!("{PROGRAM_NAME} v{CURRENT_VERSION}"),
        );
        init_logging(log_config);

        let mut env = self.prepare(config, &base_path)?;
        env.run()?;
        Ok(())
    }

    fn base_path(&self) -> Result<PathBuf> {
        match &self.run.base_path {
            Some(path) => Ok(path.clone()),
            None => std::env::var(EMU_GYM_PATH_ENV)
                .map(PathBuf::from)
                .map_err(|_| config_error(format!("--base-path not given and ${EMU_GYM_PATH_ENV} is not set"))),
        }
    }

    fn ckpt_dir(&self, base_path: &Path) -> PathBuf {
        self.run
            .ckpt_dir
            .clone()
            .unwrap_or_else(|| base_path.join(TRAINING_DIR).join(CHECKPOINTS_DIR))
    }

    /// The first episode to run: after the checkpoint's episode when resuming training.
    fn starting_episode(&self) -> Result<u64> {
        let Some(name) = &self.run.ckpt else {
            return Ok(1);
        };
        let parsed = CheckpointName::parse(name)?;
        Ok(match self.run.mode {
            Mode::Train => parsed.episode + 1,
            Mode::Eval => 1,
        })
    }

    /// Validates the whole setup and builds the episode loop. Nothing is spawned here.
    fn prepare(&self, mut config: GymConfig, base_path: &Path) -> Result<RtcEnv> {
        let args = &self.run;
        if let Some(res) = &args.video_res {
            config.call.video_res = res.clone();
        }
        if !args.rtt_coeff.is_finite() {
            return Err(config_error(format!("rtt coefficient {} is not finite", args.rtt_coeff)));
        }

        let ckpt_dir = self.ckpt_dir(base_path);
        let starting_episode = self.starting_episode()?;

        let engine_config = &config.engine;
        let factory = EngineFactory {
            algorithm: args.rl_algo,
            mode: args.mode,
            use_loss_baseline: args.gcc,
            action_space: args.action_space_type,
            ladder: args.discrete_action_space_type,
            history_len: config.stats.history_len,
            min_bandwidth_bps: engine_config.min_bandwidth_bps,
            max_bandwidth_bps: engine_config.max_bandwidth_bps,
            initial_bandwidth_bps: engine_config.initial_bandwidth_bps,
            learner: LearnerSettings {
                learning_rate: engine_config.learning_rate,
                exploration_std: engine_config.exploration_std,
                epsilon: engine_config.epsilon,
                rollout_len: engine_config.rollout_len,
                replay_capacity: engine_config.replay_capacity,
                batch_size: engine_config.batch_size,
                seed: engine_config.seed,
            },
            checkpoint: (!args.gcc)
                .then(|| args.ckpt.as_deref().map(|name| resolve_checkpoint_path(&ckpt_dir, name)))
                .flatten(),
        };
        factory.validate()?;

        let selection = if args.shuffle_traces {
            TraceSelection::Random
        } else {
            TraceSelection::Sequential
        };
        let catalog =
            TraceCatalog::discover(base_path, &args.mode.to_string(), &args.trace_type, selection, engine_config.seed)?;

        let call_settings = CallSettings::from_config(&config.call, base_path);
        call_settings.validate()?;

        let mut rng = match engine_config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        let call_config = &config.call;
        let ports = PortPool::generate(
            call_config.port_pool_size,
            call_config.port_min,
            call_config.port_max,
            call_config.port_draw_attempts,
            &mut rng,
        )?;

        let engine = factory.build()?;
        let label = decision_engine::DecisionEngine::kind(&engine).to_string();

        let controller = GymController::new(
            engine,
            ControllerSettings {
                short_window_ms: config.stats.short_window_ms,
                long_window_ms: config.long_window_ms(),
                history_len: config.stats.history_len,
                rtt_coeff: args.rtt_coeff,
                initial_bandwidth_bps: engine_config.initial_bandwidth_bps,
                normalizer: Normalizer {
                    min_bandwidth_bps: engine_config.min_bandwidth_bps,
                    max_bandwidth_bps: engine_config.max_bandwidth_bps,
                    min_rtt_ms: engine_config.min_rtt_ms,
                    max_rtt_ms: engine_config.max_rtt_ms,
                },
                window: WindowConfig {
                    sequence_number_bits: config.stats.sequence_number_bits,
                    base_delay_ms: config.stats.base_delay_ms,
                    ..WindowConfig::default()
                },
            },
        );

        let episodes_dir = base_path.join(TRAINING_DIR).join(EPISODES_DIR).join(format!(
            "{label}-{}-{}",
            args.trace_type,
            Local::now().format("%Y-%m-%d-%H-%M-%S")
        ));

        if starting_episode > args.total_episodes {
            warn!("Starting episode {starting_episode} is past the last episode {}; nothing to run", args.total_episodes);
        }
        info!(
            "{label} {} on {} ({} traces), episodes {starting_episode}..={}, checkpoints in {ckpt_dir:?}",
            args.mode,
            args.trace_type,
            catalog.len(),
            args.total_episodes
        );

        Ok(RtcEnv::new(
            Call::new(catalog, ports, call_settings),
            controller,
            RunSettings {
                trace_type: args.trace_type.clone(),
                starting_episode,
                total_episodes: args.total_episodes,
                ckpt_interval: args.ckpt_interval,
                max_episode_retries: args.max_episode_retries,
                ckpt_dir,
                episodes_dir,
            },
        ))
    }

    /// Builds and runs the episode loop without touching the global logger.
    pub fn run_with_config(self, config: GymConfig) -> Result<Vec<EpisodeReport>> {
        let base_path = self.base_path()?;
        self.prepare(config, &base_path)?.run()
    }
}

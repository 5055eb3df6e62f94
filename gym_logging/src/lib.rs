use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local};
use gym_config::groups::log::ConfigValueGroup as LogConfig;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default log levels. Override using the `RUST_LOG` env variable.
const DEFAULT_LOG_LEVEL_FILE: &str = "info";
const DEFAULT_LOG_LEVEL_CONSOLE: &str = "warn";

#[derive(Clone, Debug, PartialEq)]
pub enum LoggingMode {
    Directory(PathBuf),
    File(PathBuf),
    Console,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub logging_mode: LoggingMode,
    pub use_json: bool,
    pub prefix: String,
    /// Number of `-v` flags given on the command line.
    pub verbosity: u8,
    pub version: String,
}

impl LoggingConfig {
    /// Resolve the logging mode. An explicit destination (the `--log` flag) wins over
    /// `RTC_GYM_LOG_DEST`; with neither, logs go to `default_dir`, or to the console if there is none.
    pub fn new(
        log_config: &LogConfig,
        explicit_dest: Option<String>,
        default_dir: Option<PathBuf>,
        verbosity: u8,
        version: String,
    ) -> LoggingConfig {
        let logging_mode = match explicit_dest.or_else(|| log_config.dest.clone()) {
            Some(log_dest) if log_dest.is_empty() => LoggingMode::Console,
            Some(log_dest) => {
                let path = PathBuf::from(&log_dest);
                if log_dest.ends_with('/') || log_dest.ends_with('\\') || path.is_dir() {
                    LoggingMode::Directory(path)
                } else {
                    LoggingMode::File(path)
                }
            },
            None => match default_dir {
                Some(dir) => LoggingMode::Directory(dir),
                None => LoggingMode::Console,
            },
        };

        let use_json = match &log_config.format {
            Some(format) => format.to_ascii_lowercase().trim() == "json",
            None => logging_mode != LoggingMode::Console,
        };

        Self {
            logging_mode,
            use_json,
            prefix: log_config.prefix.clone(),
            verbosity,
            version,
        }
    }

    fn console_level(&self) -> &'static str {
        match self.verbosity {
            0 => DEFAULT_LOG_LEVEL_CONSOLE,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// `<base>/rl_training/logs/<YYYY-MM-DD>`, the default log directory for a run.
pub fn dated_log_dir(base_path: impl AsRef<Path>) -> PathBuf {
    base_path
        .as_ref()
        .join("rl_training")
        .join("logs")
        .join(Local::now().format("%Y-%m-%d").to_string())
}

/// The main entry point to set up logging. Should only be called once.
pub fn init_logging(cfg: LoggingConfig) {
    let maybe_log_file: Option<PathBuf> = match &cfg.logging_mode {
        LoggingMode::Directory(log_dir) => Some(log_file_in_dir(log_dir, &cfg.prefix)),
        LoggingMode::File(path_buf) => Some(path_buf.clone()),
        LoggingMode::Console => None,
    };

    if let Some(log_file) = maybe_log_file {
        // Attempt logging to a file, but fallback to console logging on error.
        if let Err(e) = init_logging_to_file(&log_file, &cfg) {
            init_logging_to_console(&cfg);
            error!("Error logging to file {log_file:?} ({e}); falling back to console logging.");
        } else {
            info!("Logging to {log_file:?}");
        }
    } else {
        init_logging_to_console(&cfg);
    }

    info!("{}", &cfg.version);
}

fn init_logging_to_console(cfg: &LoggingConfig) {
    let registry = tracing_subscriber::registry();

    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false);
    let fmt_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cfg.console_level()))
        .unwrap_or_default();

    if cfg.use_json {
        registry.with(fmt_layer_base.json().with_filter(fmt_filter)).init();
    } else {
        registry.with(fmt_layer_base.pretty().with_filter(fmt_filter)).init();
    }
}

fn init_logging_to_file(path: &Path, cfg: &LoggingConfig) -> Result<(), std::io::Error> {
    use std::ffi::OsString;

    use tracing_appender::{non_blocking, rolling};

    let (path, file_name) = match path.file_name() {
        Some(name) => (path.to_path_buf(), name.to_os_string()),
        None => {
            let name = OsString::from(format!("{}.log", cfg.prefix));
            (path.join(&name), name)
        },
    };

    let log_directory = match path.parent() {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        },
        None => Path::new("."),
    };

    // Make sure the log location is writeable so we error early here and dump to stderr on failure.
    std::fs::write(&path, [])?;

    let file_appender = rolling::never(log_directory, file_name);
    let (writer, guard) = non_blocking(file_appender);

    // The guard must outlive the process or buffered lines are lost.
    static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_writer(writer);
    let level = if cfg.verbosity > 1 { cfg.console_level() } else { DEFAULT_LOG_LEVEL_FILE };
    let fmt_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_default();

    let registry = tracing_subscriber::registry();
    if cfg.use_json {
        registry.with(fmt_layer_base.json().with_filter(fmt_filter)).init();
    } else {
        registry.with(fmt_layer_base.pretty().with_filter(fmt_filter)).init();
    }

    Ok(())
}

/// Build `<prefix>_<YYYYMMDD>T<HHMMSS><mmm><+/-HHMM>_<pid>.log` in `dir`.
/// Timestamp is in local time with numeric offset (e.g., -0700), filename-safe.
pub fn log_file_in_dir(dir: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let now_local: DateTime<Local> = Local::now();
    let now_fixed: DateTime<FixedOffset> = now_local.with_timezone(now_local.offset());

    let ts = now_fixed.format("%Y%m%dT%H%M%S%3f%z");

    let pid = std::process::id();
    dir.as_ref().join(format!("{prefix}_{ts}_{pid}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_group() -> LogConfig {
        LogConfig::default()
    }

    #[test]
    fn log_file_name_layout() {
        let path = log_file_in_dir(Path::new("/tmp"), "rtc_gym");
        assert_eq!(path.parent().unwrap(), Path::new("/tmp"));

        let pid = std::process::id();
        let fname = path.file_name().unwrap().to_str().unwrap();
        let ts = fname
            .strip_prefix("rtc_gym_")
            .unwrap()
            .strip_suffix(&format!("_{pid}.log"))
            .unwrap();
        assert!(DateTime::parse_from_str(ts, "%Y%m%dT%H%M%S%3f%z").is_ok(), "{ts}");
    }

    #[test]
    fn mode_selection() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap().to_string();

        let cfg = LoggingConfig::new(&log_group(), Some(String::new()), None, 0, "v".into());
        assert_eq!(cfg.logging_mode, LoggingMode::Console);
        assert!(!cfg.use_json);

        let cfg = LoggingConfig::new(&log_group(), Some(dir_str.clone()), None, 0, "v".into());
        assert_eq!(cfg.logging_mode, LoggingMode::Directory(dir.path().to_path_buf()));
        assert!(cfg.use_json);

        let file = dir.path().join("gym.log");
        let cfg = LoggingConfig::new(&log_group(), Some(file.to_str().unwrap().into()), None, 0, "v".into());
        assert_eq!(cfg.logging_mode, LoggingMode::File(file));

        let cfg = LoggingConfig::new(&log_group(), None, Some(dir.path().join("logs")), 0, "v".into());
        assert_eq!(cfg.logging_mode, LoggingMode::Directory(dir.path().join("logs")));

        let cfg = LoggingConfig::new(&log_group(), None, None, 0, "v".into());
        assert_eq!(cfg.logging_mode, LoggingMode::Console);
    }

    #[test]
    fn explicit_format_and_verbosity() {
        let mut group = log_group();
        group.format = Some("JSON".into());
        let cfg = LoggingConfig::new(&group, Some(String::new()), None, 2, "v".into());
        assert!(cfg.use_json);
        assert_eq!(cfg.console_level(), "debug");

        group.format = Some("text".into());
        let cfg = LoggingConfig::new(&group, None, Some(PathBuf::from("/tmp/x/")), 0, "v".into());
        assert!(!cfg.use_json);
        assert_eq!(cfg.console_level(), "warn");
    }

    #[test]
    fn dated_dir_layout() {
        let dir = dated_log_dir("/opt/gym");
        let date = dir.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(dir.parent().unwrap(), Path::new("/opt/gym/rl_training/logs"));
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
    }
}

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::action::{ActionSpaceType, LadderKind};
use crate::algorithm::Algorithm;
use crate::error::{EngineError, Result};
use crate::linear_policy::LinearPolicy;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const EXTENSION: &str = "json";

/// `<TAG>-ckpt-<trace_type>-episode<N>-<YYYY-MM-DD-HH-MM-SS>`, where the tag is the algorithm
/// name, suffixed with the ladder for DQN (`DQN-loki`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointName {
    pub tag: String,
    pub trace_type: String,
    pub episode: u64,
    pub timestamp: NaiveDateTime,
}

impl CheckpointName {
    pub fn new(algorithm: Algorithm, ladder: Option<LadderKind>, trace_type: &str, episode: u64) -> Self {
        let tag = match (algorithm, ladder) {
            (Algorithm::DQN, Some(ladder)) => format!("{algorithm}-{ladder}"),
            _ => algorithm.to_string(),
        };
        Self {
            tag,
            trace_type: trace_type.to_string(),
            episode,
            timestamp: Local::now().naive_local(),
        }
    }

    pub fn stem(&self) -> String {
        format!(
            "{}-ckpt-{}-episode{}-{}",
            self.tag,
            self.trace_type,
            self.episode,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )
    }

    pub fn file_name(&self) -> String {
        format!("{}.{EXTENSION}", self.stem())
    }

    /// Parses a checkpoint name, a file name, or a full path.
    pub fn parse(name: &str) -> Result<Self> {
        let malformed = || EngineError::CheckpointName(name.to_string());

        let file_name = Path::new(name).file_name().and_then(|n| n.to_str()).ok_or_else(malformed)?;
        let stem = file_name
            .strip_suffix(&format!(".{EXTENSION}"))
            .unwrap_or(file_name);

        let (tag, rest) = stem.split_once("-ckpt-").ok_or_else(malformed)?;
        let (trace_type, rest) = rest.rsplit_once("-episode").ok_or_else(malformed)?;
        let (episode, timestamp) = rest.split_once('-').ok_or_else(malformed)?;

        if tag.is_empty() || trace_type.is_empty() {
            return Err(malformed());
        }
        let episode = episode.parse::<u64>().map_err(|_| malformed())?;
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|_| malformed())?;

        Ok(Self {
            tag: tag.to_string(),
            trace_type: trace_type.to_string(),
            episode,
            timestamp,
        })
    }
}

/// Persisted state of a learned engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub algorithm: Algorithm,
    pub action_space: ActionSpaceType,
    pub ladder: Option<LadderKind>,
    pub history_len: usize,
    pub updates: u64,
    pub policy: LinearPolicy,
}

impl Checkpoint {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("Saved {} checkpoint to {path:?}", self.algorithm);
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
        info!("Loaded {} checkpoint from {path:?}", checkpoint.algorithm);
        Ok(checkpoint)
    }
}

/// Resolves a checkpoint argument against the checkpoint directory, adding the extension when
/// the bare name does not exist.
pub fn resolve_checkpoint_path(ckpt_dir: &Path, name: &str) -> PathBuf {
    let direct = Path::new(name);
    let candidates = [
        direct.to_path_buf(),
        ckpt_dir.join(name),
        ckpt_dir.join(format!("{name}.{EXTENSION}")),
    ];
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .unwrap_or_else(|| ckpt_dir.join(name))
}

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::constants::{SIMPLE_TRACE, TRACES_DIR, TRAINING_DIR};
use crate::errors::{GymError, Result};

/// A named pool of recorded network traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracePool {
    Belgium,
    Fcc,
    Norway,
}

impl TracePool {
    fn name(&self) -> &'static str {
        match self {
            TracePool::Belgium => "belgium",
            TracePool::Fcc => "fcc",
            TracePool::Norway => "norway",
        }
    }

    /// `<base>/rl_training/traces/<mode>/<pool>_<mode>`
    pub fn dir(&self, base_path: &Path, mode: &str) -> PathBuf {
        base_path
            .join(TRAINING_DIR)
            .join(TRACES_DIR)
            .join(mode)
            .join(format!("{}_{mode}", self.name()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceType {
    /// A single fixed 300 kbps trace.
    Simple,
    Pools(Vec<TracePool>),
}

impl TraceType {
    pub fn pools(&self) -> &[TracePool] {
        match self {
            TraceType::Simple => &[],
            TraceType::Pools(pools) => pools,
        }
    }
}

impl FromStr for TraceType {
    type Err = GymError;

    fn from_str(s: &str) -> Result<Self> {
        use TracePool::*;
        let pools = match s.trim() {
            "simple" => return Ok(TraceType::Simple),
            "belgium" => vec![Belgium],
            "fcc" => vec![Fcc],
            "norway" => vec![Norway],
            "belgium+fcc" => vec![Belgium, Fcc],
            "belgium+norway" => vec![Belgium, Norway],
            "fcc+norway" => vec![Fcc, Norway],
            "belgium+fcc+norway" => vec![Fcc, Norway, Belgium],
            other => return Err(GymError::UnsupportedTraceType(other.to_string())),
        };
        Ok(TraceType::Pools(pools))
    }
}

impl fmt::Display for TraceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceType::Simple => write!(f, "simple"),
            // The three-pool set is listed in its canonical order regardless of iteration order.
            TraceType::Pools(pools) if pools.len() == 3 => write!(f, "belgium+fcc+norway"),
            TraceType::Pools(pools) => {
                let names: Vec<&str> = pools.iter().map(|p| p.name()).collect();
                write!(f, "{}", names.join("+"))
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSelection {
    /// Cycle through the catalog in order.
    Sequential,
    /// Draw uniformly at random for every call.
    Random,
}

/// The traces a run draws from, fixed at startup.
#[derive(Debug)]
pub struct TraceCatalog {
    traces: Vec<PathBuf>,
    selection: TraceSelection,
    next: usize,
    rng: ChaCha8Rng,
}

impl TraceCatalog {
    pub fn new(traces: Vec<PathBuf>, selection: TraceSelection, seed: Option<u64>) -> Result<Self> {
        if traces.is_empty() {
            return Err(GymError::NoTraces("trace catalog is empty".to_string()));
        }
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            traces,
            selection,
            next: 0,
            rng,
        })
    }

    /// Lists every trace of `trace_type` under the base path, each pool sorted by file name.
    pub fn discover(
        base_path: &Path,
        mode: &str,
        trace_type: &TraceType,
        selection: TraceSelection,
        seed: Option<u64>,
    ) -> Result<Self> {
        let traces = match trace_type {
            TraceType::Simple => {
                let trace = base_path.join(TRAINING_DIR).join(TRACES_DIR).join(SIMPLE_TRACE);
                if !trace.is_file() {
                    return Err(GymError::NoTraces(format!("{trace:?} does not exist")));
                }
                vec![trace]
            },
            TraceType::Pools(pools) => {
                let mut traces = Vec::new();
                for pool in pools {
                    traces.extend(list_pool(&pool.dir(base_path, mode))?);
                }
                traces
            },
        };

        if traces.is_empty() {
            return Err(GymError::NoTraces(format!("no {trace_type} traces for mode {mode} under {base_path:?}")));
        }

        info!("Found {} {trace_type} traces for {mode}", traces.len());
        Self::new(traces, selection, seed)
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn select_trace(&mut self) -> &Path {
        let idx = match self.selection {
            TraceSelection::Sequential => {
                let idx = self.next % self.traces.len();
                self.next = (idx + 1) % self.traces.len();
                idx
            },
            TraceSelection::Random => self.rng.random_range(0..self.traces.len()),
        };
        &self.traces[idx]
    }
}

fn list_pool(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

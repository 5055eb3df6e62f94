use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Maps `bps` clipped to `[min_bps, max_bps]` onto `[0, 1]` on a log scale.
pub fn linear_to_log(bps: f64, min_bps: f64, max_bps: f64) -> f64 {
    if !(min_bps > 0.0 && max_bps > min_bps) {
        return 0.0;
    }
    let clipped = bps.clamp(min_bps, max_bps);
    (clipped.ln() - min_bps.ln()) / (max_bps.ln() - min_bps.ln())
}

/// Inverse of [`linear_to_log`]: `a` clipped to `[0, 1]` onto `[min_bps, max_bps]`.
pub fn log_to_linear(a: f64, min_bps: f64, max_bps: f64) -> f64 {
    let a = if a.is_nan() { 0.0 } else { a.clamp(0.0, 1.0) };
    (a * (max_bps.ln() - min_bps.ln()) + min_bps.ln()).exp()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSpaceType {
    Continuous,
    Discrete,
}

impl FromStr for ActionSpaceType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" => Ok(Self::Continuous),
            "discrete" => Ok(Self::Discrete),
            other => Err(EngineError::unsupported(format!("action space type {other:?}"))),
        }
    }
}

impl fmt::Display for ActionSpaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::Discrete => write!(f, "discrete"),
        }
    }
}

/// The precomputed discrete ladders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LadderKind {
    /// 0.1 to 2.5 Mbps in 0.1 Mbps steps.
    Onrl,
    /// 0.1 to 2.96 Mbps in 0.13 Mbps steps.
    Loki,
}

impl FromStr for LadderKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onrl" => Ok(Self::Onrl),
            "loki" => Ok(Self::Loki),
            other => Err(EngineError::unsupported(format!("discrete action space {other:?}"))),
        }
    }
}

impl fmt::Display for LadderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Onrl => write!(f, "onrl"),
            Self::Loki => write!(f, "loki"),
        }
    }
}

/// Monotonically increasing list of bitrates a discrete action indexes into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitrateLadder {
    rungs: Vec<f64>,
}

impl BitrateLadder {
    pub fn new(start_bps: f64, step_bps: f64, count: usize) -> Self {
        Self {
            rungs: (0..count).map(|i| start_bps + i as f64 * step_bps).collect(),
        }
    }

    pub fn of_kind(kind: LadderKind) -> Self {
        match kind {
            LadderKind::Onrl => Self::new(100_000.0, 100_000.0, 25),
            LadderKind::Loki => Self::new(100_000.0, 130_000.0, 23),
        }
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    pub fn rungs(&self) -> &[f64] {
        &self.rungs
    }

    /// Out of range indices saturate at the top rung.
    pub fn bps(&self, index: usize) -> f64 {
        match self.rungs.last() {
            Some(last) => self.rungs.get(index).copied().unwrap_or(*last),
            None => 0.0,
        }
    }

    /// Index of the rung closest to `bps`.
    pub fn nearest(&self, bps: f64) -> usize {
        self.rungs
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - bps).abs().total_cmp(&(*b - bps).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// The action chosen by an engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Position in `[0, 1]` on the log bandwidth scale.
    Continuous(f64),
    /// Index into the bitrate ladder.
    Discrete(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActionSpace {
    Continuous { min_bps: f64, max_bps: f64 },
    Discrete(BitrateLadder),
}

impl ActionSpace {
    pub fn kind(&self) -> ActionSpaceType {
        match self {
            Self::Continuous { .. } => ActionSpaceType::Continuous,
            Self::Discrete(_) => ActionSpaceType::Discrete,
        }
    }

    pub fn to_bps(&self, action: Action) -> f64 {
        match (self, action) {
            (Self::Continuous { min_bps, max_bps }, Action::Continuous(a)) => log_to_linear(a, *min_bps, *max_bps),
            (Self::Discrete(ladder), Action::Discrete(i)) => ladder.bps(i),
            // Mismatched actions are mapped onto the closest meaning in this space.
            (Self::Continuous { min_bps, max_bps }, Action::Discrete(i)) => log_to_linear(i as f64, *min_bps, *max_bps),
            (Self::Discrete(ladder), Action::Continuous(a)) => {
                ladder.bps((a.clamp(0.0, 1.0) * (ladder.len().saturating_sub(1)) as f64).round() as usize)
            },
        }
    }

    /// The action that would produce `bps`.
    pub fn from_bps(&self, bps: f64) -> Action {
        match self {
            Self::Continuous { min_bps, max_bps } => Action::Continuous(linear_to_log(bps, *min_bps, *max_bps)),
            Self::Discrete(ladder) => Action::Discrete(ladder.nearest(bps)),
        }
    }
}

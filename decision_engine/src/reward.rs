use serde::Serialize;

/// Window statistics a reward is computed from, taken over the long horizon.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RewardInputs {
    pub receiving_rate_bps: f64,
    pub average_delay_ms: f64,
    pub loss_ratio: f64,
}

/// Per-decision reward.
///
/// The receive term is the loss-corrected rate as a fraction of the last estimate, so a sender that
/// fully uses its estimate without loss scores 1. Delay is penalized per second, scaled by `rtt_coeff`.
pub fn compute_reward(inputs: RewardInputs, latest_estimate_bps: f64, rtt_coeff: f64) -> f64 {
    let loss = inputs.loss_ratio.clamp(0.0, 1.0);

    let r_recv = if loss >= 1.0 || latest_estimate_bps <= 0.0 {
        0.0
    } else {
        (inputs.receiving_rate_bps / (1.0 - loss) / latest_estimate_bps).clamp(0.0, 1.0)
    };
    let r_delay = (inputs.average_delay_ms / 1000.0).clamp(0.0, 1.0);

    r_recv - rtt_coeff * r_delay - loss
}

/// Summary statistics over the rewards of one episode.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EpisodeStats {
    pub mean: f64,
    /// Population standard deviation.
    pub stdev: f64,
    pub len: usize,
}

impl EpisodeStats {
    pub fn from_rewards(rewards: &[f64]) -> Self {
        if rewards.is_empty() {
            return Self::default();
        }
        let len = rewards.len();
        let mean = rewards.iter().sum::<f64>() / len as f64;
        let var = rewards.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / len as f64;
        Self {
            mean,
            stdev: var.sqrt(),
            len,
        }
    }
}

/// Rewards standardized to zero mean and unit variance; a constant series maps to zeros.
pub fn normalize_rewards(rewards: &[f64]) -> Vec<f64> {
    let stats = EpisodeStats::from_rewards(rewards);
    if stats.stdev <= f64::EPSILON {
        return vec![0.0; rewards.len()];
    }
    rewards.iter().map(|r| (r - stats.mean) / stats.stdev).collect()
}

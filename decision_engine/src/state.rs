use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of features per history sample.
pub const FEATURES_PER_SAMPLE: usize = 3;

/// One observation taken at a decision point, every component in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSample {
    pub loss_rate: f64,
    pub normalized_rtt: f64,
    pub normalized_receiving_throughput: f64,
}

/// Maps raw window statistics into the unit range used by the state vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Normalizer {
    pub min_bandwidth_bps: f64,
    pub max_bandwidth_bps: f64,
    pub min_rtt_ms: f64,
    pub max_rtt_ms: f64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            min_bandwidth_bps: 300_000.0,
            max_bandwidth_bps: 6_000_000.0,
            min_rtt_ms: 1.0,
            max_rtt_ms: 3000.0,
        }
    }
}

impl Normalizer {
    pub fn normalize_rtt(&self, delay_ms: f64) -> f64 {
        let span = self.max_rtt_ms - self.min_rtt_ms;
        if span <= 0.0 {
            return 0.0;
        }
        ((delay_ms - self.min_rtt_ms) / span).clamp(0.0, 1.0)
    }

    /// Log-scaled position of `bps` within the bandwidth range.
    pub fn normalize_throughput(&self, bps: f64) -> f64 {
        crate::action::linear_to_log(bps, self.min_bandwidth_bps, self.max_bandwidth_bps)
    }

    pub fn sample(&self, loss_ratio: f64, average_delay_ms: f64, receiving_rate_bps: f64) -> StateSample {
        StateSample {
            loss_rate: loss_ratio.clamp(0.0, 1.0),
            normalized_rtt: self.normalize_rtt(average_delay_ms),
            normalized_receiving_throughput: self.normalize_throughput(receiving_rate_bps),
        }
    }
}

/// Flattened state handed to a decision engine.
///
/// Laid out feature by feature, each feature over the last `H` samples newest first and
/// zero padded: `[loss; H] ++ [rtt; H] ++ [throughput; H]`.
#[derive(Clone, Debug, PartialEq)]
pub struct StateVector {
    values: Vec<f64>,
    history_len: usize,
}

impl StateVector {
    pub fn zeros(history_len: usize) -> Self {
        Self {
            values: vec![0.0; history_len * FEATURES_PER_SAMPLE],
            history_len,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// The most recent sample, or zeros if none was recorded.
    pub fn latest(&self) -> StateSample {
        if self.history_len == 0 {
            return StateSample::default();
        }
        StateSample {
            loss_rate: self.values[0],
            normalized_rtt: self.values[self.history_len],
            normalized_receiving_throughput: self.values[2 * self.history_len],
        }
    }
}

/// Rolling history of the last `H` samples for one episode.
#[derive(Clone, Debug)]
pub struct StateHistory {
    samples: VecDeque<StateSample>,
    history_len: usize,
}

impl StateHistory {
    pub fn new(history_len: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(history_len),
            history_len,
        }
    }

    pub fn push(&mut self, sample: StateSample) {
        if self.history_len == 0 {
            return;
        }
        if self.samples.len() == self.history_len {
            self.samples.pop_back();
        }
        self.samples.push_front(sample);
    }

    /// A fresh vector built from the current history.
    pub fn vector(&self) -> StateVector {
        let h = self.history_len;
        let mut state = StateVector::zeros(h);
        for (i, s) in self.samples.iter().enumerate() {
            state.values[i] = s.loss_rate;
            state.values[h + i] = s.normalized_rtt;
            state.values[2 * h + i] = s.normalized_receiving_throughput;
        }
        state
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

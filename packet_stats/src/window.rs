use std::cell::Cell;
use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::record::PacketRecord;
use crate::seq::SequenceUnwrapper;

#[derive(Clone, Debug)]
pub struct WindowConfig {
    /// Bit width of the sequence number space.
    pub sequence_number_bits: u32,
    /// Delay reported for the first packet of the episode.
    pub base_delay_ms: i64,
    /// Records are retained at least this long even before any query asks for it.
    pub initial_horizon_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            sequence_number_bits: 16,
            base_delay_ms: 0,
            initial_horizon_ms: 600,
        }
    }
}

#[derive(Debug)]
struct StoredPacket {
    record: PacketRecord,
    unwrapped_sequence: i64,
}

/// Receive-ordered store of per-packet telemetry for one episode.
///
/// A record belongs to a query window of `w` ms when its receive timestamp lies within
/// `(newest - w, newest]`, where `newest` is the latest receive timestamp seen. Records older
/// than the largest horizon ever queried are purged on ingestion, so memory stays bounded by
/// the traffic of that horizon. All queries return `0` on an empty window.
#[derive(Debug)]
pub struct PacketStatsWindow {
    config: WindowConfig,
    packets: VecDeque<StoredPacket>,
    unwrappers: HashMap<i64, SequenceUnwrapper>,
    newest_receive_ms: Option<u64>,
    first_transit_ms: Option<i64>,
    max_horizon_ms: Cell<u64>,
}

impl PacketStatsWindow {
    pub fn new(config: WindowConfig) -> Self {
        let max_horizon_ms = Cell::new(config.initial_horizon_ms);
        Self {
            config,
            packets: VecDeque::new(),
            unwrappers: HashMap::new(),
            newest_receive_ms: None,
            first_transit_ms: None,
            max_horizon_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn on_receive(&mut self, record: PacketRecord) {
        let bits = self.config.sequence_number_bits;
        let unwrapped_sequence = self
            .unwrappers
            .entry(record.ssrc)
            .or_insert_with(|| SequenceUnwrapper::new(bits))
            .unwrap(record.sequence_number);

        if self.first_transit_ms.is_none() {
            self.first_transit_ms = Some(record.transit_ms());
        }

        let newest = self
            .newest_receive_ms
            .map_or(record.receive_timestamp_ms, |n| n.max(record.receive_timestamp_ms));
        self.newest_receive_ms = Some(newest);

        self.packets.push_back(StoredPacket {
            record,
            unwrapped_sequence,
        });

        self.purge(newest);
    }

    fn purge(&mut self, newest: u64) {
        let horizon = self.max_horizon_ms.get();
        let Some(cutoff) = newest.checked_sub(horizon) else {
            return;
        };

        let before = self.packets.len();
        while self
            .packets
            .front()
            .is_some_and(|p| p.record.receive_timestamp_ms <= cutoff)
        {
            self.packets.pop_front();
        }

        let purged = before - self.packets.len();
        if purged > 0 {
            debug!(purged, horizon, "purged expired packet records");
        }
    }

    fn in_window(&self, window_ms: u64) -> impl Iterator<Item = &StoredPacket> {
        if window_ms > self.max_horizon_ms.get() {
            self.max_horizon_ms.set(window_ms);
        }

        let newest = self.newest_receive_ms.unwrap_or(0) as i128;
        let lower = newest - window_ms as i128;
        self.packets
            .iter()
            .filter(move |p| p.record.receive_timestamp_ms as i128 > lower)
    }

    /// Received payload bits per second over the trailing `window_ms`.
    pub fn receiving_rate(&self, window_ms: u64) -> f64 {
        if window_ms == 0 {
            return 0.0;
        }

        let bits: f64 = self.in_window(window_ms).map(|p| p.record.payload_bits() as f64).sum();
        bits / (window_ms as f64 / 1000.0)
    }

    /// Mean one-way delay in ms over the trailing `window_ms`, relative to the first packet of the
    /// episode, which is assigned the configured base delay.
    pub fn average_delay(&self, window_ms: u64) -> f64 {
        let Some(first_transit) = self.first_transit_ms else {
            return 0.0;
        };

        let (count, total) = self
            .in_window(window_ms)
            .fold((0u64, 0.0f64), |(count, total), p| (count + 1, total + p.record.transit_ms() as f64));
        if count == 0 {
            return 0.0;
        }

        total / count as f64 - first_transit as f64 + self.config.base_delay_ms as f64
    }

    /// Fraction of packets missing over the trailing `window_ms`.
    ///
    /// Per stream (ssrc), the expected count is the span of unwrapped sequence numbers seen in the
    /// window and the received count is the number of distinct numbers; duplicates are counted once.
    pub fn loss_ratio(&self, window_ms: u64) -> f64 {
        let mut streams: HashMap<i64, (i64, i64, HashSet<i64>)> = HashMap::new();
        for p in self.in_window(window_ms) {
            let seq = p.unwrapped_sequence;
            let entry = streams
                .entry(p.record.ssrc)
                .or_insert_with(|| (seq, seq, HashSet::new()));
            entry.0 = entry.0.min(seq);
            entry.1 = entry.1.max(seq);
            entry.2.insert(seq);
        }

        let (expected, received) = streams
            .values()
            .fold((0i64, 0i64), |(e, r), (lo, hi, seen)| (e + hi - lo + 1, r + seen.len() as i64));
        if expected <= 0 {
            return 0.0;
        }

        (1.0 - received as f64 / expected as f64).clamp(0.0, 1.0)
    }

    /// The estimate the receiver reported with its most recent packet.
    pub fn latest_bandwidth_prediction(&self) -> Option<u64> {
        self.packets.back().map(|p| p.record.bandwidth_prediction_bps)
    }

    pub fn reset(&mut self) {
        self.packets.clear();
        self.unwrappers.clear();
        self.newest_receive_ms = None;
        self.first_transit_ms = None;
        self.max_horizon_ms.set(self.config.initial_horizon_ms);
    }
}

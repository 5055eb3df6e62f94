/// One received RTP packet as reported by the receiver's telemetry.
///
/// Timestamps are in milliseconds on the sender's and receiver's own clocks; only
/// differences between them carry meaning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketRecord {
    pub sequence_number: u64,
    pub send_timestamp_ms: u64,
    pub receive_timestamp_ms: u64,
    pub payload_size_bytes: u64,
    pub header_length_bytes: u64,
    pub padding_length_bytes: u64,
    /// The estimate in effect when the packet arrived, in bits per second.
    pub bandwidth_prediction_bps: u64,
    pub ssrc: i64,
    pub payload_type: i64,
}

impl PacketRecord {
    /// One-way delay as seen across both clocks, saturated to the `i64` range.
    pub fn transit_ms(&self) -> i64 {
        let transit = self.receive_timestamp_ms as i128 - self.send_timestamp_ms as i128;
        transit.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn payload_bits(&self) -> u64 {
        self.payload_size_bytes.saturating_mul(8)
    }
}

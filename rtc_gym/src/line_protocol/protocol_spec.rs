use std::str::FromStr;

use packet_stats::PacketRecord;
use serde::Deserialize;

use crate::constants::REQUEST_BANDWIDTH_COMMAND;

// The receiver writes one line per event on its stdout. A line is either a JSON telemetry
// object describing one received RTP packet, the bandwidth request sentinel, or anything else
// (logging from the media stack), which carries no meaning for the controller.

/// One received packet as reported by the receiver. Exactly these fields, nothing else.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryLine {
    pub send_time_ms: u64,
    pub arrival_time_ms: u64,
    pub payload_type: i64,
    pub sequence_number: u64,
    pub ssrc: i64,
    pub padding_length: u64,
    pub header_length: u64,
    pub payload_size: u64,
}

impl TelemetryLine {
    /// Tags the packet with the estimate that was in effect when it arrived.
    pub fn into_record(self, bandwidth_prediction_bps: u64) -> PacketRecord {
        PacketRecord {
            sequence_number: self.sequence_number,
            send_timestamp_ms: self.send_time_ms,
            receive_timestamp_ms: self.arrival_time_ms,
            payload_size_bytes: self.payload_size,
            header_length_bytes: self.header_length,
            padding_length_bytes: self.padding_length,
            bandwidth_prediction_bps,
            ssrc: self.ssrc,
            payload_type: self.payload_type,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum InboundLine {
    Telemetry(TelemetryLine),
    RequestBandwidth,
    Other,
}

impl FromStr for InboundLine {
    type Err = std::convert::Infallible;

    /// Classification never fails: malformed telemetry is just another line.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();

        if line == REQUEST_BANDWIDTH_COMMAND {
            return Ok(InboundLine::RequestBandwidth);
        }

        if line.starts_with('{')
            && let Ok(telemetry) = serde_json::from_str::<TelemetryLine>(line)
        {
            return Ok(InboundLine::Telemetry(telemetry));
        }

        Ok(InboundLine::Other)
    }
}

/// The reply to a bandwidth request: the estimate in whole bits per second.
pub fn bandwidth_reply(bps: f64) -> String {
    let bps = if bps.is_finite() && bps > 0.0 { bps.round() as u64 } else { 0 };
    format!("{bps}\n")
}

use std::io::{BufRead, Write};

use tracing::{debug, trace};

mod dispatcher_state;
pub mod errors;
mod protocol_spec;

use dispatcher_state::DispatcherState;
pub use errors::LineProtocolError;
use errors::Result;
pub use protocol_spec::*;

// Any bandwidth controller should implement this trait to be plugged into the driver
// function `dispatch_loop`.
pub trait BandwidthController {
    // Consume one packet report. Never fails; the report is already well formed.
    fn on_telemetry(&mut self, telemetry: TelemetryLine);

    // Produce the estimate, in bits per second, to hand back to the receiver.
    fn estimate(&mut self) -> Result<f64>;

    // Any line that is neither telemetry nor a request.
    fn on_other_line(&mut self, line: &str) {
        trace!("ignoring receiver output: {line}");
    }
}

/// Counts of what a dispatch loop saw before its input ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub telemetry_lines: u64,
    pub requests: u64,
    pub other_lines: u64,
}

/// The receiver process talks to the controller over its stdout (read here as `input_channel`)
/// and stdin (written here as `output_channel`), one line per message:
///
/// - Telemetry: a JSON object describing a received packet. It is ingested; nothing is written back.
/// - Request: the `RequestBandwidth` sentinel. The controller's estimate is written back as a
///   decimal integer line and flushed at once, before any further input is read, because the
///   receiver blocks on the reply.
/// - Anything else is ignored.
///
/// The loop ends when the input reaches end of stream, which signals that the call is over.
/// It never terminates processes itself.
pub fn dispatch_loop<R, W, C>(input_channel: R, output_channel: W, controller: &mut C) -> Result<DispatchSummary>
where
    R: BufRead,
    W: Write,
    C: BandwidthController,
{
    let mut stdin = input_channel;
    let mut stdout = output_channel;
    let mut state = DispatcherState::AwaitLine;
    let mut summary = DispatchSummary::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if stdin.read_until(b'\n', &mut buf)? == 0 {
            state.transit_to(DispatcherState::Finished)?;
            break;
        }

        // Output from the media stack is not guaranteed to be UTF-8.
        let line = String::from_utf8_lossy(&buf);

        match line.parse::<InboundLine>() {
            Ok(InboundLine::Telemetry(telemetry)) => {
                state.transit_to(DispatcherState::Ingest)?;
                controller.on_telemetry(telemetry);
                summary.telemetry_lines += 1;
            },
            Ok(InboundLine::RequestBandwidth) => {
                state.transit_to(DispatcherState::Respond)?;
                let bps = controller.estimate()?;
                let reply = bandwidth_reply(bps);
                stdout.write_all(reply.as_bytes())?;
                stdout.flush()?;
                summary.requests += 1;
                debug!("replied {}", reply.trim_end());
            },
            Ok(InboundLine::Other) | Err(_) => {
                controller.on_other_line(line.trim_end());
                summary.other_lines += 1;
                continue;
            },
        }

        state.transit_to(DispatcherState::AwaitLine)?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[derive(Default)]
    struct CountingController {
        packets: Vec<TelemetryLine>,
        next: f64,
    }

    impl BandwidthController for CountingController {
        fn on_telemetry(&mut self, telemetry: TelemetryLine) {
            self.packets.push(telemetry);
        }

        fn estimate(&mut self) -> Result<f64> {
            self.next += 1000.0;
            Ok(self.next)
        }
    }

    fn telemetry(seq: u64) -> String {
        format!(
            r#"{{"send_time_ms":{seq},"arrival_time_ms":{seq},"payload_type":96,"sequence_number":{seq},"ssrc":1,"padding_length":0,"header_length":12,"payload_size":100}}"#
        )
    }

    #[test]
    fn test_one_reply_per_request() -> anyhow::Result<()> {
        let mut input = format!(
            "{}\nRequestBandwidth\nnoise\n{}\n{}\n  RequestBandwidth  \n",
            telemetry(1),
            telemetry(2),
            telemetry(3)
        )
        .into_bytes();
        input.extend_from_slice(b"\xff\xfe\nRequestBandwidth");
        let mut output = Vec::new();
        let mut controller = CountingController::default();

        let summary = dispatch_loop(Cursor::new(input), &mut output, &mut controller)?;

        assert_eq!(String::from_utf8(output)?, "1000\n2000\n3000\n");
        assert_eq!(controller.packets.len(), 3);
        assert_eq!(
            summary,
            DispatchSummary {
                telemetry_lines: 3,
                requests: 3,
                other_lines: 2,
            }
        );
        Ok(())
    }

    #[test]
    fn test_empty_input_ends_immediately() -> anyhow::Result<()> {
        let mut output = Vec::new();
        let summary = dispatch_loop(Cursor::new(Vec::new()), &mut output, &mut CountingController::default())?;
        assert!(output.is_empty());
        assert_eq!(summary, DispatchSummary::default());
        Ok(())
    }

    #[test]
    fn test_estimate_failure_propagates() {
        struct Failing;
        impl BandwidthController for Failing {
            fn on_telemetry(&mut self, _telemetry: TelemetryLine) {}
            fn estimate(&mut self) -> Result<f64> {
                Err(LineProtocolError::estimate("no policy"))
            }
        }

        let mut output = Vec::new();
        let ret = dispatch_loop(Cursor::new(b"RequestBandwidth\n".to_vec()), &mut output, &mut Failing);
        assert!(matches!(ret, Err(LineProtocolError::Estimate(_))));
        assert!(output.is_empty());
    }
}

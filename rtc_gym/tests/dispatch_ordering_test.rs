#![cfg(unix)]
use std::io::BufReader;
use std::process::Command;

use anyhow::Result;
use rtc_gym::call::CapturedCommand;
use rtc_gym::line_protocol::{BandwidthController, TelemetryLine, dispatch_loop};

// The receiver blocks on every reply before writing its next line, so this only terminates if
// each reply is flushed before the dispatcher reads further input.
const ECHO_RECEIVER: &str = r#"
for i in 1 2 3 4 5; do
  echo RequestBandwidth
  read bwe
  echo "echo:$bwe"
done
"#;

#[derive(Default)]
struct SteppingController {
    next: f64,
    replies: Vec<u64>,
    echoes: Vec<String>,
}

impl BandwidthController for SteppingController {
    fn on_telemetry(&mut self, _telemetry: TelemetryLine) {}

    fn estimate(&mut self) -> rtc_gym::line_protocol::errors::Result<f64> {
        self.next += 250_000.0;
        self.replies.push(self.next as u64);
        Ok(self.next)
    }

    fn on_other_line(&mut self, line: &str) {
        self.echoes.push(line.to_string());
    }
}

#[test]
fn test_reply_precedes_next_read() -> Result<()> {
    let mut command = Command::new("sh");
    command.arg("-c").arg(ECHO_RECEIVER);
    let mut receiver = CapturedCommand::new_with_piped_io("receiver", command)?;
    let stdout = receiver.stdout()?;
    let stdin = receiver.stdin()?;

    let mut controller = SteppingController::default();
    let summary = dispatch_loop(BufReader::new(stdout), stdin, &mut controller)?;

    assert_eq!(summary.requests, 5);
    let expected: Vec<String> = controller.replies.iter().map(|r| format!("echo:{r}")).collect();
    assert_eq!(controller.echoes, expected);
    assert_eq!(controller.replies, vec![250_000, 500_000, 750_000, 1_000_000, 1_250_000]);

    receiver.kill_tree();
    Ok(())
}

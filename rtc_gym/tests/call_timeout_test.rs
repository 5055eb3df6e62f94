#![cfg(unix)]
use std::io::BufReader;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use rtc_gym::call::{Call, CallSettings, EpisodeStatus, PortPool, TraceCatalog, TraceSelection, is_port_free};
use rtc_gym::line_protocol::{BandwidthController, TelemetryLine, dispatch_loop};
use serial_test::serial;

// Set by the fake call app when it re-runs this test binary as a receiver.
const HOLD_PORT_FILE_ENV: &str = "RTC_GYM_TEST_HOLD_PORT_FILE";

struct FixedController;

impl BandwidthController for FixedController {
    fn on_telemetry(&mut self, _telemetry: TelemetryLine) {}

    fn estimate(&mut self) -> rtc_gym::line_protocol::errors::Result<f64> {
        Ok(300_000.0)
    }
}

fn write_app(dir: &Path, body: &str) -> Result<std::path::PathBuf> {
    let app = dir.join("call_app");
    std::fs::write(&app, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o755))?;
    Ok(app)
}

fn call(dir: &Path, body: &str, episode_timeout: Duration) -> Result<(Call, u16)> {
    let trace = dir.join("trace");
    std::fs::write(&trace, "10\n")?;
    let catalog = TraceCatalog::new(vec![trace], TraceSelection::Sequential, Some(1))?;

    let listener = std::net::TcpListener::bind(("0.0.0.0", 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    let ports = PortPool::from_ports(vec![port])?;

    let settings = CallSettings {
        call_app: write_app(dir, body)?,
        receiver_config: dir.join("receiver_360p.json"),
        sender_config: dir.join("sender_360p.json"),
        dest_ip: "127.0.0.1".to_string(),
        shaping_tool: String::new(),
        sender_start_delay: Duration::ZERO,
        exit_timeout: Duration::from_secs(2),
        episode_timeout,
        poll_interval: Duration::from_millis(10),
    };
    Ok((Call::new(catalog, ports, settings), port))
}

/// A receiver that listens on the port named by its port file and never exits. Does nothing
/// unless started by the fake call app.
#[test]
#[ignore = "runs as a child process of test_never_exiting_call_times_out"]
fn hold_port_from_port_file() -> Result<()> {
    let Ok(port_file) = std::env::var(HOLD_PORT_FILE_ENV) else {
        return Ok(());
    };
    let port: u16 = std::fs::read_to_string(port_file)?.trim().parse()?;
    let _listener = std::net::TcpListener::bind(("0.0.0.0", port))?;
    std::thread::sleep(Duration::from_secs(300));
    Ok(())
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}

#[test]
#[serial(process)]
fn test_never_exiting_call_times_out() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let timeout = Duration::from_secs(3);
    let exe = std::env::current_exe()?;
    let body = format!(
        "case \"$1\" in\n*receiver_*) {HOLD_PORT_FILE_ENV}=\"$3\" exec \"{}\" hold_port_from_port_file --exact --ignored ;;\n*) exec sleep 300 ;;\nesac",
        exe.display()
    );
    let (mut call, port) = call(dir.path(), &body, timeout)?;

    let start = Instant::now();
    let mut session = call.start_call(&dir.path().join("episode1"))?;
    assert!(session.check_started()?);
    // Connecting rather than binding, so the check cannot steal the port from the receiver.
    let listening = || std::net::TcpStream::connect(("127.0.0.1", port)).is_ok();
    assert!(wait_until(Duration::from_secs(2), listening), "receiver never listened on {port}");
    assert!(!is_port_free(port));

    let (stdout, stdin) = session.receiver_io()?;
    let summary = dispatch_loop(BufReader::new(stdout), stdin, &mut FixedController)?;
    assert_eq!(summary.requests, 0);

    let status = session.supervise()?;
    let elapsed = start.elapsed();
    assert!(matches!(status, EpisodeStatus::Timeout | EpisodeStatus::Killed));
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(5), "took {elapsed:?}");

    drop(session);
    assert!(is_port_free(port));
    assert_eq!(std::fs::read_to_string(dir.path().join("episode1").join("port.txt"))?, port.to_string());
    Ok(())
}

#[test]
#[serial(process)]
fn test_dead_peer_is_killed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (mut call, _port) = call(dir.path(), "exit 3", Duration::from_secs(30))?;

    let mut session = call.start_call(&dir.path().join("episode1"))?;
    std::thread::sleep(Duration::from_millis(300));
    assert!(!session.check_started()?);
    assert_eq!(session.status(), Some(EpisodeStatus::Killed));
    Ok(())
}

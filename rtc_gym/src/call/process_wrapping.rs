use std::collections::HashMap;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, Signal, System};
use tracing::{debug, warn};

use crate::errors::{GymError, Result, internal};

// This struct wraps a spawned peer process of a call. The child leads its own process group
// so that everything it starts (a shaping tool, a shell, the media app) can be killed together.
pub struct CapturedCommand {
    name: String,
    child_process: Child,
    torn_down: bool,
}

impl CapturedCommand {
    /// Spawns `command` with its stdin and stdout piped to the parent, as the receiver needs.
    pub fn new_with_piped_io(name: impl Into<String>, mut command: Command) -> Result<Self> {
        command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null());
        Self::spawn(name.into(), command)
    }

    /// Spawns `command` detached from the parent's standard streams.
    pub fn new_detached(name: impl Into<String>, mut command: Command) -> Result<Self> {
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        Self::spawn(name.into(), command)
    }

    fn spawn(name: String, mut command: Command) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child_process = command.spawn().map_err(|source| GymError::ProcessSpawn {
            program: command.get_program().to_string_lossy().into_owned(),
            source,
        })?;
        debug!("spawned {name} as pid {}", child_process.id());

        Ok(Self {
            name,
            child_process,
            torn_down: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.child_process.id()
    }

    /// Return the handle for writing to the child's stdin, if it has been captured; otherwise,
    /// return an error.
    pub fn stdin(&mut self) -> Result<ChildStdin> {
        self.child_process
            .stdin
            .take()
            .ok_or_else(|| internal(format!("stdin of {} is not captured", self.name)))
    }

    pub fn stdout(&mut self) -> Result<ChildStdout> {
        self.child_process
            .stdout
            .take()
            .ok_or_else(|| internal(format!("stdout of {} is not captured", self.name)))
    }

    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child_process.try_wait()?)
    }

    /// Polls the child until it exits or `timeout` elapses. Returns `None` on timeout.
    pub fn wait_timeout(&mut self, timeout: Duration, poll_interval: Duration) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(poll_interval.min(deadline - now));
        }
    }

    /// Kills the child with all its descendants, then reaps it. Only the first call has an
    /// effect, so a recycled group id is never signalled.
    pub fn kill_tree(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Ok(Some(_)) = self.child_process.try_wait() {
            // The leader is gone but members of its group may remain.
            kill_process_group(self.id());
            return;
        }

        warn!("killing {} (pid {}) and its descendants", self.name, self.id());
        kill_tree(self.id());
        let _ = self.child_process.kill();
        let _ = self.child_process.wait();
    }
}

/// Kills every descendant of `pid` (found through parent links), then the process group `pid`
/// leads, then `pid` itself. Processes that are already gone are skipped.
fn kill_tree(pid: u32) {
    let system = System::new_with_specifics(RefreshKind::nothing().with_processes(ProcessRefreshKind::everything()));

    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (child, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*child);
        }
    }

    let root = Pid::from_u32(pid);
    let mut descendants = Vec::new();
    let mut pending = vec![root];
    while let Some(next) = pending.pop() {
        if let Some(kids) = children.get(&next) {
            descendants.extend(kids.iter().copied());
            pending.extend(kids.iter().copied());
        }
    }

    for descendant in descendants.iter().rev() {
        if let Some(process) = system.process(*descendant) {
            debug!("killing descendant {descendant} of {pid}");
            process.kill_with(Signal::Kill);
        }
    }

    kill_process_group(pid);

    if let Some(process) = system.process(root) {
        process.kill_with(Signal::Kill);
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    // SAFETY: killpg has no memory safety requirements; a stale group id yields ESRCH.
    unsafe {
        libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{BufRead, BufReader, Write};

    use anyhow::Result;

    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    // Zombies count as dead: an orphan may wait a while for its reaper.
    fn is_alive(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat.rsplit(')').next().is_some_and(|rest| !rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[test]
    fn test_piped_io() -> Result<()> {
        let mut cmd = CapturedCommand::new_with_piped_io("cat", sh("cat"))?;
        let mut stdin = cmd.stdin()?;
        let mut stdout = BufReader::new(cmd.stdout()?);

        writeln!(stdin, "hello")?;
        let mut line = String::new();
        stdout.read_line(&mut line)?;
        assert_eq!(line, "hello\n");

        drop(stdin);
        let status = cmd.wait_timeout(Duration::from_secs(10), Duration::from_millis(10))?;
        assert!(status.is_some_and(|s| s.success()));

        assert!(cmd.stdin().is_err());
        Ok(())
    }

    #[test]
    fn test_spawn_failure() {
        let ret = CapturedCommand::new_detached("missing", Command::new("/nonexistent/call_app"));
        assert!(matches!(ret, Err(GymError::ProcessSpawn { .. })));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_kill_tree_reaches_grandchildren() -> Result<()> {
        let mut cmd = CapturedCommand::new_with_piped_io("tree", sh("sleep 300 & echo $!; wait"))?;
        let mut stdout = BufReader::new(cmd.stdout()?);
        let mut line = String::new();
        stdout.read_line(&mut line)?;
        let grandchild: u32 = line.trim().parse()?;
        assert!(is_alive(grandchild));

        assert!(cmd.wait_timeout(Duration::from_millis(200), Duration::from_millis(20))?.is_none());
        cmd.kill_tree();

        assert!(cmd.try_wait()?.is_some());
        let deadline = Instant::now() + Duration::from_secs(5);
        while is_alive(grandchild) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(!is_alive(grandchild));
        Ok(())
    }
}

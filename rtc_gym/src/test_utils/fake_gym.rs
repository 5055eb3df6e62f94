#![cfg(all(test, unix))]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use gym_config::GymConfig;
use tempfile::{TempDir, tempdir};

use crate::call::TracePool;
use crate::constants::{SIMPLE_TRACE, TRACES_DIR, TRAINING_DIR};

/// A receiver that reports `packets` packets 10 ms apart, asks for an estimate after every
/// fifth one, and logs each reply it gets to its log file.
pub fn chatty_receiver(packets: u32) -> String {
    format!(
        r#"i=0
while [ $i -lt {packets} ]; do
  t=$((1000 + i * 10))
  echo "{{\"send_time_ms\":$t,\"arrival_time_ms\":$((t + 40)),\"payload_type\":96,\"sequence_number\":$i,\"ssrc\":1,\"padding_length\":0,\"header_length\":12,\"payload_size\":1000}}"
  if [ $((i % 5)) -eq 4 ]; then
    echo RequestBandwidth
    read bwe
    echo "$bwe" >> "$4"
  fi
  i=$((i + 1))
done"#
    )
}

pub const SILENT_RECEIVER: &str = "exec sleep 300";

pub const SHORT_SENDER: &str = "sleep 1";

// A throwaway base path laid out like a real gym: traces for both modes, media configs, and a
// shell script standing in for the call app. The script runs the receiver body when its first
// argument is the receiver config and the sender body otherwise.
pub struct FakeGym {
    pub dir: TempDir,
}

impl FakeGym {
    pub fn new(receiver_body: &str, sender_body: &str) -> Result<Self> {
        let dir = tempdir()?;
        let base = dir.path();

        for mode in ["train", "eval"] {
            for (pool, traces) in [(TracePool::Belgium, 2), (TracePool::Fcc, 1), (TracePool::Norway, 1)] {
                let pool_dir = pool.dir(base, mode);
                std::fs::create_dir_all(&pool_dir)?;
                for i in 0..traces {
                    std::fs::write(pool_dir.join(format!("trace_{i}")), "10\n20\n30\n")?;
                }
            }
        }
        std::fs::write(base.join(TRAINING_DIR).join(TRACES_DIR).join(SIMPLE_TRACE), "10\n")?;

        for res in ["360p", "720p"] {
            std::fs::write(
                base.join(format!("receiver_{res}.json")),
                r#"{"serverless_connection": {"receiver": {"enabled": true, "listening_port": 8000}}}"#,
            )?;
            std::fs::write(
                base.join(format!("sender_{res}.json")),
                r#"{"serverless_connection": {"sender": {"enabled": true}, "receiver": {"enabled": false}}}"#,
            )?;
        }

        let config = GymConfig::default();
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in\n*receiver_*)\n{receiver_body}\n;;\n*)\n{sender_body}\n;;\nesac\n"
        );
        let app = base.join(&config.call.call_app);
        std::fs::write(&app, script)?;
        std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o755))?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.path().join("checkpoints")
    }

    /// Defaults tuned for quick episodes: no shaping tool, no start delay, short timeouts.
    pub fn config(&self) -> GymConfig {
        let mut config = GymConfig::default();
        config.call.shaping_tool.clear();
        config.call.sender_start_delay = Duration::ZERO;
        config.call.exit_timeout = Duration::from_secs(5);
        config.call.episode_timeout = Duration::from_secs(20);
        config.call.poll_interval = Duration::from_millis(10);
        config.call.port_min = 20000;
        config.call.port_max = 60000;
        config.call.port_pool_size = 3;
        config.engine.seed = Some(7);
        config
    }
}

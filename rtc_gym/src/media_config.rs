//! Read-only views of the JSON files handed to the media app and the shaping tool.
//!
//! Only the fields the gym needs are modelled; everything else in the files is ignored.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{GymError, Result};

#[derive(Debug, Deserialize)]
struct MediaConfigFile {
    serverless_connection: ServerlessConnection,
}

#[derive(Debug, Deserialize)]
struct ServerlessConnection {
    receiver: ReceiverEndpoint,
}

#[derive(Debug, Deserialize)]
struct ReceiverEndpoint {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    listening_port: Option<u16>,
}

/// The receiver side of a media config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverMediaConfig {
    pub enabled: bool,
    pub listening_port: Option<u16>,
}

impl ReceiverMediaConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GymError::Config(format!("cannot read media config {path:?}: {e}")))?;
        Self::parse(&text).map_err(|e| GymError::Config(format!("malformed media config {path:?}: {e}")))
    }

    fn parse(text: &str) -> serde_json::Result<Self> {
        let file: MediaConfigFile = serde_json::from_str(text)?;
        let receiver = file.serverless_connection.receiver;
        Ok(Self {
            enabled: receiver.enabled,
            listening_port: receiver.listening_port,
        })
    }
}

/// One segment of a network trace. Durations are in milliseconds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TracePattern {
    pub duration: f64,
    pub capacity: f64,
    #[serde(default)]
    pub loss: f64,
    #[serde(default)]
    pub rtt: f64,
    #[serde(default)]
    pub jitter: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceDirection {
    #[serde(default)]
    pub trace_pattern: Vec<TracePattern>,
}

impl TraceDirection {
    fn duration_ms(&self) -> f64 {
        self.trace_pattern.iter().map(|p| p.duration.max(0.0)).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkTrace {
    #[serde(rename = "type", default)]
    pub trace_type: Option<String>,
    #[serde(default)]
    pub downlink: TraceDirection,
    #[serde(default)]
    pub uplink: TraceDirection,
}

impl NetworkTrace {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| GymError::Config(format!("malformed network trace {path:?}: {e}")))
    }

    /// Reads the trace if it is a JSON network trace. Recorded packet-delivery traces, which
    /// the shaping tool consumes directly, yield `None`.
    pub fn try_read(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        if !text.trim_start().starts_with('{') {
            return None;
        }
        serde_json::from_str(&text).ok()
    }

    /// The longer of the two directions.
    pub fn total_duration(&self) -> Duration {
        let ms = self.uplink.duration_ms().max(self.downlink.duration_ms());
        Duration::from_secs_f64(ms / 1000.0)
    }
}

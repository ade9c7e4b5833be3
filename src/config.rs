use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for one engine instance. Passed explicitly into every tick.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_targets_path")]
    pub targets_path: PathBuf,
    #[serde(default = "default_status_path")]
    pub status_path: PathBuf,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_tcp_grace_ms")]
    pub tcp_grace_ms: u64,
    #[serde(default = "default_gsp_protocol_version")]
    pub gsp_protocol_version: i32,
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub api_port: Option<u16>,
}

fn default_targets_path() -> PathBuf { PathBuf::from("servers.json") }
fn default_status_path() -> PathBuf { PathBuf::from("status.json") }
fn default_max_concurrency() -> usize { 10 }
fn default_timeout_ms() -> u64 { 5000 }
fn default_tcp_grace_ms() -> u64 { 250 }
fn default_gsp_protocol_version() -> i32 { 47 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            targets_path: default_targets_path(),
            status_path: default_status_path(),
            max_concurrency: default_max_concurrency(),
            default_timeout_ms: default_timeout_ms(),
            tcp_grace_ms: default_tcp_grace_ms(),
            gsp_protocol_version: default_gsp_protocol_version(),
            interval_secs: None,
            api_port: None,
        }
    }
}

impl EngineConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms.max(1))
    }

    pub fn tcp_grace(&self) -> Duration {
        Duration::from_millis(self.tcp_grace_ms)
    }
}

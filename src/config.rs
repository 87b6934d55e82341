use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// How storage nodes are reached from the replica set managers.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Direct calls into nodes living in the coordinator process.
    InProcess,
    /// JSON over HTTP against a `NodeHost`.
    Http,
}

impl std::str::FromStr for TransportMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in_process" => Ok(TransportMode::InProcess),
            "http" => Ok(TransportMode::Http),
            other => Err(anyhow::anyhow!("Unknown transport: {}", other)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoordinatorConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_transport")]
    pub transport: TransportMode,
    #[serde(default = "default_node_bind")]
    pub node_bind: SocketAddr,
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
    #[serde(default = "default_remote_attempts")]
    pub remote_attempts: usize,
}

impl CoordinatorConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let cfg: CoordinatorConfig = toml::from_str(&content)?;
        Ok(cfg)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            data_dir: default_data_dir(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            transport: default_transport(),
            node_bind: default_node_bind(),
            remote_timeout_ms: default_remote_timeout_ms(),
            remote_attempts: default_remote_attempts(),
        }
    }
}

/// Settings each `ReplicaSetManager` is created with.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    pub data_dir: PathBuf,
    pub heartbeat_interval: Duration,
}

impl ReplicationConfig {
    pub fn new(data_dir: impl Into<PathBuf>, heartbeat_interval: Duration) -> Self {
        Self {
            data_dir: data_dir.into(),
            heartbeat_interval,
        }
    }
}

impl From<&CoordinatorConfig> for ReplicationConfig {
    fn from(cfg: &CoordinatorConfig) -> Self {
        Self {
            data_dir: cfg.data_dir.clone(),
            heartbeat_interval: Duration::from_millis(cfg.heartbeat_interval_ms),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_heartbeat_interval_ms() -> u64 {
    500
}

fn default_transport() -> TransportMode {
    TransportMode::InProcess
}

fn default_node_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

fn default_remote_timeout_ms() -> u64 {
    500
}

fn default_remote_attempts() -> usize {
    3
}

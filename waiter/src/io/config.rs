//! Server configuration stored in a TOML file (default `waiter.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Server configuration (TOML).
///
/// Missing fields default to values that reproduce a plain
/// `0.0.0.0:8080` deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind: String,

    /// Port to listen on.
    pub port: u16,

    /// Largest `timeout` a `/delay` request may ask for, in seconds.
    pub max_timeout_secs: u64,

    /// Interval between keep-alive pings on the `/events` stream.
    pub sse_keep_alive_secs: u64,

    /// Capacity of the broadcast buffer feeding `/events` subscribers.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            max_timeout_secs: 60 * 60,
            sse_keep_alive_secs: 15,
            event_buffer: 256,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bind.trim().is_empty() {
            return Err(anyhow!("bind must be a non-empty address"));
        }
        if self.max_timeout_secs == 0 {
            return Err(anyhow!("max_timeout_secs must be > 0"));
        }
        if self.sse_keep_alive_secs == 0 {
            return Err(anyhow!("sse_keep_alive_secs must be > 0"));
        }
        if self.event_buffer == 0 {
            return Err(anyhow!("event_buffer must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ServerConfig::default()`.
pub fn load_config(path: &Path) -> Result<ServerConfig> {
    if !path.exists() {
        let cfg = ServerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ServerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ServerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

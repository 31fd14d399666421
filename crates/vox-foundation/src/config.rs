//! Layered configuration: defaults, optional TOML file, then environment
//! variables prefixed `VOX_`. Mirrors the teacher's use of the `config`
//! crate for a single merged settings object.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Package-home override, analogous to the original server's `ACHATBOT_PKG`
/// environment switch (models, prompts, and other on-disk assets resolve
/// relative to this directory when set).
pub const PKG_HOME_ENV: &str = "VOX_PKG_HOME";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            sample_width: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    pub start_secs: f64,
    pub stop_secs: f64,
    pub interruptions_enabled: bool,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            start_secs: 0.032,
            stop_secs: 0.32,
            interruptions_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub size: usize,
    pub get_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 2,
            get_timeout_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// `None` = unbounded, negative = disabled, matching the original
    /// `ChatHistory.size *int` semantics.
    pub history_size: Option<i64>,
    pub max_tool_rounds: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_size: None,
            max_tool_rounds: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
    pub max_connections: u32,
    pub cleanup_interval_s: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 16,
            burst_size: 32,
            max_connections: 1024,
            cleanup_interval_s: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    pub audio: AudioConfig,
    pub vad: VadConfig,
    pub pool: PoolConfig,
    pub chat: ChatConfig,
    pub rate_limit: RateLimitConfig,
    pub pkg_home: Option<PathBuf>,
}

impl ServerConfig {
    /// Load defaults, merge an optional TOML file, then environment
    /// variables prefixed `VOX_` (double-underscore separated, e.g.
    /// `VOX_AUDIO__SAMPLE_RATE=48000`).
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ServerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VOX")
                .separator("__")
                .try_parsing(true),
        );

        let merged = builder.build()?;
        let mut cfg: ServerConfig = merged.try_deserialize()?;

        if cfg.pkg_home.is_none() {
            cfg.pkg_home = std::env::var(PKG_HOME_ENV).ok().map(PathBuf::from);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.size == 0 {
            return Err(ConfigError::Validation {
                field: "pool.size".into(),
                reason: "must be > 0".into(),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::Validation {
                field: "audio.sample_rate".into(),
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ServerConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_with_no_file_uses_defaults() {
        let cfg = ServerConfig::load(None).expect("load");
        assert_eq!(cfg.pool.size, PoolConfig::default().size);
    }
}

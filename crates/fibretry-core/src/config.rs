use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::backoff::FibonacciBackoff;
use crate::retry::{AttemptLimit, Deadline};

/// Invalid values in a loaded configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_wait_secs must be a finite, positive number of seconds (got {0})")]
    InvalidMaxWait(f64),
    #[error("unit_ms must be greater than zero")]
    ZeroUnit,
    #[error("deadline_secs must be a finite, non-negative number of seconds (got {0})")]
    InvalidDeadline(f64),
}

/// Stopping policy section (`[policy]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PolicyConfig {
    /// Give up after this many attempts (including the first).
    Attempts { max_attempts: u32 },
    /// Give up once this many seconds have passed since the first attempt.
    Deadline { deadline_secs: f64 },
    /// Retry until success or cancellation.
    Unbounded,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::Attempts { max_attempts: 5 }
    }
}

impl PolicyConfig {
    pub fn attempt_limit(&self) -> Option<AttemptLimit> {
        match self {
            PolicyConfig::Attempts { max_attempts } => Some(AttemptLimit::new(*max_attempts)),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Result<Option<Deadline>, ConfigError> {
        match self {
            PolicyConfig::Deadline { deadline_secs } => Duration::try_from_secs_f64(*deadline_secs)
                .map(|d| Some(Deadline::new(d)))
                .map_err(|_| ConfigError::InvalidDeadline(*deadline_secs)),
            _ => Ok(None),
        }
    }
}

/// Global configuration loaded from `~/.config/fibretry/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FibretryConfig {
    /// Ceiling for a single wait, in seconds.
    pub max_wait_secs: f64,
    /// Duration of one Fibonacci step, in milliseconds (1000 = whole seconds).
    pub unit_ms: u64,
    /// Randomize each wait within `[base / 2, base]`.
    pub jitter: bool,
    pub policy: PolicyConfig,
}

impl Default for FibretryConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: 15.0,
            unit_ms: 1000,
            jitter: true,
            policy: PolicyConfig::default(),
        }
    }
}

impl FibretryConfig {
    pub fn max_wait(&self) -> Result<Duration, ConfigError> {
        match Duration::try_from_secs_f64(self.max_wait_secs) {
            Ok(d) if !d.is_zero() => Ok(d),
            _ => Err(ConfigError::InvalidMaxWait(self.max_wait_secs)),
        }
    }

    pub fn unit(&self) -> Result<Duration, ConfigError> {
        if self.unit_ms == 0 {
            return Err(ConfigError::ZeroUnit);
        }
        Ok(Duration::from_millis(self.unit_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.max_wait()?;
        self.unit()?;
        self.policy.deadline()?;
        Ok(())
    }

    /// Fresh backoff sequence for one retry session.
    pub fn backoff(&self) -> Result<FibonacciBackoff, ConfigError> {
        let max_wait = self.max_wait()?;
        let backoff = if self.jitter {
            FibonacciBackoff::new(max_wait)
        } else {
            FibonacciBackoff::without_jitter(max_wait)
        };
        Ok(backoff.with_unit(self.unit()?))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fibretry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load and validate configuration from `path`.
pub fn load_from_path(path: &Path) -> Result<FibretryConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: FibretryConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Write `cfg` to `path`, creating parent directories.
pub fn save_to_path(cfg: &FibretryConfig, path: &Path) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FibretryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FibretryConfig::default();
        save_to_path(&default_cfg, &path)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

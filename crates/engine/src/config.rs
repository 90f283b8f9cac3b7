// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Engine configuration, loaded from a TOML file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use warden_core::queue::TtlPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Runtime configuration for the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Where the JSON store lives
    pub data_dir: PathBuf,
    /// How often the scheduler looks for due jobs
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
    /// Interval of the registered expiration-sweep job
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Queue expiry windows
    pub ttl: TtlPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/warden"),
            tick: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(60),
            ttl: TtlPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service registration and lifecycle settings.
///
/// Durations are written in milliseconds in YAML (`restart_on_failure_ms`,
/// `timeout_stop_ms`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Service name in the OS registry. No spaces suggested.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Account the service runs as. Empty means LocalSystem.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Arguments passed by the SCM on launch.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Delay before the SCM restarts the service after a failed exit.
    /// Zero disables restarts.
    #[serde(
        default,
        rename = "restart_on_failure_ms",
        deserialize_with = "deserialize_millis"
    )]
    pub restart_on_failure: Duration,
    /// Budget for the stop routine. Zero means the platform default.
    #[serde(
        default,
        rename = "timeout_stop_ms",
        deserialize_with = "deserialize_millis"
    )]
    pub timeout_stop: Duration,
    /// Binary registered with the SCM. Defaults to the current executable.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn deserialize_millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| Error::Config {
            context: "parsing service config".to_string(),
            source: e.into(),
        })
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            context: format!("reading {}", path.display()),
            source: e.into(),
        })?;
        serde_yaml::from_str(&contents).map_err(|e| Error::Config {
            context: format!("parsing {}", path.display()),
            source: e.into(),
        })
    }

    /// Binary to register: the override made absolute, or the current executable.
    pub fn exec_path(&self) -> Result<PathBuf> {
        match self.executable {
            Some(ref path) => Ok(std::path::absolute(path)?),
            None => Ok(std::env::current_exe()?),
        }
    }

    pub(crate) fn effective_stop_timeout(&self, platform_default: Duration) -> Duration {
        if self.timeout_stop.is_zero() {
            platform_default
        } else {
            self.timeout_stop
        }
    }
}

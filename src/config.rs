// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::connectivity::RadioTimings;

const APP_DIR: &str = "connectivity-bridge";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for exported logs.
    #[serde(skip)]
    pub data_dir: PathBuf,

    pub bluetooth: BluetoothConfig,

    pub wifi: WifiConfig,

    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// How long a scan requested by the page runs.
    pub scan_timeout_ms: u64,

    /// Upper bound for a single connect attempt.
    pub connect_timeout_ms: u64,

    /// Wait after a power toggle before reading the radio state back.
    pub toggle_settle_ms: u64,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: 10_000,
            connect_timeout_ms: 15_000,
            toggle_settle_ms: 0,
        }
    }
}

impl BluetoothConfig {
    pub fn timings(&self) -> RadioTimings {
        RadioTimings {
            scan_timeout: Duration::from_millis(self.scan_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            connect_settle: Duration::ZERO,
            toggle_settle: Duration::from_millis(self.toggle_settle_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub scan_timeout_ms: u64,

    pub connect_timeout_ms: u64,

    /// Wait after connecting before checking which network is current.
    pub connect_settle_ms: u64,

    pub toggle_settle_ms: u64,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: 5_000,
            connect_timeout_ms: 20_000,
            connect_settle_ms: 2_000,
            toggle_settle_ms: 1_000,
        }
    }
}

impl WifiConfig {
    pub fn timings(&self) -> RadioTimings {
        RadioTimings {
            scan_timeout: Duration::from_millis(self.scan_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            connect_settle: Duration::from_millis(self.connect_settle_ms),
            toggle_settle: Duration::from_millis(self.toggle_settle_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Number of activity entries kept in memory.
    pub activity_log_capacity: usize,

    /// Directory holding extracted web content, if any.
    pub content_dir: Option<PathBuf>,

    /// Page loaded from `content_dir`.
    pub main_page: String,

    /// Write the activity log to the data directory on exit.
    pub export_activity_on_exit: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            activity_log_capacity: 200,
            content_dir: None,
            main_page: "index.html".to_string(),
            export_activity_on_exit: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration from the default location, creating it on first run.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::default_path())?;
        config.data_dir = default_data_dir();
        std::fs::create_dir_all(&config.data_dir)?;
        Ok(config)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            info!("Wrote default configuration to {:?}", path);
            config
        };

        if config.data_dir.as_os_str().is_empty() {
            config.data_dir = default_data_dir();
        }
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path the activity log is exported to.
    pub fn activity_export_path(&self) -> PathBuf {
        self.data_dir.join("activity.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.wifi, WifiConfig::default());
        assert!(!config.data_dir.as_os_str().is_empty());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.bluetooth, config.bluetooth);
        assert_eq!(reloaded.bridge, config.bridge);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[wifi]\nconnect_settle_ms = 500\n\n[bridge]\nactivity_log_capacity = 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.wifi.connect_settle_ms, 500);
        assert_eq!(config.wifi.scan_timeout_ms, 5_000);
        assert_eq!(config.bridge.activity_log_capacity, 10);
        assert_eq!(config.bridge.main_page, "index.html");
        assert_eq!(config.bluetooth, BluetoothConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[wifi\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_timings() {
        let wifi = WifiConfig::default().timings();
        assert_eq!(wifi.scan_timeout, Duration::from_secs(5));
        assert_eq!(wifi.connect_settle, Duration::from_secs(2));
        assert_eq!(wifi.toggle_settle, Duration::from_secs(1));

        let bluetooth = BluetoothConfig::default().timings();
        assert_eq!(bluetooth.connect_timeout, Duration::from_secs(15));
        assert_eq!(bluetooth.connect_settle, Duration::ZERO);
    }
}

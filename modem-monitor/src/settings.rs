//! Monitor settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use modem_watch::{MonitorConfig, UsbFilter};
use serde::{Deserialize, Serialize};

/// Settings file contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Vendor/product pairs to track
    #[serde(default)]
    pub filters: Vec<UsbFilter>,
    /// Seconds between modem list reports
    #[serde(default = "default_list_interval")]
    pub list_interval_secs: u64,
    /// Override for the wait before talking to a new command port
    #[serde(default)]
    pub settle_ms: Option<u64>,
    /// Override for the idle poll interval
    #[serde(default)]
    pub poll_ms: Option<u64>,
}

fn default_list_interval() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            list_interval_secs: default_list_interval(),
            settle_ms: None,
            poll_ms: None,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for modemwatch
    /// Uses $XDG_CONFIG_HOME/modemwatch, falls back to ~/.config/modemwatch
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("modemwatch"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("modemwatch"))
    }

    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            tracing::debug!("No settings at {}", path.display());
            return Self::default();
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring invalid settings in {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }

    /// Add a filter unless an identical one is already present
    pub fn add_filter(&mut self, filter: UsbFilter) {
        if !self.filters.contains(&filter) {
            self.filters.push(filter);
        }
    }

    /// Engine configuration with this file's overrides applied
    pub fn monitor_config(&self) -> MonitorConfig {
        let mut config = MonitorConfig::default();
        if let Some(ms) = self.settle_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        config
    }

    /// Report interval, never zero
    pub fn list_interval(&self) -> Duration {
        Duration::from_secs(self.list_interval_secs.max(1))
    }
}

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::pins::PinCatalog;

pub const MIN_REFRESH_INTERVAL_MS: u64 = 100;
pub const MAX_REFRESH_INTERVAL_MS: u64 = 10_000;

/// Client settings, read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    /// Device used when no host is given on the command line
    pub default_host: Option<String>,
    /// Timeout applied to every device request
    pub request_timeout_ms: u64,
    pub refresh_interval_ms: u64,
    pub log_level: String,
    /// Board labels overriding the ESP32-C3 header layout
    pub pin_layout: Option<Vec<String>>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_host: None,
            request_timeout_ms: 3000,
            refresh_interval_ms: 1000,
            log_level: "info".to_string(),
            pin_layout: None,
        }
    }
}

impl ClientSettings {
    /// Defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(
            self.refresh_interval_ms
                .clamp(MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS),
        )
    }

    pub fn catalog(&self) -> PinCatalog {
        match &self.pin_layout {
            Some(labels) => PinCatalog::from_labels(labels),
            None => PinCatalog::default(),
        }
    }
}

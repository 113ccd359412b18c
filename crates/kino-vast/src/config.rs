//! Ad player configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Ad player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdPlayerConfig {
    /// Delay between checks while waiting to seek back into content (ms)
    pub buffer_poll_interval_ms: u64,
    /// Maximum wait for an ad's media to become playable (ms), `None` waits forever
    pub ad_load_timeout_ms: Option<u64>,
    /// Whether the platform keeps delivering clicks once native controls are shown
    pub click_after_controls: bool,
    /// Show native controls when content is restored and none were captured
    pub restore_controls: bool,
}

impl Default for AdPlayerConfig {
    fn default() -> Self {
        Self {
            buffer_poll_interval_ms: 200,
            ad_load_timeout_ms: Some(8_000),
            click_after_controls: true,
            restore_controls: true,
        }
    }
}

impl AdPlayerConfig {
    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "buffer_poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.ad_load_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "ad_load_timeout_ms must be positive or null".to_string(),
            ));
        }
        Ok(())
    }

    pub fn buffer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.buffer_poll_interval_ms)
    }

    pub fn ad_load_timeout(&self) -> Option<Duration> {
        self.ad_load_timeout_ms.map(Duration::from_millis)
    }

    /// Configuration for touch platforms where clicks stop once controls are visible
    pub fn touch() -> Self {
        Self {
            click_after_controls: false,
            ..Default::default()
        }
    }
}

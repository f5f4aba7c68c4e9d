//! Runtime configuration.
//!
//! Every field has a default, so `{}` is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hosts::HostPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    pub host_policy: HostPolicy,
    pub fallback: FallbackConfig,
}

impl RedirectConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Timing and feature switches for the in-page fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Delay between a detected URL change and the redirect check
    pub debounce_ms: u64,
    /// Safety-net poll interval
    pub poll_interval_ms: u64,
    /// How long to wait for the video element to mount
    pub video_wait_timeout_ms: u64,
    /// Gap between successive quality commands
    pub quality_stagger_ms: u64,
    /// Drive autoplay and quality on destination hosts
    pub autoplay: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 75,
            poll_interval_ms: 1500,
            video_wait_timeout_ms: 8000,
            quality_stagger_ms: 150,
            autoplay: true,
        }
    }
}

impl FallbackConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn video_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.video_wait_timeout_ms)
    }

    pub fn quality_stagger(&self) -> Duration {
        Duration::from_millis(self.quality_stagger_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = RedirectConfig::from_json("{}").unwrap();
        assert_eq!(config, RedirectConfig::default());
        assert_eq!(config.host_policy, HostPolicy::Lax);
        assert_eq!(config.fallback.debounce(), Duration::from_millis(75));
        assert_eq!(config.fallback.poll_interval(), Duration::from_millis(1500));
    }

    #[test]
    fn partial_override() {
        let config =
            RedirectConfig::from_json(r#"{"host_policy":"strict","fallback":{"autoplay":false}}"#).unwrap();
        assert_eq!(config.host_policy, HostPolicy::Strict);
        assert!(!config.fallback.autoplay);
        assert_eq!(config.fallback.video_wait_timeout_ms, 8000);
    }

    #[test]
    fn rejects_bad_json() {
        assert!(RedirectConfig::from_json("{").is_err());
        assert!(RedirectConfig::from_json(r#"{"host_policy":"loose"}"#).is_err());
    }
}

//! Engine configuration.
//!
//! Settings are plain JSON. Missing fields take their defaults, so a config
//! file only needs to name what it changes:
//!
//! ```json
//! { "overscan": 2 }
//! ```

use crate::error::ConfigError;
use crate::slot::Extent;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Per-user config location: `<config dir>/rvlist/config.json`.
static DEFAULT_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| dirs::config_dir().map(|dir| dir.join("rvlist").join("config.json")));

/// Tunables shared by list and tree containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra items kept materialized on each side of the visible span.
    pub overscan: usize,
    /// Height assumed for unmeasured items while nothing is precise.
    pub fallback_height: Extent,
    /// Keep the item under the viewport offset in place across a sort.
    pub keep_anchor_on_sort: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overscan: 0,
            fallback_height: 20,
            keep_anchor_on_sort: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Default per-user config path, if the platform has a config directory.
    pub fn default_path() -> Option<&'static Path> {
        DEFAULT_PATH.as_deref()
    }

    /// Loads the per-user config, falling back to defaults.
    ///
    /// A missing file is silent; an unreadable or malformed one is logged.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring config");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "overscan": 3 }"#).unwrap();
        assert_eq!(config.overscan, 3);
        assert_eq!(config.fallback_height, 20);
        assert!(config.keep_anchor_on_sort);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            EngineConfig::from_json("{ overscan: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let path = std::env::temp_dir().join("rvlist_missing_config_for_test.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(EngineConfig::load(&path), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let config = EngineConfig {
            overscan: 1,
            fallback_height: 32,
            keep_anchor_on_sort: false,
        };
        let path = std::env::temp_dir().join("rvlist_config_round_trip.json");
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).ok();
    }
}

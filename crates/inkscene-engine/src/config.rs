//! Engine configuration.

use inkscene_core::TextCache;
use inkscene_core::input::{
    DEFAULT_CLICK_TOLERANCE, DEFAULT_DOUBLE_CLICK_DISTANCE, DEFAULT_DOUBLE_CLICK_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config: {0}")]
    Io(#[from] std::io::Error),
}

/// Tunables of an [`Engine`](crate::Engine). Missing fields take their
/// defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum pointer travel, in screen pixels, between press and release
    /// for the release to count as a click.
    pub click_tolerance: f64,
    /// Maximum delay between the two presses of a double-click.
    pub double_click_ms: u64,
    /// Maximum distance between the two presses of a double-click.
    pub double_click_distance: f64,
    /// Resolve the cursor under the pointer on every move.
    pub track_cursor: bool,
    /// Entries kept by each item's parsed-text cache.
    pub text_cache_capacity: usize,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            click_tolerance: DEFAULT_CLICK_TOLERANCE,
            double_click_ms: DEFAULT_DOUBLE_CLICK_MS,
            double_click_distance: DEFAULT_DOUBLE_CLICK_DISTANCE,
            track_cursor: true,
            text_cache_capacity: TextCache::DEFAULT_CAPACITY,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_click_tolerance(mut self, tolerance: f64) -> Self {
        self.click_tolerance = tolerance;
        self
    }

    pub fn with_double_click(mut self, max_ms: u64, max_distance: f64) -> Self {
        self.double_click_ms = max_ms;
        self.double_click_distance = max_distance;
        self
    }

    pub fn with_track_cursor(mut self, track: bool) -> Self {
        self.track_cursor = track;
        self
    }

    pub fn with_text_cache_capacity(mut self, capacity: usize) -> Self {
        self.text_cache_capacity = capacity;
        self
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::debug!("loaded engine config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "track_cursor": false, "max_zoom": 4.0 }"#)
            .unwrap();
        assert!(!config.track_cursor);
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.click_tolerance, DEFAULT_CLICK_TOLERANCE);
        assert_eq!(config.text_cache_capacity, TextCache::DEFAULT_CAPACITY);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "double_click_ms": 250 }}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.double_click_ms, 250);

        let missing = file.path().with_extension("missing");
        assert!(matches!(EngineConfig::load(missing), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_click_tolerance(2.0)
            .with_double_click(300, 8.0)
            .with_zoom_limits(0.5, 2.0);
        assert_eq!(config.click_tolerance, 2.0);
        assert_eq!(config.double_click_ms, 300);
        assert_eq!(config.double_click_distance, 8.0);
        assert_eq!((config.min_zoom, config.max_zoom), (0.5, 2.0));
    }
}

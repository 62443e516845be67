//! Gamut engine configuration.
//!
//! Plays the role of the host application's settings: where tables persist
//! and how finely they are sampled.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ColorResult;

/// Environment variable naming the gamut table cache directory.
pub const CACHE_DIR_ENV: &str = "CHROMANT_CACHE_DIR";

const DEFAULT_RESOLUTION_J: usize = 100;
const DEFAULT_RESOLUTION_S: usize = 100;
const DEFAULT_RESOLUTION_H: usize = 360;
/// Samples per RGB cube edge.
const DEFAULT_EDGE_SAMPLES: usize = 256;
const DEFAULT_SEARCH_STEP: f32 = 0.005;

/// Configuration for building and persisting gamut tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamutConfig {
    /// Directory for `.sgt` cache files. `None` or empty disables persistence.
    pub cache_dir: Option<PathBuf>,
    /// Lightness grid size.
    pub resolution_j: usize,
    /// Saturation grid size.
    pub resolution_s: usize,
    /// Hue grid size.
    pub resolution_h: usize,
    pub edge_samples: usize,
    /// Boundary-search step in J and s.
    pub search_step: f32,
}

impl Default for GamutConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from),
            resolution_j: DEFAULT_RESOLUTION_J,
            resolution_s: DEFAULT_RESOLUTION_S,
            resolution_h: DEFAULT_RESOLUTION_H,
            edge_samples: DEFAULT_EDGE_SAMPLES,
            search_step: DEFAULT_SEARCH_STEP,
        }
    }
}

impl GamutConfig {
    pub fn from_json_str(json: &str) -> ColorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> ColorResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_dir = None;
        self
    }

    /// Grid resolutions `(J, s, h)`.
    pub fn with_resolution(mut self, j: usize, s: usize, h: usize) -> Self {
        self.resolution_j = j;
        self.resolution_s = s;
        self.resolution_h = h;
        self
    }

    /// The cache directory, if persistence is enabled.
    pub fn cache_location(&self) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .cloned()
    }

    /// Copy with every field forced into a usable range.
    pub(crate) fn sanitized(&self) -> Self {
        let step = if self.search_step.is_finite() && self.search_step > 0.0 {
            self.search_step.clamp(1e-4, 0.1)
        } else {
            DEFAULT_SEARCH_STEP
        };
        Self {
            cache_dir: self.cache_dir.clone(),
            resolution_j: self.resolution_j.max(2),
            resolution_s: self.resolution_s.max(2),
            resolution_h: self.resolution_h.max(2),
            edge_samples: self.edge_samples.max(2),
            search_step: step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = GamutConfig::from_json_str(r#"{"resolution_h": 90, "cache_dir": "/tmp/x"}"#)
            .unwrap();
        assert_eq!(config.resolution_h, 90);
        assert_eq!(config.resolution_j, DEFAULT_RESOLUTION_J);
        assert_eq!(config.cache_location(), Some(PathBuf::from("/tmp/x")));
        assert_eq!(config.search_step, DEFAULT_SEARCH_STEP);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(GamutConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_empty_cache_dir_disables_persistence() {
        let config = GamutConfig::default().with_cache_dir("");
        assert_eq!(config.cache_location(), None);
        assert_eq!(GamutConfig::default().without_cache().cache_location(), None);
    }

    #[test]
    fn test_sanitized_enforces_minimums() {
        let config = GamutConfig {
            cache_dir: None,
            resolution_j: 0,
            resolution_s: 1,
            resolution_h: 0,
            edge_samples: 0,
            search_step: f32::NAN,
        }
        .sanitized();
        assert_eq!(config.resolution_j, 2);
        assert_eq!(config.resolution_s, 2);
        assert_eq!(config.resolution_h, 2);
        assert_eq!(config.edge_samples, 2);
        assert_eq!(config.search_step, DEFAULT_SEARCH_STEP);
    }
}

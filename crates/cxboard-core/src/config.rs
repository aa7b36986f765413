//! Dashboard configuration
//!
//! Read from `<config dir>/cxboard/config.toml`. Every field has a default, so a
//! missing file is the same as an empty one.
//!
//! ```toml
//! records_path = "/srv/cx/calls.json"
//! state_dir = "/var/lib/cxboard"
//!
//! [thresholds]
//! resolved_above_secs = 120
//! escalated_below_secs = 90
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::analytics::OutcomeThresholds;
use crate::error::CoreError;

/// Application name used for config and data directories
pub const APP_DIR: &str = "cxboard";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Heuristic outcome thresholds
    pub thresholds: OutcomeThresholds,
    /// JSON record file replacing the built-in dataset
    pub records_path: Option<PathBuf>,
    /// Where the persisted selection lives
    pub state_dir: Option<PathBuf>,
}

impl DashboardConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CoreError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = toml::from_str(&content).map_err(|source| CoreError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds under which one call would count as both resolved and escalated
    pub fn validate(&self) -> Result<(), CoreError> {
        let t = &self.thresholds;
        if t.escalated_below_secs > t.resolved_above_secs.saturating_add(1) {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "escalated_below_secs ({}) overlaps resolved_above_secs ({})",
                    t.escalated_below_secs, t.resolved_above_secs
                ),
            });
        }
        Ok(())
    }

    /// State directory from config, else `<data dir>/cxboard`
    pub fn state_dir(&self) -> Option<PathBuf> {
        self.state_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR)))
    }
}

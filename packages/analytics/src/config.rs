//! Engine tunables and dataset field mappings, loadable from TOML.

use std::path::Path;

use chrono::{Datelike as _, NaiveDate};
use safety_trends_boundary_models::BoundaryFieldMapping;
use safety_trends_incident_models::IncidentFieldMapping;
use safety_trends_spatial::DEFAULT_GRID_SIZE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calendar year the `1year` and `2years` windows are anchored to.
pub const DEFAULT_ANALYSIS_YEAR: i32 = 2025;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Aggregation tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Grid cell edge in degrees for the point index.
    pub grid_size: f64,
    /// Year the calendar-based windows are anchored to.
    pub analysis_year: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            analysis_year: DEFAULT_ANALYSIS_YEAR,
        }
    }
}

impl EngineConfig {
    /// Checks that every tunable is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the grid size is not a
    /// positive, finite number, or the analysis year is outside the
    /// calendar range dates can represent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "grid_size must be a positive number of degrees, got {}",
                    self.grid_size
                ),
            });
        }
        let years = NaiveDate::MIN.year()..=NaiveDate::MAX.year();
        if !years.contains(&self.analysis_year) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "analysis_year must be within {}..={}, got {}",
                    years.start(),
                    years.end(),
                    self.analysis_year
                ),
            });
        }
        Ok(())
    }
}

/// Full configuration file: engine tunables plus dataset field mappings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    /// `[engine]` table.
    pub engine: EngineConfig,
    /// `[neighborhoods]` table.
    pub neighborhoods: BoundaryFieldMapping,
    /// `[incidents]` table.
    pub incidents: IncidentFieldMapping,
}

impl TrendsConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is invalid.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(s)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails
    /// [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

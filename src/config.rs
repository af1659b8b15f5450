//! Extractor configuration, read from and written to JSON files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::filter::ARTIFACT_BAND;
use crate::error::ConfigError;
use crate::features::smoothing::{NARROW_WIDTH, WIDE_WIDTH};
use crate::features::spec::{ColourIndex, FeatureSpec, LAMOST_COLOURS, LAMOST_FEATURES};

/// Baseline points taken on each side of a line window.
pub const FLANK_POINTS: usize = 20;

/// One feature window as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Narrow boxcar width in samples.
    pub narrow_width: usize,
    /// Wide boxcar width in samples, also the edge trim.
    pub wide_width: usize,
    /// Baseline points on each side of a line window.
    pub flank_points: usize,
    /// Wavelength band masked as an instrument artifact.
    pub artifact_band: [f64; 2],
    /// Feature windows in output order.
    pub features: Vec<WindowConfig>,
    /// Colour indices as `[blue, red]` continuum feature names.
    pub colour_indices: Vec<[String; 2]>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            narrow_width: NARROW_WIDTH,
            wide_width: WIDE_WIDTH,
            flank_points: FLANK_POINTS,
            artifact_band: [ARTIFACT_BAND.0, ARTIFACT_BAND.1],
            features: LAMOST_FEATURES
                .iter()
                .map(|&(name, low, high)| WindowConfig {
                    name: name.to_string(),
                    low,
                    high,
                })
                .collect(),
            colour_indices: LAMOST_COLOURS
                .iter()
                .map(|&(b, r)| [b.to_string(), r.to_string()])
                .collect(),
        }
    }
}

impl ExtractorConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.narrow_width == 0 || self.wide_width == 0 {
            return Err(ConfigError::Invalid("smoothing widths must be positive".to_string()));
        }
        if self.narrow_width >= self.wide_width {
            return Err(ConfigError::Invalid(format!(
                "narrow_width ({}) must be smaller than wide_width ({})",
                self.narrow_width, self.wide_width
            )));
        }
        if self.flank_points == 0 {
            return Err(ConfigError::Invalid("flank_points must be positive".to_string()));
        }
        let [low, high] = self.artifact_band;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(ConfigError::Invalid(format!(
                "artifact_band [{low}, {high}] is not an increasing interval"
            )));
        }

        let spec = self.feature_spec()?;
        for index in self.colour_index_list() {
            index.check(&spec)?;
        }
        Ok(())
    }

    /// Build the ordered feature set, rejecting malformed windows.
    pub fn feature_spec(&self) -> Result<FeatureSpec, ConfigError> {
        let mut spec = FeatureSpec::new();
        for w in &self.features {
            spec.push(&w.name, w.low, w.high)?;
        }
        Ok(spec)
    }

    pub fn colour_index_list(&self) -> Vec<ColourIndex> {
        self.colour_indices
            .iter()
            .map(|[b, r]| ColourIndex::new(b, r))
            .collect()
    }

    pub fn artifact_band(&self) -> (f64, f64) {
        (self.artifact_band[0], self.artifact_band[1])
    }
}

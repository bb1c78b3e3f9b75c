//! Tunable defaults, loadable from a TOML file.
//!
//! ```toml
//! [qc]
//! simplify_tolerance = 1.0
//! coverage_threshold = 0.25
//! calibration_names = ["calib1", "calib2", "calib3"]
//!
//! [plate]
//! plate = "384"
//! margin = 0
//! row_stride = 1
//! col_stride = 1
//!
//! [mapping]
//! max_individual_warnings = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::plate::wells::{PlateLayout, PlateType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Douglas-Peucker tolerance in source coordinate units.
    pub simplify_tolerance: f64,
    /// Coverage fraction below which a calibration warning is emitted.
    pub coverage_threshold: f64,
    pub calibration_names: Vec<String>,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance: 1.0,
            coverage_threshold: 0.25,
            calibration_names: vec![
                "calib1".to_string(),
                "calib2".to_string(),
                "calib3".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateConfig {
    pub plate: String,
    pub margin: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            plate: "384".to_string(),
            margin: 0,
            row_stride: 1,
            col_stride: 1,
        }
    }
}

impl PlateConfig {
    pub fn layout(&self) -> Result<PlateLayout> {
        Ok(PlateLayout {
            plate: self.plate.parse::<PlateType>()?,
            margin: self.margin,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Out-of-range wells reported one by one before collapsing into a
    /// single aggregate warning.
    pub max_individual_warnings: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            max_individual_warnings: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LmdConfig {
    pub qc: QcConfig,
    pub plate: PlateConfig,
    pub mapping: MappingConfig,
}

impl LmdConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {:?}: {:?}", path.as_ref(), config);
        Ok(config)
    }
}

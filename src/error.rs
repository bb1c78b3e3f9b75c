//! Fatal error conditions of the conversion pipeline.

use std::collections::BTreeSet;
use thiserror::Error;

/// Conditions that stop a pipeline stage before it produces output.
///
/// Recoverable conditions are never raised through this type; they are
/// returned as [`crate::diagnostics::Diagnostic`]s next to the result.
#[derive(Error, Debug)]
pub enum LmdError {
    #[error("the uploaded annotation file is empty")]
    EmptyInput,

    #[error("no calibration points in file: the file contains no Point annotations")]
    NoCalibrationPoints,

    #[error(
        "calibration point >>{name}<< is not present in the file. \
         Requested calibration points: {requested:?}. \
         Point annotations found in the file: {available:?}"
    )]
    CalibrationPointNotFound {
        name: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("calibration point >>{name}<< matches {count} Point annotations, expected exactly one")]
    DuplicateCalibrationPoint { name: String, count: usize },

    #[error("expected exactly 3 calibration points, got {0}")]
    CalibrationCount(usize),

    #[error(
        "calibration points {names:?} are collinear (triangle area {area:.3e}); \
         place them so that they span a triangle"
    )]
    CollinearCalibration { names: Vec<String>, area: f64 },

    #[error("geometry type {kind} of shape '{id}' is not supported, please convert to Polygon or LineString")]
    UnsupportedGeometry { id: String, kind: String },

    #[error("samples and wells mapping is empty")]
    EmptyMapping,

    #[error("samples and wells input is not a dictionary: {0}")]
    MappingNotADict(String),

    #[error("could not parse literal at byte offset {offset}: {message}")]
    LiteralSyntax { offset: usize, message: String },

    #[error("plate must be either 384 or 96, got '{0}'")]
    InvalidPlate(String),

    #[error("margin {margin} is too large for a plate with {rows} rows and {cols} columns")]
    MarginTooLarge { margin: usize, rows: usize, cols: usize },

    #[error("row and column strides must be at least 1 (row_stride={row_stride}, col_stride={col_stride})")]
    InvalidStride { row_stride: usize, col_stride: usize },

    #[error("'{0}' is not a valid well coordinate")]
    InvalidWell(String),

    #[error("number of samples ({samples}) must be less than or equal to the number of wells ({wells})")]
    TooManySamples { samples: usize, wells: usize },

    #[error("{missing:?} were not found in the metadata")]
    MetadataMismatch { missing: BTreeSet<String> },

    #[error("column '{column}' not found; available columns: {available:?}")]
    MissingColumn { column: String, available: Vec<String> },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, LmdError>;

pub mod classes;

use classes::{PyQcResult, PyShapeCollection};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::{LmdConfig, QcConfig};
use crate::entry;
use crate::plate::mapping::{self, SampleWellMap};
use crate::plate::wells::{self, PlateType, Well};

fn value_err(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn runtime_err(e: anyhow::Error) -> PyErr {
    PyRuntimeError::new_err(format!("{:#}", e))
}

fn parse_wells(labels: &[String]) -> PyResult<Vec<Well>> {
    labels
        .iter()
        .map(|w| w.parse::<Well>().map_err(value_err))
        .collect()
}

/// Runs geometry QC on a QuPath GeoJSON export.
///
/// Arguments:
///
/// - ``geojson_path`` – Path to the annotation file
/// - ``calibration_names`` (default: ["calib1", "calib2", "calib3"])
/// - ``simplify_tolerance`` (default: 1.0) – Douglas-Peucker tolerance
/// - ``coverage_threshold`` (default: 0.25)
///
/// Returns:
///
/// A ``PyQcResult``; fatal problems raise ``RuntimeError``.
#[pyfunction]
#[pyo3(signature = (
    geojson_path,
    calibration_names = None,
    simplify_tolerance = 1.0f64,
    coverage_threshold = 0.25f64,
))]
pub fn qc_geojson(
    geojson_path: &str,
    calibration_names: Option<Vec<String>>,
    simplify_tolerance: f64,
    coverage_threshold: f64,
) -> PyResult<PyQcResult> {
    let mut config = QcConfig {
        simplify_tolerance,
        coverage_threshold,
        ..QcConfig::default()
    };
    if let Some(names) = calibration_names {
        config.calibration_names = names;
    }
    let inner = entry::qc_geojson_file(geojson_path, &config).map_err(runtime_err)?;
    Ok(PyQcResult { inner })
}

/// Acceptable wells for a plate layout, row-major.
///
/// Example:
///
/// .. code-block:: python
///
///    lmdconv.acceptable_wells("96", margin=1)[:2]   # ['B2', 'B3']
#[pyfunction]
#[pyo3(signature = (plate = "384", margin = 0usize, row_stride = 1usize, col_stride = 1usize))]
pub fn acceptable_wells(
    plate: &str,
    margin: usize,
    row_stride: usize,
    col_stride: usize,
) -> PyResult<Vec<String>> {
    let plate: PlateType = plate.parse().map_err(value_err)?;
    let wells = wells::acceptable_wells(plate, margin, row_stride, col_stride).map_err(value_err)?;
    Ok(wells::well_labels(&wells))
}

/// The 228-well collection-safe preset (C3..N21 on a 384-well plate).
#[pyfunction]
pub fn default_acceptable_wells() -> Vec<String> {
    wells::well_labels(&wells::default_acceptable_wells())
}

/// Pairs classes with wells in order; raises if there are more classes
/// than wells.
#[pyfunction]
pub fn default_assignment(
    class_names: Vec<String>,
    wells: Vec<String>,
) -> PyResult<Vec<(String, String)>> {
    let wells = parse_wells(&wells)?;
    let map = mapping::default_assignment(&class_names, &wells).map_err(value_err)?;
    Ok(map.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}

/// Parses a pasted ``{"sample": "C3", ...}`` literal.
#[pyfunction]
pub fn parse_samples_and_wells(text: &str) -> PyResult<Vec<(String, String)>> {
    let map = mapping::parse_samples_and_wells(text).map_err(value_err)?;
    Ok(map.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}

/// Builds the shape collection and plate scheme from a QC result.
///
/// Arguments:
///
/// - ``qc`` – Result of ``qc_geojson`` (with calibration)
/// - ``samples_and_wells`` – List of (class, well) pairs
/// - ``acceptable_wells`` (default: the 228-well preset)
/// - ``plate`` (default: "384")
#[pyfunction]
#[pyo3(signature = (qc, samples_and_wells, acceptable_wells = None, plate = "384"))]
pub fn create_collection(
    qc: &PyQcResult,
    samples_and_wells: Vec<(String, String)>,
    acceptable_wells: Option<Vec<String>>,
    plate: &str,
) -> PyResult<PyShapeCollection> {
    let acceptable = match acceptable_wells {
        Some(labels) => parse_wells(&labels)?,
        None => wells::default_acceptable_wells(),
    };
    let mut config = LmdConfig::default();
    config.plate.plate = plate.to_string();
    let map: SampleWellMap = samples_and_wells.into_iter().collect();

    let output =
        entry::create_collection(&qc.inner, &map, &acceptable, &config).map_err(runtime_err)?;
    let csv = output.plate_scheme_csv().map_err(runtime_err)?;
    Ok(PyShapeCollection::new(
        &output.collection,
        csv,
        output.diagnostics(),
    ))
}

/// Colours shapes by a metadata column and writes the labelled GeoJSON.
///
/// Returns:
///
/// Path of the written file.
#[pyfunction]
#[pyo3(signature = (geojson_path, metadata_path, name_key, value_key, output_dir = "."))]
pub fn colorize_geojson(
    geojson_path: &str,
    metadata_path: &str,
    name_key: &str,
    value_key: &str,
    output_dir: &str,
) -> PyResult<String> {
    let (_, path) = entry::colorize_geojson_file(
        geojson_path,
        metadata_path,
        name_key,
        value_key,
        &QcConfig::default(),
        output_dir,
    )
    .map_err(runtime_err)?;
    Ok(path.to_string_lossy().into_owned())
}

use pyo3::prelude::*;

use crate::diagnostics::Diagnostic;
use crate::processing::collection::{Shape, ShapeCollection};
use crate::processing::qc::QcOutcome;

/// Python representation of a pipeline diagnostic
///
/// Attributes:
///     severity (str): "INFO", "WARNING" or "FATAL"
///     message (str): Human-readable message
///     columns (list[str]): Column names of the attached table (may be empty)
///     rows (list[list[str]]): Rows of the attached table (may be empty)
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyDiagnostic {
    #[pyo3(get)]
    pub severity: String,
    #[pyo3(get)]
    pub message: String,
    #[pyo3(get)]
    pub columns: Vec<String>,
    #[pyo3(get)]
    pub rows: Vec<Vec<String>>,
}

#[pymethods]
impl PyDiagnostic {
    fn __repr__(&self) -> String {
        format!("Diagnostic({}, {:?})", self.severity, self.message)
    }
}

impl From<&Diagnostic> for PyDiagnostic {
    fn from(d: &Diagnostic) -> Self {
        let (columns, rows) = match &d.table {
            Some(t) => (t.columns.clone(), t.rows.clone()),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            severity: d.severity.to_string(),
            message: d.message.clone(),
            columns,
            rows,
        }
    }
}

pub fn to_py_diagnostics(diagnostics: &[Diagnostic]) -> Vec<PyDiagnostic> {
    diagnostics.iter().map(PyDiagnostic::from).collect()
}

/// Result of geometry QC
///
/// Attributes:
///     n_shapes (int): Shapes in the clean table
///     class_names (list[str]): Distinct classes in table order
///     coverage (float | None): Fraction of shapes touching the calibration triangle
///     calibration_points (list[tuple[float, float]] | None): The three points, in order
///     diagnostics (list[PyDiagnostic]): Non-fatal findings
///
/// Example:
///     >>> qc = lmdconv.qc_geojson("slide.geojson")
///     >>> qc.class_names
///     ['Tumor', 'Stroma']
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyQcResult {
    pub inner: QcOutcome,
}

#[pymethods]
impl PyQcResult {
    #[getter]
    fn n_shapes(&self) -> usize {
        self.inner.table.len()
    }

    #[getter]
    fn class_names(&self) -> Vec<String> {
        self.inner.class_names()
    }

    #[getter]
    fn coverage(&self) -> Option<f64> {
        self.inner.coverage
    }

    #[getter]
    fn calibration_points(&self) -> Option<Vec<(f64, f64)>> {
        self.inner
            .calibration
            .as_ref()
            .map(|c| c.points.iter().map(|p| (p[0], p[1])).collect())
    }

    #[getter]
    fn diagnostics(&self) -> Vec<PyDiagnostic> {
        to_py_diagnostics(&self.inner.diagnostics)
    }

    fn __repr__(&self) -> String {
        format!(
            "QcResult(n_shapes={}, classes={:?}, coverage={:?})",
            self.inner.table.len(),
            self.inner.class_names(),
            self.inner.coverage
        )
    }
}

/// One shape bound to a well
///
/// Attributes:
///     id (str): Annotation id
///     class_name (str): Classification name
///     well (str): Well label, e.g. "C3"
///     coords (list[tuple[float, float]]): Simplified outline
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyShape {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub class_name: String,
    #[pyo3(get)]
    pub well: String,
    #[pyo3(get)]
    pub coords: Vec<(f64, f64)>,
}

impl From<&Shape> for PyShape {
    fn from(s: &Shape) -> Self {
        Self {
            id: s.id.clone(),
            class_name: s.class_name.clone(),
            well: s.well.to_string(),
            coords: s.coords.iter().map(|c| (c[0], c[1])).collect(),
        }
    }
}

/// Shape collection ready for the device exporter
///
/// Attributes:
///     shapes (list[PyShape]): In annotation order
///     calibration_points (list[tuple[float, float]]): 3x2 calibration array
///     orientation_transform (list[tuple[float, float]]): 2x2 orientation matrix
///     plate_scheme_csv (str): Plate layout as CSV
///     diagnostics (list[PyDiagnostic]): Mapping findings
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyShapeCollection {
    #[pyo3(get)]
    pub shapes: Vec<PyShape>,
    #[pyo3(get)]
    pub calibration_points: Vec<(f64, f64)>,
    #[pyo3(get)]
    pub orientation_transform: Vec<(f64, f64)>,
    #[pyo3(get)]
    pub plate_scheme_csv: String,
    #[pyo3(get)]
    pub diagnostics: Vec<PyDiagnostic>,
}

#[pymethods]
impl PyShapeCollection {
    fn __len__(&self) -> usize {
        self.shapes.len()
    }

    fn __repr__(&self) -> String {
        format!("ShapeCollection(n_shapes={})", self.shapes.len())
    }
}

impl PyShapeCollection {
    pub fn new(
        collection: &ShapeCollection,
        plate_scheme_csv: String,
        diagnostics: &[Diagnostic],
    ) -> Self {
        Self {
            shapes: collection.shapes.iter().map(PyShape::from).collect(),
            calibration_points: collection
                .calibration_points
                .iter()
                .map(|p| (p[0], p[1]))
                .collect(),
            orientation_transform: collection
                .orientation_transform
                .iter()
                .map(|p| (p[0], p[1]))
                .collect(),
            plate_scheme_csv,
            diagnostics: to_py_diagnostics(diagnostics),
        }
    }
}

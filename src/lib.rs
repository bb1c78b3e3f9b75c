//! QuPath GeoJSON annotations to laser microdissection shape collections:
//! geometry QC, calibration, plate/well mapping, collection assembly and a
//! metadata colorizer.

pub mod config;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod io;
pub mod plate;
pub mod processing;
mod utils;

#[cfg(feature = "python")]
mod binding;

pub use config::LmdConfig;
pub use diagnostics::{Diagnostic, Severity};
pub use error::{LmdError, Result};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn lmdconv(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use binding::classes::{PyDiagnostic, PyQcResult, PyShape, PyShapeCollection};

    m.add_function(wrap_pyfunction!(binding::qc_geojson, m)?)?;
    m.add_function(wrap_pyfunction!(binding::acceptable_wells, m)?)?;
    m.add_function(wrap_pyfunction!(binding::default_acceptable_wells, m)?)?;
    m.add_function(wrap_pyfunction!(binding::default_assignment, m)?)?;
    m.add_function(wrap_pyfunction!(binding::parse_samples_and_wells, m)?)?;
    m.add_function(wrap_pyfunction!(binding::create_collection, m)?)?;
    m.add_function(wrap_pyfunction!(binding::colorize_geojson, m)?)?;
    m.add_class::<PyDiagnostic>()?;
    m.add_class::<PyQcResult>()?;
    m.add_class::<PyShape>()?;
    m.add_class::<PyShapeCollection>()?;
    Ok(())
}

//! Geometry QC: turns a raw annotation table into the clean table that shape
//! assembly and the colorizer consume.
//!
//! Stages, in order:
//!
//! 1. load & shape check
//! 2. calibration extraction (and the collinearity check)
//! 3. calibration-triangle coverage
//! 4. point removal
//! 5. classification presence filter
//! 6. classification name extraction
//! 7. MultiPolygon rejection
//! 8. simplification into `coords`
//!
//! Each stage consumes the working table and hands a filtered table to the
//! next one. Fatal conditions abort before anything is returned, so callers
//! never see a half-processed table.

use std::collections::BTreeMap;

use crate::config::QcConfig;
use crate::diagnostics::{Diagnostic, DiagnosticTable};
use crate::error::{LmdError, Result};
use crate::io::input::{AnnotatedGeometry, Geometry, GeometryKind};
use crate::processing::calibration::{
    build_transform, extract_calibration_points, CalibrationPoints, TransformDescriptor,
};
use crate::processing::geometry::{intersects_triangle, simplify_line, simplify_ring};

#[derive(Debug, Clone)]
pub struct QcOutcome {
    pub table: Vec<AnnotatedGeometry>,
    pub calibration: Option<CalibrationPoints>,
    pub transform: Option<TransformDescriptor>,
    /// Fraction of Polygon/LineString shapes touching the calibration
    /// triangle; `None` without calibration or without such shapes.
    pub coverage: Option<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl QcOutcome {
    /// Distinct classification names in table order.
    pub fn class_names(&self) -> Vec<String> {
        distinct_class_names(&self.table)
    }
}

pub fn distinct_class_names(table: &[AnnotatedGeometry]) -> Vec<String> {
    let mut seen = Vec::new();
    for record in table {
        if let Some(name) = &record.classification_name {
            if !seen.contains(name) {
                seen.push(name.clone());
            }
        }
    }
    seen
}

/// "3 Points, 2 Polygons"
pub fn describe_geometry_types(features: &[AnnotatedGeometry]) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for f in features {
        *counts.entry(f.geometry.type_name()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(kind, count)| format!("{} {}s", count, kind))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs the full QC pipeline. Pass `None` for `calibration_names` to skip
/// stages 2 and 3, e.g. when re-checking an already clean table.
pub fn run_qc(
    features: Vec<AnnotatedGeometry>,
    calibration_names: Option<&[String]>,
    config: &QcConfig,
) -> Result<QcOutcome> {
    let mut diagnostics = Vec::new();

    // 1. load & shape check
    if features.is_empty() {
        log::warn!("The uploaded geojson file is empty.");
        return Err(LmdError::EmptyInput);
    }
    let has_points = features
        .iter()
        .any(|f| f.geometry.kind() == GeometryKind::Point);
    if calibration_names.is_some() && !has_points {
        log::error!("No calibration points in file");
        return Err(LmdError::NoCalibrationPoints);
    }
    let summary = describe_geometry_types(&features);
    log::info!("Geometries in file: {}", summary);
    diagnostics.push(Diagnostic::info(format!("Geometries in file: {}", summary)));

    // 2. + 3. calibration
    let (calibration, transform, coverage) = match calibration_names {
        Some(names) => {
            let calibration = extract_calibration_points(&features, names)?;
            let transform = build_transform(&calibration)?;
            let coverage = calibration_coverage(&features, &calibration);
            report_coverage(coverage, config.coverage_threshold, &mut diagnostics);
            (Some(calibration), Some(transform), coverage)
        }
        None => (None, None, None),
    };

    // 4. point removal
    let features = remove_points(features);
    log::info!("Point geometries have been removed");

    // 5. + 6. classification
    let (features, dropped) = drop_unclassified(features);
    if dropped > 0 {
        log::info!("{} unclassified objects will be ignored", dropped);
        diagnostics.push(Diagnostic::info(format!(
            "you have {} unclassified objects (no classification or no class name), \
             they will be ignored",
            dropped
        )));
    }

    // 7. MultiPolygon rejection
    let features = reject_multipolygons(features, &mut diagnostics);

    // 8. simplification
    let table = simplify_all(features, config.simplify_tolerance)?;

    log::info!("The file QC is complete: {} shapes kept", table.len());
    diagnostics.push(Diagnostic::info(format!(
        "The file QC is complete, {} shapes kept",
        table.len()
    )));

    Ok(QcOutcome {
        table,
        calibration,
        transform,
        coverage,
        diagnostics,
    })
}

/// Fraction of Polygon/LineString features intersecting the calibration
/// triangle (boundary inclusive).
pub fn calibration_coverage(
    features: &[AnnotatedGeometry],
    calibration: &CalibrationPoints,
) -> Option<f64> {
    let triangle = calibration.triangle();
    let shapes: Vec<&AnnotatedGeometry> = features
        .iter()
        .filter(|f| {
            matches!(
                f.geometry.kind(),
                GeometryKind::Polygon | GeometryKind::LineString
            )
        })
        .collect();
    if shapes.is_empty() {
        return None;
    }
    let hits = shapes
        .iter()
        .filter(|f| intersects_triangle(&f.geometry, &triangle))
        .count();
    Some(hits as f64 / shapes.len() as f64)
}

fn report_coverage(coverage: Option<f64>, threshold: f64, diagnostics: &mut Vec<Diagnostic>) {
    match coverage {
        None => diagnostics.push(Diagnostic::info(
            "no Polygon or LineString shapes to check against the calibration triangle",
        )),
        Some(fraction) => {
            log::info!(
                "{:.2}% of polygons are within calibration triangle",
                fraction * 100.0
            );
            diagnostics.push(Diagnostic::info(format!(
                "{:.2}% of polygons are within calibration triangle",
                fraction * 100.0
            )));
            if fraction < threshold {
                log::warn!(
                    "Less than {:.0}% of the objects intersect with the calibration triangle",
                    threshold * 100.0
                );
                diagnostics.push(Diagnostic::warning(format!(
                    "Less than {:.0}% of the objects intersect with the calibration triangle. \
                     Shapes are likely to be geometrically distorted outside the calibration hull; \
                     reconsider calibration point placement",
                    threshold * 100.0
                )));
            }
        }
    }
}

fn remove_points(features: Vec<AnnotatedGeometry>) -> Vec<AnnotatedGeometry> {
    features
        .into_iter()
        .filter(|f| f.geometry.kind() != GeometryKind::Point)
        .collect()
}

/// Drops records without a classification name and copies the name of the
/// survivors into `classification_name`.
fn drop_unclassified(features: Vec<AnnotatedGeometry>) -> (Vec<AnnotatedGeometry>, usize) {
    let before = features.len();
    let kept: Vec<AnnotatedGeometry> = features
        .into_iter()
        .filter_map(|mut f| {
            let name = f.classification.as_ref()?.name.clone()?;
            f.classification_name = Some(name);
            Some(f)
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

fn reject_multipolygons(
    features: Vec<AnnotatedGeometry>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<AnnotatedGeometry> {
    let (multi, kept): (Vec<_>, Vec<_>) = features
        .into_iter()
        .partition(|f| f.geometry.kind() == GeometryKind::MultiPolygon);

    if !multi.is_empty() {
        let mut table = DiagnosticTable::new(&["id", "classification_name"]);
        for f in &multi {
            table.push_row(vec![
                f.id.clone(),
                f.classification_name.clone().unwrap_or_default(),
            ]);
        }
        log::warn!("{} MultiPolygon objects present and ignored", multi.len());
        diagnostics.push(
            Diagnostic::warning(
                "MultiPolygon objects present: these are not supported, please convert them \
                 to polygons in QuPath. The script will continue but these objects will be ignored",
            )
            .with_table(table),
        );
    }
    kept
}

fn simplify_all(
    features: Vec<AnnotatedGeometry>,
    tolerance: f64,
) -> Result<Vec<AnnotatedGeometry>> {
    features
        .into_iter()
        .map(|mut f| {
            let coords = match &f.geometry {
                Geometry::Polygon(p) => simplify_ring(p.exterior(), tolerance),
                Geometry::LineString(path) => simplify_line(path, tolerance),
                Geometry::Point(_) | Geometry::MultiPolygon(_) | Geometry::Other { .. } => {
                    log::error!(
                        "Geometry type {} not supported, please convert to Polygon or LineString",
                        f.geometry.type_name()
                    );
                    return Err(LmdError::UnsupportedGeometry {
                        id: f.id.clone(),
                        kind: f.geometry.type_name(),
                    });
                }
            };
            if coords.is_empty() {
                return Err(LmdError::MalformedInput(format!(
                    "shape '{}' has no coordinates",
                    f.id
                )));
            }
            f.coords = coords;
            Ok(f)
        })
        .collect()
}

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{LmdConfig, QcConfig};
use crate::diagnostics::Diagnostic;
use crate::io::input::{read_geojson, AnnotatedGeometry};
use crate::io::metadata::MetadataTable;
use crate::io::output::{
    plate_scheme_to_csv_string, write_collection_json, write_geojson, write_plate_scheme_file,
};
use crate::plate::mapping::{
    confirm_mapping, parse_samples_and_wells, MappingReport, SampleWellMap,
};
use crate::plate::scheme::PlateScheme;
use crate::plate::wells::Well;
use crate::processing::collection::{assemble, ShapeCollection};
use crate::processing::colorize::colorize;
use crate::processing::qc::{run_qc, QcOutcome};

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shapes".to_string())
}

/// Loads an annotation file and runs QC with the configured calibration
/// names.
pub fn qc_geojson_file<P: AsRef<Path>>(path: P, config: &QcConfig) -> Result<QcOutcome> {
    let features = read_geojson(path.as_ref())
        .with_context(|| format!("failed to load GeoJSON {:?}", path.as_ref()))?;
    let outcome = run_qc(features, Some(config.calibration_names.as_slice()), config)
        .with_context(|| format!("QC of {:?} failed", path.as_ref()))?;
    Ok(outcome)
}

#[derive(Debug, Clone)]
pub struct CollectionOutput {
    pub collection: ShapeCollection,
    pub plate_scheme: PlateScheme,
    pub report: MappingReport,
}

impl CollectionOutput {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.report.diagnostics
    }

    pub fn plate_scheme_csv(&self) -> Result<String> {
        plate_scheme_to_csv_string(&self.plate_scheme).context("failed to render plate scheme")
    }
}

/// Confirms `mapping` against the QC'd table and assembles the shape
/// collection and its plate scheme.
pub fn create_collection(
    qc: &QcOutcome,
    mapping: &SampleWellMap,
    acceptable: &[Well],
    config: &LmdConfig,
) -> Result<CollectionOutput> {
    let transform = qc.transform.as_ref().ok_or_else(|| {
        anyhow!("calibration points were not accessible, run QC with calibration names")
    })?;
    let plate = config
        .plate
        .layout()
        .context("invalid plate configuration")?
        .plate;

    let (confirmed, report) = confirm_mapping(
        mapping,
        &qc.class_names(),
        acceptable,
        config.mapping.max_individual_warnings,
    )
    .context("samples and wells could not be confirmed")?;

    let collection = assemble(&qc.table, transform, &confirmed);
    let plate_scheme = PlateScheme::from_mapping(plate, &confirmed);
    Ok(CollectionOutput {
        collection,
        plate_scheme,
        report,
    })
}

/// File-to-file run: QC, mapping from the pasted dictionary, assembly, and
/// the collection JSON plus plate scheme CSV written into `output_dir`.
pub fn process_files<P: AsRef<Path>, Q: AsRef<Path>>(
    geojson_path: P,
    samples_and_wells: &str,
    config: &LmdConfig,
    output_dir: Q,
) -> Result<CollectionOutput> {
    let qc = qc_geojson_file(geojson_path.as_ref(), &config.qc)?;
    let mapping =
        parse_samples_and_wells(samples_and_wells).context("failed to parse samples and wells")?;
    let acceptable = config
        .plate
        .layout()
        .and_then(|layout| layout.acceptable_wells())
        .context("invalid plate configuration")?;
    let output = create_collection(&qc, &mapping, &acceptable, config)?;

    let stem = file_stem(geojson_path.as_ref());
    let out = output_dir.as_ref();
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create output directory {:?}", out))?;
    write_collection_json(
        out.join(format!("{}_collection.json", stem)),
        &output.collection,
    )
    .context("failed to write shape collection")?;
    write_plate_scheme_file(
        out.join(format!("{}_plate_scheme.csv", stem)),
        &output.plate_scheme,
    )
    .context("failed to write plate scheme")?;
    Ok(output)
}

/// Colours a QC'd annotation file by a metadata column and writes
/// `<stem>_<value_key>_labelled_shapes.geojson` into `output_dir`.
pub fn colorize_geojson_file<P: AsRef<Path>, M: AsRef<Path>, Q: AsRef<Path>>(
    geojson_path: P,
    metadata_path: M,
    name_key: &str,
    value_key: &str,
    config: &QcConfig,
    output_dir: Q,
) -> Result<(Vec<AnnotatedGeometry>, PathBuf)> {
    let features = read_geojson(geojson_path.as_ref())
        .with_context(|| format!("failed to load GeoJSON {:?}", geojson_path.as_ref()))?;
    let qc = run_qc(features, None, config).context("QC before colouring failed")?;
    let metadata = MetadataTable::read(metadata_path.as_ref())
        .with_context(|| format!("failed to read metadata {:?}", metadata_path.as_ref()))?;

    let colored = colorize(&qc.table, &metadata, name_key, value_key)
        .context("metadata does not match the shapes")?;

    let path = output_dir.as_ref().join(format!(
        "{}_{}_labelled_shapes.geojson",
        file_stem(geojson_path.as_ref()),
        value_key
    ));
    write_geojson(&path, &colored).with_context(|| format!("failed to write {:?}", path))?;
    Ok((colored, path))
}

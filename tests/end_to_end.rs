use lmdconv::config::LmdConfig;
use lmdconv::diagnostics::{DiagnosticsExt, Severity};
use lmdconv::entry::{colorize_geojson_file, create_collection, process_files, qc_geojson_file};
use lmdconv::io::input::{parse_geojson, read_geojson};
use lmdconv::plate::mapping::parse_samples_and_wells;
use lmdconv::plate::wells::default_acceptable_wells;
use lmdconv::processing::qc::run_qc;
use serde_json::{json, Value};
use std::path::PathBuf;

fn point(name: &str, x: f64, y: f64) -> Value {
    json!({
        "type": "Feature",
        "id": name,
        "geometry": {"type": "Point", "coordinates": [x, y]},
        "properties": {"objectType": "annotation", "name": name}
    })
}

fn square(id: &str, class_name: &str, x: f64, y: f64, size: f64) -> Value {
    json!({
        "type": "Feature",
        "id": id,
        "geometry": {"type": "Polygon", "coordinates": [[
            [x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]
        ]]},
        "properties": {
            "objectType": "annotation",
            "classification": {"name": class_name, "color": [200, 0, 0]}
        }
    })
}

/// calib1..3 on a unit right triangle, Tumor and Stroma fully inside it.
fn five_feature_file() -> String {
    json!({
        "type": "FeatureCollection",
        "features": [
            point("calib1", 0.0, 0.0),
            point("calib2", 1.0, 0.0),
            point("calib3", 0.0, 1.0),
            square("tumor-1", "Tumor", 0.1, 0.1, 0.1),
            square("stroma-1", "Stroma", 0.3, 0.1, 0.1),
        ]
    })
    .to_string()
}

fn write_fixture(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn full_mapping_produces_two_shapes_and_plate_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "slide.geojson", &five_feature_file());
    let config = LmdConfig::default();

    let qc = qc_geojson_file(&path, &config.qc).unwrap();
    assert_eq!(qc.table.len(), 2);
    assert_eq!(qc.class_names(), vec!["Tumor", "Stroma"]);
    assert_eq!(qc.coverage, Some(1.0));
    assert!(!qc.diagnostics.has_severity(Severity::Fatal));
    assert!(!qc.diagnostics.has_severity(Severity::Warning));

    let mapping = parse_samples_and_wells(r#"{"Tumor":"C3","Stroma":"D4"}"#).unwrap();
    let output = create_collection(&qc, &mapping, &default_acceptable_wells(), &config).unwrap();

    let shapes = &output.collection.shapes;
    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].class_name, "Tumor");
    assert_eq!(shapes[0].well.to_string(), "C3");
    assert_eq!(shapes[1].class_name, "Stroma");
    assert_eq!(shapes[1].well.to_string(), "D4");
    assert_eq!(
        output.collection.calibration_points,
        [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
    );
    assert_eq!(output.collection.orientation_transform, [[1.0, 0.0], [0.0, -1.0]]);

    assert_eq!(output.plate_scheme.cell(2, 3), Some("Tumor"));
    assert_eq!(output.plate_scheme.cell(3, 4), Some("Stroma"));
    let csv = output.plate_scheme_csv().unwrap();
    let row_c = csv.lines().nth(3).unwrap();
    assert!(row_c.starts_with("C,,,Tumor,"));
    assert!(output.diagnostics().is_empty());
}

#[test]
fn omitted_class_is_reported_and_excluded() {
    let features = parse_geojson(&five_feature_file()).unwrap();
    let config = LmdConfig::default();
    let qc = run_qc(features, Some(config.qc.calibration_names.as_slice()), &config.qc).unwrap();

    let mapping = parse_samples_and_wells("{'Tumor': 'C3'}").unwrap();
    let output = create_collection(&qc, &mapping, &default_acceptable_wells(), &config).unwrap();

    assert_eq!(output.collection.len(), 1);
    assert_eq!(output.collection.shapes[0].class_name, "Tumor");
    assert_eq!(output.report.missing_classes, vec!["Stroma"]);
    let warnings = output.diagnostics().warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Stroma"));
}

#[test]
fn well_outside_default_set_is_flagged_and_excluded() {
    let features = parse_geojson(&five_feature_file()).unwrap();
    let config = LmdConfig::default();
    let qc = run_qc(features, Some(config.qc.calibration_names.as_slice()), &config.qc).unwrap();

    let mapping = parse_samples_and_wells("{'Tumor': 'A1', 'Stroma': 'D4'}").unwrap();
    let output = create_collection(&qc, &mapping, &default_acceptable_wells(), &config).unwrap();

    assert_eq!(
        output.report.out_of_range,
        vec![("Tumor".to_string(), "A1".to_string())]
    );
    assert!(output.diagnostics().has_severity(Severity::Warning));
    assert_eq!(output.collection.len(), 1);
    assert_eq!(output.collection.shapes[0].class_name, "Stroma");
    assert_eq!(output.plate_scheme.cell(0, 1), None);
}

#[test]
fn unmatched_calibration_name_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "slide.geojson", &five_feature_file());
    let mut config = LmdConfig::default();
    config.qc.calibration_names = vec!["calib1".into(), "calib2".into(), "calib9".into()];

    let err = qc_geojson_file(&path, &config.qc).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("calib9"));
}

#[test]
fn process_files_writes_collection_and_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "slide.geojson", &five_feature_file());
    let out_dir = dir.path().join("out");

    let output = process_files(
        &path,
        "{\n  'Tumor': 'C3',\n  'Stroma': 'D4'\n}",
        &LmdConfig::default(),
        &out_dir,
    )
    .unwrap();
    assert_eq!(output.collection.len(), 2);

    let text = std::fs::read_to_string(out_dir.join("slide_collection.json")).unwrap();
    let dump: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(dump["shapes"].as_array().unwrap().len(), 2);
    assert_eq!(dump["stats"]["total_shapes"], json!(2));
    assert!(out_dir.join("slide_plate_scheme.csv").exists());
}

#[test]
fn colorize_round_trips_into_geojson() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "slide.geojson", &five_feature_file());
    let metadata = write_fixture(
        &dir,
        "meta.tsv",
        "sample\tcondition\nTumor\ttreated\nStroma \tcontrol\n",
    );

    let (colored, out_path) = colorize_geojson_file(
        &path,
        &metadata,
        "sample",
        "condition",
        &LmdConfig::default().qc,
        dir.path(),
    )
    .unwrap();
    assert_eq!(colored.len(), 2);
    assert_eq!(
        out_path.file_name().unwrap().to_string_lossy(),
        "slide_condition_labelled_shapes.geojson"
    );

    let back = read_geojson(&out_path).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back[0].name.as_deref(), Some("Tumor"));
    let class = back[0].classification.as_ref().unwrap();
    assert_eq!(class.name.as_deref(), Some("treated"));
    assert_eq!(class.color, Some(json!([255, 127, 14])));
}

#[test]
fn colorize_with_unknown_shape_names_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "slide.geojson", &five_feature_file());
    let metadata = write_fixture(&dir, "meta.csv", "sample,condition\nTumor,treated\n");

    let err = colorize_geojson_file(
        &path,
        &metadata,
        "sample",
        "condition",
        &LmdConfig::default().qc,
        dir.path(),
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("Stroma"));
}

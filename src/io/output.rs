use csv::Writer;
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::io::input::AnnotatedGeometry;
use crate::plate::scheme::PlateScheme;
use crate::processing::collection::ShapeCollection;

/// Writes the plate grid: header `,1,2,...`, one row per plate row letter,
/// occupied cells hold the class name.
pub fn write_plate_scheme<W: Write>(scheme: &PlateScheme, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    let mut header = vec![String::new()];
    header.extend((1..=scheme.cols()).map(|c| c.to_string()));
    wtr.write_record(&header)?;

    for (letter, cells) in scheme.iter_rows() {
        let mut record = vec![letter.to_string()];
        record.extend(cells.iter().map(|c| c.clone().unwrap_or_default()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn plate_scheme_to_csv_string(scheme: &PlateScheme) -> Result<String> {
    let mut buf = Vec::new();
    write_plate_scheme(scheme, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn write_plate_scheme_file<P: AsRef<Path>>(path: P, scheme: &PlateScheme) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_plate_scheme(scheme, BufWriter::new(file))?;
    log::info!("Plate scheme written to {:?}", path.as_ref());
    Ok(())
}

fn feature_to_geojson(record: &AnnotatedGeometry) -> Value {
    let mut properties: Map<String, Value> = record.properties.clone();
    if let Some(name) = &record.name {
        properties.insert("name".to_string(), Value::String(name.clone()));
    }
    if let Some(classification) = &record.classification {
        properties.insert("classification".to_string(), classification.to_value());
    }
    json!({
        "type": "Feature",
        "id": record.id,
        "geometry": record.geometry.to_geojson(),
        "properties": properties,
    })
}

/// FeatureCollection QuPath can import back.
pub fn features_to_geojson(table: &[AnnotatedGeometry]) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": table.iter().map(feature_to_geojson).collect::<Vec<_>>(),
    })
}

pub fn write_geojson<P: AsRef<Path>>(path: P, table: &[AnnotatedGeometry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer(&mut writer, &features_to_geojson(table))?;
    writer.flush()?;
    log::info!("{} features written to {:?}", table.len(), path.as_ref());
    Ok(())
}

/// Collection dump for the device exporter: shapes with wells, calibration
/// points, orientation matrix and stats.
pub fn write_collection_json<P: AsRef<Path>>(path: P, collection: &ShapeCollection) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, collection)?;
    writer.flush()?;
    log::info!(
        "Collection with {} shapes written to {:?}",
        collection.len(),
        path.as_ref()
    );
    Ok(())
}

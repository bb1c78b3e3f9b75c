//! Recolours a clean table by a metadata column so that QuPath shows one
//! colour per metadata category.

use serde_json::json;
use std::collections::{BTreeSet, HashMap};

use crate::error::{LmdError, Result};
use crate::io::input::{AnnotatedGeometry, Classification};
use crate::io::metadata::MetadataTable;
use crate::processing::qc::distinct_class_names;

pub const DEFAULT_COLORS: [[u8; 3]; 5] = [
    [31, 119, 180],
    [255, 127, 14],
    [44, 160, 44],
    [214, 39, 40],
    [148, 103, 189],
];

/// Shape names absent from the metadata names, both sides trimmed. Empty
/// means every shape name is covered.
pub fn check_ids<S: AsRef<str>, M: AsRef<str>>(
    shape_names: &[S],
    metadata_names: &[M],
) -> BTreeSet<String> {
    let known: BTreeSet<&str> = metadata_names.iter().map(|n| n.as_ref().trim()).collect();
    let missing: BTreeSet<String> = shape_names
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !known.contains(n))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        log::debug!("All shape names are present in the metadata");
    } else {
        log::debug!("Shape names missing from the metadata: {:?}", missing);
    }
    missing
}

/// Colour for every distinct value, assigned in sorted order and cycling
/// through [`DEFAULT_COLORS`].
pub fn color_categories<S: AsRef<str>>(values: &[S]) -> Vec<(String, [u8; 3])> {
    let categories: BTreeSet<&str> = values.iter().map(|v| v.as_ref().trim()).collect();
    categories
        .into_iter()
        .zip(DEFAULT_COLORS.iter().cycle())
        .map(|(v, c)| (v.to_string(), *c))
        .collect()
}

/// Rewrites each record's classification to `{name: <metadata value>,
/// color: <category colour>}` and moves the class name into `name`.
pub fn colorize(
    clean_table: &[AnnotatedGeometry],
    metadata: &MetadataTable,
    name_key: &str,
    value_key: &str,
) -> Result<Vec<AnnotatedGeometry>> {
    let names = metadata.column(name_key)?;
    let values = metadata.column(value_key)?;

    let missing = check_ids(&distinct_class_names(clean_table), &names);
    if !missing.is_empty() {
        log::error!(
            "Shape names not found in metadata column '{}': {:?}",
            name_key,
            missing
        );
        return Err(LmdError::MetadataMismatch { missing });
    }

    let lookup: HashMap<&str, &str> = names
        .iter()
        .map(|n| n.trim())
        .zip(values.iter().map(|v| v.trim()))
        .collect();
    let colors: HashMap<String, [u8; 3]> = color_categories(&values).into_iter().collect();
    log::info!(
        "Colouring {} shapes by '{}' ({} categories)",
        clean_table.len(),
        value_key,
        colors.len()
    );

    let mut colored = Vec::with_capacity(clean_table.len());
    for record in clean_table {
        let mut record = record.clone();
        let Some(class_name) = record.classification_name.take() else {
            continue;
        };
        let value = lookup
            .get(class_name.trim())
            .copied()
            .unwrap_or_default();
        let color = colors.get(value).copied().unwrap_or(DEFAULT_COLORS[0]);

        record.classification = Some(Classification::new(value, json!(color)));
        record.name = Some(
            record
                .original_classification_name
                .clone()
                .unwrap_or(class_name),
        );
        colored.push(record);
    }
    Ok(colored)
}

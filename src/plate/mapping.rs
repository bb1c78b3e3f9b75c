//! Sample-to-well mapping: construction, validation and lifecycle.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::diagnostics::Diagnostic;
use crate::error::{LmdError, Result};
use crate::io::literal::parse_literal;
use crate::plate::wells::Well;

/// Class name → well as entered by the user, in entry order.
///
/// Wells are kept as raw strings so that entries pointing outside the
/// acceptable set can be reported instead of rejected at parse time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SampleWellMap {
    entries: Vec<(String, String)>,
}

impl SampleWellMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; a replaced key keeps its position.
    pub fn insert(&mut self, class_name: impl Into<String>, well: impl Into<String>) {
        let class_name = class_name.into();
        let well = well.into();
        match self.entries.iter_mut().find(|(k, _)| *k == class_name) {
            Some(entry) => entry.1 = well,
            None => self.entries.push((class_name, well)),
        }
    }

    pub fn get(&self, class_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == class_name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, class_name: &str) -> bool {
        self.get(class_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SampleWellMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SampleWellMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Parses a pasted dictionary literal such as `{"sample": "C3", ...}`.
///
/// Line breaks and `#` comments between entries are whitespace to the
/// literal parser, so copy-pasted multi-line text parses as is. Entries keep
/// the order they were written in.
pub fn parse_samples_and_wells(text: &str) -> Result<SampleWellMap> {
    if text.trim().is_empty() {
        return Err(LmdError::EmptyMapping);
    }
    let value = parse_literal(text).inspect_err(|e| {
        log::error!("Failed to parse samples and wells: {}", e);
    })?;

    let obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(LmdError::MappingNotADict(format!(
                "expected a dictionary, got {}",
                other
            )))
        }
    };
    let mut map = SampleWellMap::new();
    for (class_name, well) in obj {
        match well {
            Value::String(w) => map.insert(class_name, w),
            other => {
                return Err(LmdError::MappingNotADict(format!(
                    "well for '{}' is not a string: {}",
                    class_name, other
                )))
            }
        }
    }
    Ok(map)
}

/// Pairs classes with wells positionally.
pub fn default_assignment(class_names: &[String], wells: &[Well]) -> Result<SampleWellMap> {
    if class_names.len() > wells.len() {
        return Err(LmdError::TooManySamples {
            samples: class_names.len(),
            wells: wells.len(),
        });
    }
    Ok(class_names
        .iter()
        .zip(wells)
        .map(|(c, w)| (c.clone(), w.to_string()))
        .collect())
}

/// Uniformly shuffled copy of `wells`, for layout previews only.
pub fn randomize(wells: &[Well]) -> Vec<Well> {
    randomize_with(wells, &mut rand::rng())
}

pub fn randomize_with<R: Rng + ?Sized>(wells: &[Well], rng: &mut R) -> Vec<Well> {
    let mut shuffled = wells.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// `"{a}_{b}_{i}"` for every a, b and i in `1..=replicates`.
pub fn generate_sample_names(
    first: &[String],
    second: &[String],
    replicates: usize,
) -> Result<Vec<String>> {
    if replicates == 0 {
        return Err(LmdError::MalformedInput(
            "number of replicates must be a positive integer".to_string(),
        ));
    }
    let mut names = Vec::with_capacity(first.len() * second.len() * replicates);
    for a in first {
        for b in second {
            for i in 1..=replicates {
                names.push(format!("{}_{}_{}", a, b, i));
            }
        }
    }
    log::info!("Created {} sample name combinations", names.len());
    Ok(names)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MappingReport {
    /// `(class, well)` entries whose well is not acceptable.
    pub out_of_range: Vec<(String, String)>,
    /// Classes present in the geometry table but absent from the mapping.
    pub missing_classes: Vec<String>,
    /// Mapping keys that no shape uses.
    pub unused_classes: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Checks a mapping against the clean table's classes and the acceptable
/// wells. Only an empty mapping is fatal; everything else is reported.
pub fn validate_mapping(
    mapping: &SampleWellMap,
    class_names: &[String],
    acceptable: &[Well],
    max_individual_warnings: usize,
) -> Result<MappingReport> {
    if mapping.is_empty() {
        log::error!("samples and wells dictionary is empty");
        return Err(LmdError::EmptyMapping);
    }
    let acceptable: HashSet<&Well> = acceptable.iter().collect();
    let mut report = MappingReport::default();

    for (class_name, well) in mapping.iter() {
        let ok = well
            .parse::<Well>()
            .map(|w| acceptable.contains(&w))
            .unwrap_or(false);
        if !ok {
            report
                .out_of_range
                .push((class_name.to_string(), well.to_string()));
        }
    }
    for (i, (class_name, well)) in report.out_of_range.iter().enumerate() {
        if i >= max_individual_warnings {
            break;
        }
        log::warn!("Well {} for {} is not an acceptable well", well, class_name);
        report.diagnostics.push(Diagnostic::warning(format!(
            "Your well {} for '{}' is not in the list of acceptable wells; \
             shapes of this class will not be collected",
            well, class_name
        )));
    }
    if report.out_of_range.len() > max_individual_warnings {
        let rest = report.out_of_range.len() - max_individual_warnings;
        report.diagnostics.push(Diagnostic::warning(format!(
            "... and {} more samples mapped to wells outside the acceptable set ({} in total)",
            rest,
            report.out_of_range.len()
        )));
    }

    report.missing_classes = class_names
        .iter()
        .filter(|c| !mapping.contains_key(c))
        .cloned()
        .collect();
    if !report.missing_classes.is_empty() {
        log::warn!("Missing classes from mapping: {:?}", report.missing_classes);
        report.diagnostics.push(Diagnostic::warning(format!(
            "Missing classes from samples and wells: {:?}; their shapes will not be collected",
            report.missing_classes
        )));
    }

    report.unused_classes = mapping
        .iter()
        .map(|(k, _)| k)
        .filter(|k| !class_names.iter().any(|c| c == k))
        .map(str::to_string)
        .collect();
    if !report.unused_classes.is_empty() {
        report.diagnostics.push(Diagnostic::info(format!(
            "{} entries in samples and wells have no shapes: {:?}",
            report.unused_classes.len(),
            report.unused_classes
        )));
    }
    Ok(report)
}

/// Validated mapping restricted to acceptable wells; the only form shape
/// assembly accepts.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConfirmedMapping {
    entries: Vec<(String, Well)>,
}

impl ConfirmedMapping {
    pub fn well_for(&self, class_name: &str) -> Option<Well> {
        self.entries
            .iter()
            .find(|(k, _)| k == class_name)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Well)> {
        self.entries.iter().map(|(k, w)| (k.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn confirm_mapping(
    mapping: &SampleWellMap,
    class_names: &[String],
    acceptable: &[Well],
    max_individual_warnings: usize,
) -> Result<(ConfirmedMapping, MappingReport)> {
    let report = validate_mapping(mapping, class_names, acceptable, max_individual_warnings)?;
    let entries = mapping
        .iter()
        .filter(|(k, _)| !report.out_of_range.iter().any(|(c, _)| c == k))
        .filter_map(|(k, w)| w.parse::<Well>().ok().map(|w| (k.to_string(), w)))
        .collect();
    Ok((ConfirmedMapping { entries }, report))
}

/// Lifecycle of the mapping between user actions:
/// `Unset -> Draft -> Confirmed -> Unset`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MappingState {
    #[default]
    Unset,
    Draft(SampleWellMap),
    Confirmed {
        draft: SampleWellMap,
        mapping: ConfirmedMapping,
        report: MappingReport,
    },
}

impl MappingState {
    /// Replaces whatever was there; regeneration never merges.
    pub fn set_draft(&mut self, draft: SampleWellMap) {
        *self = MappingState::Draft(draft);
    }

    /// Validates the current draft and locks it for export. On error the
    /// state is left untouched.
    pub fn confirm(
        &mut self,
        class_names: &[String],
        acceptable: &[Well],
        max_individual_warnings: usize,
    ) -> Result<MappingReport> {
        let draft = match self {
            MappingState::Unset => return Err(LmdError::EmptyMapping),
            MappingState::Draft(draft) => draft.clone(),
            MappingState::Confirmed { draft, .. } => draft.clone(),
        };
        let (mapping, report) =
            confirm_mapping(&draft, class_names, acceptable, max_individual_warnings)?;
        *self = MappingState::Confirmed {
            draft,
            mapping,
            report: report.clone(),
        };
        Ok(report)
    }

    /// Upstream geometry or plate parameters changed.
    pub fn invalidate(&mut self) {
        *self = MappingState::Unset;
    }

    pub fn draft(&self) -> Option<&SampleWellMap> {
        match self {
            MappingState::Unset => None,
            MappingState::Draft(draft) | MappingState::Confirmed { draft, .. } => Some(draft),
        }
    }

    pub fn confirmed(&self) -> Option<&ConfirmedMapping> {
        match self {
            MappingState::Confirmed { mapping, .. } => Some(mapping),
            _ => None,
        }
    }
}

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::plate::mapping::{randomize, ConfirmedMapping, SampleWellMap};
use crate::plate::wells::{PlateType, Well};

/// Plate grid: one cell per well, holding the class collected there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateScheme {
    pub plate: PlateType,
    cells: Vec<Vec<Option<String>>>,
}

impl PlateScheme {
    pub fn empty(plate: PlateType) -> Self {
        Self {
            plate,
            cells: vec![vec![None; plate.cols()]; plate.rows()],
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.plate.cols()
    }

    /// Places `class_name` in `well`. Returns false when the well is not on
    /// this plate.
    pub fn set(&mut self, well: Well, class_name: impl Into<String>) -> bool {
        if !self.plate.contains(&well) {
            return false;
        }
        self.cells[well.row as usize][well.col as usize - 1] = Some(class_name.into());
        true
    }

    pub fn get(&self, well: Well) -> Option<&str> {
        if !self.plate.contains(&well) {
            return None;
        }
        self.cells[well.row as usize][well.col as usize - 1].as_deref()
    }

    /// 0-based row, 1-based column, matching the CSV header.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        if col == 0 {
            return None;
        }
        self.cells.get(row)?.get(col - 1)?.as_deref()
    }

    /// Row letter followed by the row's cells, in plate order.
    pub fn iter_rows(&self) -> impl Iterator<Item = (char, &[Option<String>])> {
        self.plate
            .row_letters()
            .zip(self.cells.iter().map(|r| r.as_slice()))
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Plate scheme export for a confirmed mapping.
    pub fn from_mapping(plate: PlateType, mapping: &ConfirmedMapping) -> Self {
        let mut scheme = Self::empty(plate);
        for (class_name, well) in mapping.iter() {
            if !scheme.set(well, class_name) {
                log::warn!(
                    "Well {} for {} does not exist on a {}-well plate",
                    well,
                    class_name,
                    plate
                );
            }
        }
        scheme
    }

    /// Lays `class_names` onto `wells` in order, optionally shuffling the
    /// wells first. Classes beyond the number of wells are left out and
    /// reported.
    pub fn preview(
        plate: PlateType,
        class_names: &[String],
        wells: &[Well],
        shuffle: bool,
    ) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        if class_names.len() > wells.len() {
            log::warn!(
                "{} classes but only {} acceptable wells",
                class_names.len(),
                wells.len()
            );
            diagnostics.push(Diagnostic::warning(format!(
                "There are more samples ({}) than wells ({}); {} samples are not placed",
                class_names.len(),
                wells.len(),
                class_names.len() - wells.len()
            )));
        }
        let wells = if shuffle {
            randomize(wells)
        } else {
            wells.to_vec()
        };

        let mut scheme = Self::empty(plate);
        for (class_name, well) in class_names.iter().zip(wells) {
            scheme.set(well, class_name.as_str());
        }
        (scheme, diagnostics)
    }

    /// Grid back to a mapping, row-major. Empty and blank cells are skipped.
    pub fn to_mapping(&self) -> SampleWellMap {
        let mut mapping = SampleWellMap::new();
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(class_name) = cell.as_deref().map(str::trim) {
                    if !class_name.is_empty() {
                        mapping.insert(class_name, Well::new(r as u8, c as u16 + 1).to_string());
                    }
                }
            }
        }
        mapping
    }
}

#[cfg(test)]
mod scheme_tests {
    use super::*;
    use crate::plate::mapping::confirm_mapping;
    use crate::plate::wells::default_acceptable_wells;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scheme_from_confirmed_mapping() {
        let mapping: SampleWellMap = [("Tumor", "C3"), ("Stroma", "D4")].into_iter().collect();
        let (confirmed, _) = confirm_mapping(
            &mapping,
            &names(&["Tumor", "Stroma"]),
            &default_acceptable_wells(),
            10,
        )
        .unwrap();
        let scheme = PlateScheme::from_mapping(PlateType::Wells384, &confirmed);
        assert_eq!(scheme.rows(), 16);
        assert_eq!(scheme.cols(), 24);
        assert_eq!(scheme.cell(2, 3), Some("Tumor"));
        assert_eq!(scheme.cell(3, 4), Some("Stroma"));
        assert_eq!(scheme.cell(0, 1), None);
        assert_eq!(scheme.occupied(), 2);
    }

    #[test]
    fn test_grid_round_trips_to_mapping() {
        let mut scheme = PlateScheme::empty(PlateType::Wells96);
        scheme.set("B2".parse().unwrap(), "s2");
        scheme.set("A5".parse().unwrap(), "s1");
        scheme.set("C1".parse().unwrap(), "  ");
        let mapping = scheme.to_mapping();
        let entries: Vec<(&str, &str)> = mapping.iter().collect();
        assert_eq!(entries, vec![("s1", "A5"), ("s2", "B2")]);
    }

    #[test]
    fn test_set_outside_plate_is_refused() {
        let mut scheme = PlateScheme::empty(PlateType::Wells96);
        assert!(!scheme.set("M3".parse().unwrap(), "x"));
        assert!(!scheme.set("A13".parse().unwrap(), "x"));
        assert_eq!(scheme.occupied(), 0);
    }

    #[test]
    fn test_preview_in_order() {
        let wells = default_acceptable_wells();
        let (scheme, diagnostics) =
            PlateScheme::preview(PlateType::Wells384, &names(&["a", "b"]), &wells, false);
        assert!(diagnostics.is_empty());
        assert_eq!(scheme.get("C3".parse().unwrap()), Some("a"));
        assert_eq!(scheme.get("C4".parse().unwrap()), Some("b"));
    }

    #[test]
    fn test_preview_shuffled_places_every_class_once() {
        let wells = default_acceptable_wells();
        let classes = names(&["a", "b", "c", "d"]);
        let (scheme, _) = PlateScheme::preview(PlateType::Wells384, &classes, &wells, true);
        let mapping = scheme.to_mapping();
        assert_eq!(mapping.len(), 4);
        for (_, well) in mapping.iter() {
            assert!(wells.contains(&well.parse().unwrap()));
        }
    }

    #[test]
    fn test_preview_warns_when_wells_run_out() {
        let wells: Vec<Well> = ["A1", "A2"].iter().map(|w| w.parse().unwrap()).collect();
        let (scheme, diagnostics) =
            PlateScheme::preview(PlateType::Wells96, &names(&["a", "b", "c"]), &wells, false);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(scheme.occupied(), 2);
    }
}

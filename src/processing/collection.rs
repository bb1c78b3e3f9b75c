use nalgebra::{Matrix2, Vector2};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::io::input::{AnnotatedGeometry, Coord};
use crate::plate::mapping::ConfirmedMapping;
use crate::plate::wells::Well;
use crate::processing::calibration::TransformDescriptor;

/// One cut: a simplified outline and the well it is collected into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub id: String,
    pub class_name: String,
    pub well: Well,
    pub coords: Vec<Coord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    pub class_name: String,
    pub well: Well,
    pub shapes: usize,
}

/// Numbers to eyeball before committing to a physical collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CollectionStats {
    pub total_shapes: usize,
    pub total_vertices: usize,
    /// Sorted by class name.
    pub classes: Vec<ClassStats>,
}

impl CollectionStats {
    fn from_shapes(shapes: &[Shape]) -> Self {
        let mut per_class: BTreeMap<&str, (Well, usize)> = BTreeMap::new();
        for shape in shapes {
            per_class
                .entry(shape.class_name.as_str())
                .or_insert((shape.well, 0))
                .1 += 1;
        }
        Self {
            total_shapes: shapes.len(),
            total_vertices: shapes.iter().map(|s| s.coords.len()).sum(),
            classes: per_class
                .into_iter()
                .map(|(class_name, (well, shapes))| ClassStats {
                    class_name: class_name.to_string(),
                    well,
                    shapes,
                })
                .collect(),
        }
    }

    pub fn shapes_for(&self, class_name: &str) -> usize {
        self.classes
            .iter()
            .find(|c| c.class_name == class_name)
            .map_or(0, |c| c.shapes)
    }
}

/// Everything the device exporter needs. Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeCollection {
    pub shapes: Vec<Shape>,
    pub calibration_points: [[f64; 2]; 3],
    pub orientation_transform: [[f64; 2]; 2],
    pub stats: CollectionStats,
}

impl ShapeCollection {
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shape outlines with the orientation transform applied.
    pub fn oriented_coords(&self) -> Vec<Vec<Coord>> {
        let [[a, b], [c, d]] = self.orientation_transform;
        let m = Matrix2::new(a, b, c, d);
        self.shapes
            .iter()
            .map(|s| {
                s.coords
                    .iter()
                    .map(|p| {
                        let v = m * Vector2::new(p[0], p[1]);
                        [v.x, v.y]
                    })
                    .collect()
            })
            .collect()
    }
}

/// Pairs every clean-table record whose class is mapped with its well, in
/// table order. Unmapped classes are skipped; they were reported when the
/// mapping was confirmed.
pub fn assemble(
    clean_table: &[AnnotatedGeometry],
    transform: &TransformDescriptor,
    mapping: &ConfirmedMapping,
) -> ShapeCollection {
    let shapes: Vec<Shape> = clean_table
        .iter()
        .filter_map(|record| {
            let class_name = record.classification_name.as_deref()?;
            let well = mapping.well_for(class_name)?;
            Some(Shape {
                id: record.id.clone(),
                class_name: class_name.to_string(),
                well,
                coords: record.coords.clone(),
            })
        })
        .collect();

    let skipped = clean_table.len() - shapes.len();
    if skipped > 0 {
        log::info!("{} shapes without a well are not collected", skipped);
    }
    let stats = CollectionStats::from_shapes(&shapes);
    log::info!(
        "Shape collection assembled: {} shapes, {} vertices, {} classes",
        stats.total_shapes,
        stats.total_vertices,
        stats.classes.len()
    );

    ShapeCollection {
        shapes,
        calibration_points: transform.calibration_rows(),
        orientation_transform: transform.orientation_rows(),
        stats,
    }
}

#[cfg(test)]
mod collection_tests {
    use super::*;
    use crate::plate::mapping::{confirm_mapping, SampleWellMap};
    use crate::plate::wells::default_acceptable_wells;
    use crate::processing::calibration::{build_transform, CalibrationPoints};
    use crate::utils::test_utils::{calib_names, clean_record};
    use approx::assert_relative_eq;

    fn transform() -> TransformDescriptor {
        build_transform(&CalibrationPoints {
            names: calib_names(),
            points: [[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]],
        })
        .unwrap()
    }

    fn confirmed(entries: &[(&str, &str)], classes: &[&str]) -> ConfirmedMapping {
        let mapping: SampleWellMap = entries.iter().copied().collect();
        let classes: Vec<String> = classes.iter().map(|s| s.to_string()).collect();
        confirm_mapping(&mapping, &classes, &default_acceptable_wells(), 10)
            .unwrap()
            .0
    }

    #[test]
    fn test_assemble_keeps_table_order() {
        let table = vec![
            clean_record("s1", "Stroma", 10.0),
            clean_record("s2", "Tumor", 20.0),
            clean_record("s3", "Stroma", 30.0),
        ];
        let mapping = confirmed(&[("Tumor", "C3"), ("Stroma", "D4")], &["Stroma", "Tumor"]);
        let collection = assemble(&table, &transform(), &mapping);

        let ids: Vec<&str> = collection.shapes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        let wells: Vec<String> = collection.shapes.iter().map(|s| s.well.to_string()).collect();
        assert_eq!(wells, vec!["D4", "C3", "D4"]);
        assert_eq!(collection.calibration_points, [[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]]);
        assert_eq!(collection.orientation_transform, [[1.0, 0.0], [0.0, -1.0]]);
    }

    #[test]
    fn test_unmapped_classes_are_excluded() {
        let table = vec![
            clean_record("s1", "Stroma", 10.0),
            clean_record("s2", "Tumor", 20.0),
        ];
        let mapping = confirmed(&[("Tumor", "C3")], &["Stroma", "Tumor"]);
        let collection = assemble(&table, &transform(), &mapping);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.shapes[0].class_name, "Tumor");
    }

    #[test]
    fn test_stats_sorted_by_class() {
        let table = vec![
            clean_record("s1", "Tumor", 10.0),
            clean_record("s2", "Stroma", 20.0),
            clean_record("s3", "Tumor", 30.0),
        ];
        let mapping = confirmed(&[("Tumor", "C3"), ("Stroma", "D4")], &["Tumor", "Stroma"]);
        let stats = assemble(&table, &transform(), &mapping).stats;
        assert_eq!(stats.total_shapes, 3);
        assert_eq!(stats.total_vertices, 15);
        assert_eq!(stats.classes[0].class_name, "Stroma");
        assert_eq!(stats.classes[0].well.to_string(), "D4");
        assert_eq!(stats.shapes_for("Tumor"), 2);
        assert_eq!(stats.shapes_for("Immune"), 0);
    }

    #[test]
    fn test_oriented_coords_flip_y() {
        let table = vec![clean_record("s1", "Tumor", 10.0)];
        let mapping = confirmed(&[("Tumor", "C3")], &["Tumor"]);
        let collection = assemble(&table, &transform(), &mapping);
        let oriented = collection.oriented_coords();
        for (p, q) in collection.shapes[0].coords.iter().zip(&oriented[0]) {
            assert_relative_eq!(q[0], p[0]);
            assert_relative_eq!(q[1], -p[1]);
        }
    }
}

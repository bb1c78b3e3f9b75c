use geo::{MultiPolygon, Point, Polygon};

use crate::io::input::{line_string, AnnotatedGeometry, Coord, Geometry};

pub fn calib_names() -> Vec<String> {
    vec![
        "calib1".to_string(),
        "calib2".to_string(),
        "calib3".to_string(),
    ]
}

/// Named Point annotation, as used for calibration marks
pub fn point_feature(id: &str, name: &str, at: Coord) -> AnnotatedGeometry {
    AnnotatedGeometry::new(id, Geometry::Point(Point::new(at[0], at[1]))).with_name(name)
}

/// Closed axis-aligned square ring with lower-left corner at (x, y)
pub fn square_ring(x: f64, y: f64, size: f64) -> Vec<Coord> {
    vec![
        [x, y],
        [x + size, y],
        [x + size, y + size],
        [x, y + size],
        [x, y],
    ]
}

pub fn square_polygon(x: f64, y: f64, size: f64) -> Polygon<f64> {
    Polygon::new(line_string(&square_ring(x, y, size)), Vec::new())
}

/// Square Polygon, classified when `class_name` is given
pub fn polygon_feature(
    id: &str,
    class_name: Option<&str>,
    x: f64,
    y: f64,
    size: f64,
) -> AnnotatedGeometry {
    let geometry = Geometry::Polygon(square_polygon(x, y, size));
    with_optional_class(AnnotatedGeometry::new(id, geometry), class_name)
}

pub fn line_feature(id: &str, class_name: Option<&str>, path: &[Coord]) -> AnnotatedGeometry {
    let geometry = Geometry::LineString(line_string(path));
    with_optional_class(AnnotatedGeometry::new(id, geometry), class_name)
}

/// Two disjoint unit squares in one MultiPolygon
pub fn multipolygon_feature(id: &str, class_name: Option<&str>) -> AnnotatedGeometry {
    let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![
        square_polygon(0.0, 0.0, 1.0),
        square_polygon(3.0, 3.0, 1.0),
    ]));
    with_optional_class(AnnotatedGeometry::new(id, geometry), class_name)
}

/// Record as it leaves QC: 5x5 square at (offset, offset) with coords set
pub fn clean_record(id: &str, class_name: &str, offset: f64) -> AnnotatedGeometry {
    let mut record = polygon_feature(id, Some(class_name), offset, offset, 5.0);
    record.classification_name = Some(class_name.to_string());
    record.coords = square_ring(offset, offset, 5.0);
    record
}

fn with_optional_class(feature: AnnotatedGeometry, class_name: Option<&str>) -> AnnotatedGeometry {
    match class_name {
        Some(c) => feature.with_class(c),
        None => feature,
    }
}

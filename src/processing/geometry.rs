use geo::{Area, Intersects, LineString, Simplify, Triangle};

use crate::io::input::{coords_of, Coord, Geometry};

const EPS: f64 = 1e-12;

fn triangle(a: Coord, b: Coord, c: Coord) -> Triangle<f64> {
    Triangle::new(
        geo::Coord { x: a[0], y: a[1] },
        geo::Coord { x: b[0], y: b[1] },
        geo::Coord { x: c[0], y: c[1] },
    )
}

/// Signed area of the triangle (a, b, c); positive when counterclockwise.
pub fn triangle_signed_area(a: Coord, b: Coord, c: Coord) -> f64 {
    triangle(a, b, c).signed_area()
}

/// Whether `geometry` shares at least one point with the closed triangle.
pub fn intersects_triangle(geometry: &Geometry, tri: &[Coord; 3]) -> bool {
    let area = triangle(tri[0], tri[1], tri[2]).to_polygon();
    match geometry {
        Geometry::Point(p) => area.intersects(&p.0),
        Geometry::LineString(path) => area.intersects(path),
        Geometry::Polygon(polygon) => area.intersects(polygon),
        Geometry::MultiPolygon(parts) => parts.iter().any(|p| area.intersects(p)),
        Geometry::Other { .. } => false,
    }
}

/// Simplified, explicitly closed exterior ring. Falls back to the input ring
/// when simplification would collapse it below a triangle.
pub fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> Vec<Coord> {
    let mut closed = ring.clone();
    closed.close();
    if tolerance <= 0.0 {
        return coords_of(&closed);
    }
    let simplified = closed.simplify(&tolerance);
    let area = geo::Polygon::new(simplified.clone(), Vec::new()).unsigned_area();
    if simplified.0.len() < 4 || area <= EPS {
        coords_of(&closed)
    } else {
        coords_of(&simplified)
    }
}

/// Simplified open path; never collapses below its two endpoints.
pub fn simplify_line(path: &LineString<f64>, tolerance: f64) -> Vec<Coord> {
    if tolerance <= 0.0 {
        return coords_of(path);
    }
    coords_of(&path.simplify(&tolerance))
}

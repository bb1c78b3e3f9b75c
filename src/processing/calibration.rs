use nalgebra::{Matrix2, Matrix3x2};
use serde::Serialize;

use crate::error::{LmdError, Result};
use crate::io::input::{AnnotatedGeometry, Coord, Geometry};
use crate::processing::geometry::triangle_signed_area;

/// Relative tolerance for the collinearity test, scaled by the squared
/// longest side of the triangle.
const COLLINEAR_RTOL: f64 = 1e-9;

/// Three calibration points in the user's order. Order is significant: index
/// i is the fiducial the device expects as reference mark i.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationPoints {
    pub names: Vec<String>,
    pub points: [Coord; 3],
}

impl CalibrationPoints {
    pub fn triangle(&self) -> [Coord; 3] {
        self.points
    }
}

/// What the exporter needs to place shapes on the device stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformDescriptor {
    pub calibration_points: Matrix3x2<f64>,
    pub orientation_transform: Matrix2<f64>,
}

impl TransformDescriptor {
    /// Flip of the y axis between the annotation frame and the device frame.
    pub fn orientation() -> Matrix2<f64> {
        Matrix2::new(1.0, 0.0, 0.0, -1.0)
    }

    pub fn calibration_rows(&self) -> [[f64; 2]; 3] {
        let m = &self.calibration_points;
        [[m[(0, 0)], m[(0, 1)]], [m[(1, 0)], m[(1, 1)]], [m[(2, 0)], m[(2, 1)]]]
    }

    pub fn orientation_rows(&self) -> [[f64; 2]; 2] {
        let m = &self.orientation_transform;
        [[m[(0, 0)], m[(0, 1)]], [m[(1, 0)], m[(1, 1)]]]
    }

    /// Applies the orientation matrix to one annotation coordinate.
    pub fn orient(&self, c: Coord) -> Coord {
        let v = self.orientation_transform * nalgebra::Vector2::new(c[0], c[1]);
        [v.x, v.y]
    }
}

/// Locates each calibration name among the Point annotations.
///
/// Every name must match exactly one Point whose `name` property equals it.
/// The error for an unmatched name lists both what was asked for and every
/// point label present, so users can spot typos themselves.
pub fn extract_calibration_points(
    features: &[AnnotatedGeometry],
    names: &[String],
) -> Result<CalibrationPoints> {
    if names.len() != 3 {
        return Err(LmdError::CalibrationCount(names.len()));
    }

    let available: Vec<String> = features
        .iter()
        .filter(|f| matches!(f.geometry, Geometry::Point(_)))
        .filter_map(|f| f.name.clone())
        .collect();

    let mut points = [[0.0; 2]; 3];
    for (slot, name) in points.iter_mut().zip(names) {
        let matches: Vec<Coord> = features
            .iter()
            .filter(|f| f.name.as_deref() == Some(name.as_str()))
            .filter_map(|f| match &f.geometry {
                Geometry::Point(p) => Some([p.x(), p.y()]),
                _ => None,
            })
            .collect();

        match matches.as_slice() {
            [p] => *slot = *p,
            [] => {
                log::error!("Your given annotation_name {} is not present in the file", name);
                log::error!("These are the calib points you passed: {:?}", names);
                log::error!("These are the calib points found in the geojson: {:?}", available);
                return Err(LmdError::CalibrationPointNotFound {
                    name: name.clone(),
                    requested: names.to_vec(),
                    available,
                });
            }
            many => {
                return Err(LmdError::DuplicateCalibrationPoint {
                    name: name.clone(),
                    count: many.len(),
                })
            }
        }
    }

    Ok(CalibrationPoints {
        names: names.to_vec(),
        points,
    })
}

/// Packages the calibration points for export, rejecting triangles with
/// (near) zero area.
pub fn build_transform(calibration: &CalibrationPoints) -> Result<TransformDescriptor> {
    let [a, b, c] = calibration.points;
    let area = triangle_signed_area(a, b, c);

    let side2 = |p: Coord, q: Coord| (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2);
    let scale = side2(a, b).max(side2(b, c)).max(side2(c, a));
    if scale == 0.0 || area.abs() <= COLLINEAR_RTOL * scale {
        log::error!("Calibration points {:?} are collinear", calibration.names);
        return Err(LmdError::CollinearCalibration {
            names: calibration.names.clone(),
            area,
        });
    }

    let calibration_points = Matrix3x2::new(a[0], a[1], b[0], b[1], c[0], c[1]);
    Ok(TransformDescriptor {
        calibration_points,
        orientation_transform: TransformDescriptor::orientation(),
    })
}

#[cfg(test)]
mod calibration_tests {
    use super::*;
    use crate::utils::test_utils::{calib_names, point_feature, polygon_feature};
    use approx::assert_relative_eq;

    #[test]
    fn test_extract_keeps_requested_order() {
        let features = vec![
            point_feature("p3", "calib3", [0.0, 100.0]),
            polygon_feature("s1", Some("Tumor"), 10.0, 10.0, 5.0),
            point_feature("p1", "calib1", [0.0, 0.0]),
            point_feature("p2", "calib2", [100.0, 0.0]),
        ];
        let calib = extract_calibration_points(&features, &calib_names()).unwrap();
        assert_eq!(calib.points, [[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]]);

        let reversed: Vec<String> = calib_names().into_iter().rev().collect();
        let calib = extract_calibration_points(&features, &reversed).unwrap();
        assert_eq!(calib.points, [[0.0, 100.0], [100.0, 0.0], [0.0, 0.0]]);
    }

    #[test]
    fn test_missing_name_reports_requested_and_available() {
        let features = vec![
            point_feature("p1", "calib1", [0.0, 0.0]),
            point_feature("p2", "calib2", [1.0, 0.0]),
            point_feature("p3", "calib_3", [0.0, 1.0]),
        ];
        let err = extract_calibration_points(&features, &calib_names()).unwrap_err();
        match err {
            LmdError::CalibrationPointNotFound {
                name,
                requested,
                available,
            } => {
                assert_eq!(name, "calib3");
                assert_eq!(requested, calib_names());
                assert_eq!(available, vec!["calib1", "calib2", "calib_3"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_point_name_is_fatal() {
        let features = vec![
            point_feature("p1", "calib1", [0.0, 0.0]),
            point_feature("p1b", "calib1", [5.0, 0.0]),
            point_feature("p2", "calib2", [1.0, 0.0]),
            point_feature("p3", "calib3", [0.0, 1.0]),
        ];
        assert!(matches!(
            extract_calibration_points(&features, &calib_names()),
            Err(LmdError::DuplicateCalibrationPoint { count: 2, .. })
        ));
    }

    #[test]
    fn test_build_transform_flips_y() {
        let calib = CalibrationPoints {
            names: calib_names(),
            points: [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        };
        let t = build_transform(&calib).unwrap();
        assert_eq!(t.orientation_rows(), [[1.0, 0.0], [0.0, -1.0]]);
        assert_eq!(t.calibration_rows(), calib.points);
        let p = t.orient([3.0, 4.0]);
        assert_relative_eq!(p[0], 3.0);
        assert_relative_eq!(p[1], -4.0);
    }

    #[test]
    fn test_collinear_points_are_rejected() {
        let calib = CalibrationPoints {
            names: calib_names(),
            points: [[0.0, 0.0], [50.0, 50.0], [100.0, 100.0]],
        };
        assert!(matches!(
            build_transform(&calib),
            Err(LmdError::CollinearCalibration { .. })
        ));

        let coincident = CalibrationPoints {
            names: calib_names(),
            points: [[1.0, 1.0]; 3],
        };
        assert!(build_transform(&coincident).is_err());
    }

    #[test]
    fn test_wrong_number_of_names() {
        let names = vec!["calib1".to_string(), "calib2".to_string()];
        assert!(matches!(
            extract_calibration_points(&[], &names),
            Err(LmdError::CalibrationCount(2))
        ));
    }
}

use geo::{LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::error::{LmdError, Result};
use crate::io::literal::parse_literal;

/// (x, y) in the annotation tool's coordinate frame.
pub type Coord = [f64; 2];

pub fn line_string(coords: &[Coord]) -> LineString<f64> {
    coords
        .iter()
        .map(|c| geo::Coord { x: c[0], y: c[1] })
        .collect()
}

pub fn coords_of(line: &LineString<f64>) -> Vec<Coord> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

/// Closed set of geometry kinds the pipeline distinguishes. Anything the
/// export format cannot carry lands in `Other` and is rejected by QC.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    Other { kind: String, raw: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
    Other,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GeometryKind::Point => "Point",
                GeometryKind::LineString => "LineString",
                GeometryKind::Polygon => "Polygon",
                GeometryKind::MultiPolygon => "MultiPolygon",
                GeometryKind::Other => "Other",
            }
        )
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::Other { .. } => GeometryKind::Other,
        }
    }

    /// GeoJSON type name, including the original name for `Other`.
    pub fn type_name(&self) -> String {
        match self {
            Geometry::Other { kind, .. } => kind.clone(),
            g => g.kind().to_string(),
        }
    }

    pub fn from_geojson(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| LmdError::MalformedInput("geometry is not an object".to_string()))?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| LmdError::MalformedInput("geometry without a type".to_string()))?;
        let coords = obj.get("coordinates").unwrap_or(&Value::Null);

        let geometry = match kind {
            "Point" => {
                let [x, y] = parse_coord(coords)?;
                Geometry::Point(Point::new(x, y))
            }
            "LineString" => Geometry::LineString(line_string(&parse_ring(coords)?)),
            "Polygon" => Geometry::Polygon(parse_polygon(coords)?),
            "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
                as_array(coords)?
                    .iter()
                    .map(parse_polygon)
                    .collect::<Result<Vec<_>>>()?,
            )),
            other => Geometry::Other {
                kind: other.to_string(),
                raw: value.clone(),
            },
        };
        Ok(geometry)
    }

    pub fn to_geojson(&self) -> Value {
        fn ring(r: &LineString<f64>) -> Value {
            Value::Array(r.coords().map(|c| serde_json::json!([c.x, c.y])).collect())
        }
        fn polygon(p: &Polygon<f64>) -> Value {
            let mut rings = vec![ring(p.exterior())];
            rings.extend(p.interiors().iter().map(ring));
            Value::Array(rings)
        }
        match self {
            Geometry::Point(p) => {
                serde_json::json!({"type": "Point", "coordinates": [p.x(), p.y()]})
            }
            Geometry::LineString(r) => {
                serde_json::json!({"type": "LineString", "coordinates": ring(r)})
            }
            Geometry::Polygon(p) => {
                serde_json::json!({"type": "Polygon", "coordinates": polygon(p)})
            }
            Geometry::MultiPolygon(ps) => serde_json::json!({
                "type": "MultiPolygon",
                "coordinates": ps.iter().map(polygon).collect::<Vec<_>>(),
            }),
            Geometry::Other { raw, .. } => raw.clone(),
        }
    }
}

fn as_array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| {
            LmdError::MalformedInput(format!("expected coordinate array, got {}", value))
        })
}

fn parse_coord(value: &Value) -> Result<Coord> {
    let arr = as_array(value)?;
    // a third (z) component is allowed and ignored
    match (arr.first().and_then(Value::as_f64), arr.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Ok([x, y]),
        _ => Err(LmdError::MalformedInput(format!("invalid coordinate {}", value))),
    }
}

fn parse_ring(value: &Value) -> Result<Vec<Coord>> {
    as_array(value)?.iter().map(parse_coord).collect()
}

/// Rings are closed on construction if the file left them open.
fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = as_array(value)?
        .iter()
        .map(|r| parse_ring(r).map(|coords| line_string(&coords)))
        .collect::<Result<Vec<_>>>()?;
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| LmdError::MalformedInput("polygon without exterior ring".to_string()))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Normalized classification blob: `{name, color, ...}`.
///
/// QuPath writes this either as a JSON object or, after a round trip through
/// some tools, as a Python-literal string. Both collapse into this type at
/// load time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub name: Option<String>,
    pub color: Option<Value>,
    pub extra: Map<String, Value>,
}

impl Classification {
    pub fn new(name: &str, color: Value) -> Self {
        Self {
            name: Some(name.to_string()),
            color: Some(color),
            extra: Map::new(),
        }
    }

    /// `Ok(None)` for absent/null/blank blobs.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        let parsed;
        let obj = match value {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => {
                parsed = parse_literal(s.trim())?;
                match &parsed {
                    Value::Null => return Ok(None),
                    Value::Object(o) => o,
                    other => {
                        return Err(LmdError::MalformedInput(format!(
                            "classification literal is not a dictionary: {}",
                            other
                        )))
                    }
                }
            }
            Value::Object(o) => o,
            other => {
                return Err(LmdError::MalformedInput(format!(
                    "classification is neither a dictionary nor a string: {}",
                    other
                )))
            }
        };

        let mut extra = obj.clone();
        let name = match extra.remove("name") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let color = extra.remove("color").filter(|c| !c.is_null());
        Ok(Some(Self { name, color, extra }))
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(name) = &self.name {
            obj.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(color) = &self.color {
            obj.insert("color".to_string(), color.clone());
        }
        for (k, v) in &self.extra {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

/// One drawn region (or point) from the annotation file.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedGeometry {
    pub id: String,
    pub geometry: Geometry,
    /// `properties.name`, used to find calibration points.
    pub name: Option<String>,
    pub classification: Option<Classification>,
    /// Filled by QC from `classification.name`.
    pub classification_name: Option<String>,
    /// Set when classes are split into unique per-shape names.
    pub original_classification_name: Option<String>,
    /// Simplified coordinates, filled by QC.
    pub coords: Vec<Coord>,
    /// All other feature properties, kept for round-tripping.
    pub properties: Map<String, Value>,
}

impl AnnotatedGeometry {
    pub fn new(id: &str, geometry: Geometry) -> Self {
        Self {
            id: id.to_string(),
            geometry,
            name: None,
            classification: None,
            classification_name: None,
            original_classification_name: None,
            coords: Vec::new(),
            properties: Map::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_class(mut self, class_name: &str) -> Self {
        self.classification = Some(Classification::new(
            class_name,
            serde_json::json!([255, 0, 0]),
        ));
        self
    }

    fn from_feature(index: usize, feature: RawFeature) -> Result<Self> {
        let geometry = match &feature.geometry {
            Some(g) if !g.is_null() => Geometry::from_geojson(g)?,
            _ => {
                return Err(LmdError::MalformedInput(format!(
                    "feature {} has no geometry",
                    index
                )))
            }
        };
        let mut properties = feature.properties.unwrap_or_default();
        let name = match properties.remove("name") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let classification = match properties.remove("classification") {
            Some(v) => Classification::from_value(&v)?,
            None => None,
        };
        let id = match feature.id.or_else(|| properties.get("id").cloned()) {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("feature-{}", index),
        };
        properties.remove("id");

        Ok(Self {
            id,
            geometry,
            name,
            classification,
            classification_name: None,
            original_classification_name: None,
            coords: Vec::new(),
            properties,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Accepts a FeatureCollection, a bare feature array (QuPath's default
/// export), or a single Feature.
pub fn parse_geojson(text: &str) -> Result<Vec<AnnotatedGeometry>> {
    let value: Value = serde_json::from_str(text)?;
    let features: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => match obj.remove("features") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => {
                    return Err(LmdError::MalformedInput(
                        "'features' is not an array".to_string(),
                    ))
                }
            },
            Some("Feature") => vec![Value::Object(obj)],
            other => {
                return Err(LmdError::MalformedInput(format!(
                    "unsupported GeoJSON root type {:?}",
                    other
                )))
            }
        },
        _ => {
            return Err(LmdError::MalformedInput(
                "GeoJSON root must be an object or array".to_string(),
            ))
        }
    };

    features
        .into_iter()
        .enumerate()
        .map(|(i, f)| {
            let raw: RawFeature = serde_json::from_value(f)?;
            AnnotatedGeometry::from_feature(i, raw)
        })
        .collect()
}

pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<Vec<AnnotatedGeometry>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let features = parse_geojson(&text)?;
    log::info!(
        "GeoJSON file {:?} loaded with {} features",
        path.as_ref(),
        features.len()
    );
    Ok(features)
}

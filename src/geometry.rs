// Boundary geometry: GeoJSON ingestion and horizon clipping of rings against the near hemisphere.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::projection::Projector;
use crate::types::{GeoCoord, ScreenPoint};

/// A named area made of one or more closed rings of [lon, lat] positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Boundary {
    #[serde(default)]
    pub name: Option<String>,
    pub rings: Vec<Vec<[f64; 2]>>,
}

/// A clipped, projected piece of a boundary ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPath {
    /// Index of the source boundary.
    pub feature: usize,
    /// True when the whole ring is on the near side and the path closes on itself.
    pub closed: bool,
    pub points: Vec<ScreenPoint>,
}

/// A boundary document: GeoJSON, or an array of `Boundary` records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BoundaryDocument {
    Records(Vec<Boundary>),
    GeoJson(GeoJson),
}

/// Root GeoJSON object. Geometries other than polygons deserialize as `Unsupported`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection { features: Vec<GeoJsonFeature> },
    Feature(GeoJsonFeature),
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    #[serde(default)]
    geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    properties: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Unsupported,
}

/// `[lon, lat]`, optionally followed by an altitude.
type Position = Vec<f64>;

impl GeoJsonGeometry {
    fn into_rings(self) -> Vec<Vec<[f64; 2]>> {
        let polygons = match self {
            GeoJsonGeometry::Polygon { coordinates } => vec![coordinates],
            GeoJsonGeometry::MultiPolygon { coordinates } => coordinates,
            GeoJsonGeometry::Unsupported => return Vec::new(),
        };
        polygons
            .into_iter()
            .flatten()
            .map(|ring| {
                finite_ring(
                    ring.into_iter()
                        .filter_map(|position| Some([*position.first()?, *position.get(1)?])),
                )
            })
            .filter(|ring| ring.len() > 1)
            .collect()
    }
}

impl GeoJsonFeature {
    fn into_boundary(self) -> Option<Boundary> {
        let name = self
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        polygon_boundary(name, self.geometry?)
    }
}

fn polygon_boundary(name: Option<String>, geometry: GeoJsonGeometry) -> Option<Boundary> {
    let rings = geometry.into_rings();
    if rings.is_empty() {
        None
    } else {
        Some(Boundary { name, rings })
    }
}

/// Parse a GeoJSON `FeatureCollection`, a single `Feature`, a bare geometry, or an array of
/// `Boundary` records. Non-polygon geometries are skipped; positions that are not finite
/// pairs are dropped.
pub fn boundaries_from_json(json: &str) -> Result<Vec<Boundary>, EngineError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document: BoundaryDocument = serde_json::from_str(json).map_err(|e| {
        if e.is_data() {
            EngineError::InvalidData(format!("unrecognised boundary document: {}", e))
        } else {
            EngineError::from(e)
        }
    })?;

    let boundaries = match document {
        BoundaryDocument::Records(records) => records
            .into_iter()
            .map(|b| Boundary {
                name: b.name,
                rings: b
                    .rings
                    .into_iter()
                    .map(finite_ring)
                    .filter(|r| r.len() > 1)
                    .collect(),
            })
            .collect(),
        BoundaryDocument::GeoJson(GeoJson::FeatureCollection { features }) => features
            .into_iter()
            .filter_map(GeoJsonFeature::into_boundary)
            .collect(),
        BoundaryDocument::GeoJson(GeoJson::Feature(feature)) => {
            feature.into_boundary().into_iter().collect()
        }
        BoundaryDocument::GeoJson(GeoJson::Polygon { coordinates }) => {
            polygon_boundary(None, GeoJsonGeometry::Polygon { coordinates })
                .into_iter()
                .collect()
        }
        BoundaryDocument::GeoJson(GeoJson::MultiPolygon { coordinates }) => {
            polygon_boundary(None, GeoJsonGeometry::MultiPolygon { coordinates })
                .into_iter()
                .collect()
        }
        BoundaryDocument::GeoJson(GeoJson::Unsupported) => Vec::new(),
    };
    Ok(boundaries)
}

fn finite_ring(ring: impl IntoIterator<Item = [f64; 2]>) -> Vec<[f64; 2]> {
    ring.into_iter()
        .filter(|[lon, lat]| lon.is_finite() && lat.is_finite())
        .collect()
}

/// Project one ring, keeping only the near-side runs. A crossing of the horizon is placed
/// where the chord between two rotated vertices meets the view plane, pushed back onto the
/// sphere.
pub fn clip_ring(projector: &Projector, ring: &[[f64; 2]]) -> Vec<(bool, Vec<ScreenPoint>)> {
    let mut vertices: Vec<[f64; 3]> = ring
        .iter()
        .map(|&[lon, lat]| projector.rotate_vector(GeoCoord::new(lon, lat)))
        .collect();
    if vertices.len() > 1 && ring.first() == ring.last() {
        vertices.pop();
    }
    let n = vertices.len();
    if n == 0 {
        return Vec::new();
    }

    let visible = |v: &[f64; 3]| v[0] > 0.0;
    let start = match vertices.iter().position(|v| !visible(v)) {
        None => {
            let points: Vec<ScreenPoint> = vertices
                .iter()
                .filter_map(|&v| projector.project_vector(v))
                .collect();
            return vec![(true, points)];
        }
        Some(start) => start,
    };

    let mut runs = Vec::new();
    let mut current: Vec<ScreenPoint> = Vec::new();
    for k in 1..=n {
        let a = vertices[(start + k - 1) % n];
        let b = vertices[(start + k) % n];
        match (visible(&a), visible(&b)) {
            (true, true) => current.extend(projector.project_vector(b)),
            (false, true) => {
                current.extend(horizon_crossing(projector, a, b));
                current.extend(projector.project_vector(b));
            }
            (true, false) => {
                current.extend(horizon_crossing(projector, a, b));
                if current.len() > 1 {
                    runs.push((false, std::mem::take(&mut current)));
                } else {
                    current.clear();
                }
            }
            (false, false) => {}
        }
    }
    runs
}

fn horizon_crossing(projector: &Projector, a: [f64; 3], b: [f64; 3]) -> Option<ScreenPoint> {
    let t = a[0] / (a[0] - b[0]);
    let y = a[1] + (b[1] - a[1]) * t;
    let z = a[2] + (b[2] - a[2]) * t;
    let len = (y * y + z * z).sqrt();
    if len <= f64::EPSILON {
        return None;
    }
    projector.project_vector([0.0, y / len, z / len])
}

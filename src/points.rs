// Point ingestion and nominal radius. Rows with unusable coordinates are dropped here, never later.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{PointSizeSettings, SizeType};
use crate::types::GeoCoord;

/// One row from the data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub size_value: Option<f64>,
    #[serde(default)]
    pub color_value: Option<f64>,
}

/// An ingested location. Immutable after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    pub size_value: Option<f64>,
    pub color_value: Option<f64>,
}

impl GeoPoint {
    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.longitude, self.latitude)
    }
}

/// Keep rows with finite coordinates; non-finite measures become absent.
pub fn ingest(rows: Vec<DataRow>) -> Vec<GeoPoint> {
    let total = rows.len();
    let points: Vec<GeoPoint> = rows
        .into_iter()
        .filter(|row| row.latitude.is_finite() && row.longitude.is_finite())
        .map(|row| GeoPoint {
            latitude: row.latitude,
            longitude: row.longitude,
            label: row.label,
            size_value: row.size_value.filter(|v| v.is_finite()),
            color_value: row.color_value.filter(|v| v.is_finite()),
        })
        .collect();

    let dropped = total - points.len();
    if dropped > 0 {
        warn!("dropped {} of {} rows with non-finite coordinates", dropped, total);
    }
    points
}

/// Nominal point radius, fixed or linearly scaled over the size-measure extent.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeScale {
    settings: PointSizeSettings,
    extent: Option<(f64, f64)>,
}

impl SizeScale {
    pub fn new(settings: PointSizeSettings, points: &[GeoPoint]) -> Self {
        let extent = points
            .iter()
            .filter_map(|p| p.size_value)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            });
        SizeScale { settings, extent }
    }

    pub fn radius(&self, point: &GeoPoint) -> f64 {
        match (self.settings.size_type, point.size_value, self.extent) {
            (SizeType::Measure, Some(value), Some((lo, hi))) => {
                let (r0, r1) = (self.settings.min_point_size, self.settings.max_point_size);
                if hi - lo <= f64::EPSILON {
                    (r0 + r1) / 2.0
                } else {
                    r0 + (value - lo) / (hi - lo) * (r1 - r0)
                }
            }
            _ => self.settings.point_size,
        }
    }
}

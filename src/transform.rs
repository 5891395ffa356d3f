// The single authoritative view transform. Every write goes through the three verbs below,
// each of which re-establishes the invariants: lat in [-90, 90], lon in [-180, 180),
// scale in [min_scale, max_scale].

use serde::{Deserialize, Serialize};

use crate::config::ZoomConfig;
use crate::types::Rotation;

/// Absolute scale bounds in pixels, derived from the base radius and the zoom factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBounds {
    pub base_radius: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub initial_scale: f64,
    pub speed_factor: f64,
}

impl ZoomBounds {
    pub fn new(zoom: &ZoomConfig, base_radius: f64) -> Self {
        ZoomBounds {
            base_radius,
            min_scale: base_radius * zoom.min_zoom_scale,
            max_scale: base_radius * zoom.max_zoom_scale,
            initial_scale: base_radius * zoom.clamped_initial_zoom(),
            speed_factor: zoom.zoom_speed,
        }
    }

    pub fn clamp(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.initial_scale;
        }
        scale.clamp(self.min_scale, self.max_scale)
    }

    pub fn is_finite(&self) -> bool {
        self.min_scale.is_finite() && self.max_scale.is_finite() && self.initial_scale.is_finite()
    }

    /// `round(scale / base_radius * 100)`.
    pub fn percentage(&self, scale: f64) -> i64 {
        if self.base_radius > 0.0 {
            (scale / self.base_radius * 100.0).round() as i64
        } else {
            0
        }
    }
}

/// Rotation and scale of the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    rotation: Rotation,
    scale: f64,
    bounds: ZoomBounds,
}

impl TransformState {
    pub fn new(rotation: Rotation, bounds: ZoomBounds) -> Self {
        let mut state = TransformState {
            rotation: Rotation::default(),
            scale: bounds.initial_scale,
            bounds,
        };
        state.set_rotation(rotation);
        state.set_scale(bounds.initial_scale);
        state
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn bounds(&self) -> ZoomBounds {
        self.bounds
    }

    /// Relative rotation. Latitude is clamped, longitude wrapped.
    pub fn rotate_by(&mut self, delta_lon: f64, delta_lat: f64) {
        let target = Rotation::new(
            self.rotation.lon + delta_lon,
            self.rotation.lat + delta_lat,
            self.rotation.roll,
        );
        self.set_rotation(target);
    }

    /// Absolute scale, clamped to the zoom bounds.
    pub fn set_scale(&mut self, value: f64) {
        self.scale = self.bounds.clamp(value);
    }

    /// Absolute rotation. Non-finite components keep their previous value.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        if rotation.lon.is_finite() {
            self.rotation.lon = wrap_degrees(rotation.lon);
        }
        if rotation.lat.is_finite() {
            self.rotation.lat = rotation.lat.clamp(-90.0, 90.0);
        }
        if rotation.roll.is_finite() {
            self.rotation.roll = wrap_degrees(rotation.roll);
        }
    }

    /// Swap in new bounds (viewport resize), keeping the zoom level relative to the base radius.
    pub fn rebase(&mut self, bounds: ZoomBounds) {
        let relative = if self.bounds.base_radius > 0.0 {
            self.scale / self.bounds.base_radius
        } else {
            bounds.initial_scale / bounds.base_radius
        };
        self.bounds = bounds;
        self.set_scale(relative * bounds.base_radius);
    }

    pub fn zoom_percentage(&self) -> i64 {
        self.bounds.percentage(self.scale)
    }
}

/// Wrap into [-180, 180).
pub fn wrap_degrees(value: f64) -> f64 {
    let wrapped = (value + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 180.0 {
        -180.0
    } else {
        wrapped
    }
}

/// Signed shortest angular difference `to - from`, in [-180, 180).
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    wrap_degrees(to - from)
}

// Orthographic projection of the rotated sphere, its inverse, and the per-point culling test.
// Rotation order: longitude first, then latitude/roll about the rotated axes.

use crate::types::{GeoCoord, Rotation, ScreenPoint};

const RADIANS: f64 = std::f64::consts::PI / 180.0;
const DEGREES: f64 = 180.0 / std::f64::consts::PI;

/// Tolerance on the disk edge for `unproject`.
const DISK_EPSILON: f64 = 1e-9;

/// Forward and inverse orthographic transform for one rotation/scale/center.
/// Cheap to build; construct one per frame and reuse it for every point.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    delta_lambda: f64,
    cos_phi: f64,
    sin_phi: f64,
    cos_gamma: f64,
    sin_gamma: f64,
    scale: f64,
    center: ScreenPoint,
}

impl Projector {
    pub fn new(rotation: Rotation, scale: f64, center: ScreenPoint) -> Self {
        let delta_phi = rotation.lat * RADIANS;
        let delta_gamma = rotation.roll * RADIANS;
        Projector {
            delta_lambda: (rotation.lon % 360.0) * RADIANS,
            cos_phi: delta_phi.cos(),
            sin_phi: delta_phi.sin(),
            cos_gamma: delta_gamma.cos(),
            sin_gamma: delta_gamma.sin(),
            scale,
            center,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn center(&self) -> ScreenPoint {
        self.center
    }

    /// Rotated unit vector of `coord`: x toward the viewer, y right, z up.
    pub fn rotate_vector(&self, coord: GeoCoord) -> [f64; 3] {
        let (lambda, phi) = self.rotate_radians(coord.lon * RADIANS, coord.lat * RADIANS);
        let cos_phi = phi.cos();
        [cos_phi * lambda.cos(), cos_phi * lambda.sin(), phi.sin()]
    }

    /// Exact depth toward the viewer; positive on the near hemisphere.
    pub fn depth(&self, coord: GeoCoord) -> f64 {
        self.rotate_vector(coord)[0]
    }

    /// Screen position of `coord`. Far-side points still project (onto the disk);
    /// `None` only when the result is not a finite position.
    pub fn project(&self, coord: GeoCoord) -> Option<ScreenPoint> {
        self.project_vector(self.rotate_vector(coord))
    }

    /// Screen position of an already rotated unit vector.
    pub fn project_vector(&self, v: [f64; 3]) -> Option<ScreenPoint> {
        let point = ScreenPoint::new(
            self.center.x + self.scale * v[1],
            self.center.y - self.scale * v[2],
        );
        if point.is_finite() && self.scale.is_finite() {
            Some(point)
        } else {
            None
        }
    }

    /// Geographic position under a screen point on the near hemisphere,
    /// or `None` outside the globe disk.
    pub fn unproject(&self, point: ScreenPoint) -> Option<GeoCoord> {
        if !(self.scale.is_finite() && self.scale > 0.0) || !point.is_finite() {
            return None;
        }
        let x = (point.x - self.center.x) / self.scale;
        let y = (self.center.y - point.y) / self.scale;
        let rho_sq = x * x + y * y;
        if rho_sq > 1.0 + DISK_EPSILON {
            return None;
        }
        let z = (1.0 - rho_sq).max(0.0).sqrt();
        let lambda = x.atan2(z);
        let phi = y.clamp(-1.0, 1.0).asin();
        let (lon, lat) = self.invert_radians(lambda, phi);
        let coord = GeoCoord::new(lon * DEGREES, lat * DEGREES);
        if coord.lon.is_finite() && coord.lat.is_finite() {
            Some(coord)
        } else {
            None
        }
    }

    /// True if `point` lies on the projected globe disk.
    pub fn disk_contains(&self, point: ScreenPoint) -> bool {
        point.distance_to(&self.center) <= self.scale
    }

    fn rotate_radians(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let lambda = wrap_radians(lambda + self.delta_lambda);

        let cos_phi = phi.cos();
        let x = lambda.cos() * cos_phi;
        let y = lambda.sin() * cos_phi;
        let z = phi.sin();
        let k = z * self.cos_phi + x * self.sin_phi;
        (
            (y * self.cos_gamma - k * self.sin_gamma).atan2(x * self.cos_phi - z * self.sin_phi),
            (k * self.cos_gamma + y * self.sin_gamma).clamp(-1.0, 1.0).asin(),
        )
    }

    fn invert_radians(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let cos_phi = phi.cos();
        let x = lambda.cos() * cos_phi;
        let y = lambda.sin() * cos_phi;
        let z = phi.sin();
        let k = z * self.cos_gamma - y * self.sin_gamma;
        let lambda = (y * self.cos_gamma + z * self.sin_gamma).atan2(x * self.cos_phi + k * self.sin_phi);
        let phi = (k * self.cos_phi - x * self.sin_phi).clamp(-1.0, 1.0).asin();
        (wrap_radians(lambda - self.delta_lambda), phi)
    }
}

fn wrap_radians(lambda: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    if lambda.abs() > PI {
        lambda - (lambda / TAU).round() * TAU
    } else {
        lambda
    }
}

/// Project one point under `rotation`/`scale`, centred at `center`.
pub fn project(
    coord: GeoCoord,
    rotation: Rotation,
    scale: f64,
    center: ScreenPoint,
) -> Option<ScreenPoint> {
    Projector::new(rotation, scale, center).project(coord)
}

/// Inverse of [`project`] for points on the globe disk.
pub fn unproject(
    point: ScreenPoint,
    rotation: Rotation,
    scale: f64,
    center: ScreenPoint,
) -> Option<GeoCoord> {
    Projector::new(rotation, scale, center).unproject(point)
}

/// Back-face test used for point markers:
/// `cos(lat + rotation.lat) * cos(lon + rotation.lon) > 0`.
/// Exact when the rotation has no latitude or roll component.
pub fn is_front_facing(coord: GeoCoord, rotation: Rotation) -> bool {
    let longitude = (coord.lon + rotation.lon) * RADIANS;
    let latitude = (coord.lat + rotation.lat) * RADIANS;
    latitude.cos() * longitude.cos() > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CENTER: ScreenPoint = ScreenPoint { x: 400.0, y: 300.0 };

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    /// Smallest difference between two longitudes.
    fn lon_diff(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn origin_projects_to_center_without_rotation() {
        let p = project(GeoCoord::new(0.0, 0.0), Rotation::default(), 200.0, CENTER).unwrap();
        assert!(close(p.x, 400.0, 1e-9) && close(p.y, 300.0, 1e-9));
    }

    #[test]
    fn screen_axes_follow_lon_and_lat() {
        let projector = Projector::new(Rotation::default(), 200.0, CENTER);
        let east = projector.project(GeoCoord::new(90.0, 0.0)).unwrap();
        assert!(close(east.x, 600.0, 1e-9) && close(east.y, 300.0, 1e-9));
        let north = projector.project(GeoCoord::new(0.0, 90.0)).unwrap();
        assert!(close(north.x, 400.0, 1e-9) && close(north.y, 100.0, 1e-9));
    }

    #[test]
    fn latitude_rotation_brings_parallel_to_center() {
        // Rotating by -25 latitude centres the 25th parallel.
        let rotation = Rotation::new(0.0, -25.0, 0.0);
        let p = project(GeoCoord::new(0.0, 25.0), rotation, 200.0, CENTER).unwrap();
        assert!(close(p.x, 400.0, 1e-9) && close(p.y, 300.0, 1e-9));
    }

    #[test]
    fn longitude_rotation_brings_meridian_to_center() {
        let rotation = Rotation::new(-120.0, 0.0, 0.0);
        let projector = Projector::new(rotation, 200.0, CENTER);
        let p = projector.project(GeoCoord::new(120.0, 0.0)).unwrap();
        assert!(close(p.x, 400.0, 1e-9));
        assert!(projector.depth(GeoCoord::new(120.0, 0.0)) > 0.999);
    }

    #[test]
    fn degenerate_scale_is_a_miss() {
        let coord = GeoCoord::new(10.0, 10.0);
        assert!(project(coord, Rotation::default(), f64::NAN, CENTER).is_none());
        assert!(project(coord, Rotation::default(), f64::INFINITY, CENTER).is_none());
        assert!(unproject(CENTER, Rotation::default(), 0.0, CENTER).is_none());
    }

    #[test]
    fn unproject_outside_disk_is_none() {
        let outside = ScreenPoint::new(CENTER.x + 201.0, CENTER.y);
        assert!(unproject(outside, Rotation::default(), 200.0, CENTER).is_none());
        let projector = Projector::new(Rotation::default(), 200.0, CENTER);
        assert!(!projector.disk_contains(outside));
        assert!(projector.disk_contains(ScreenPoint::new(CENTER.x + 200.0, CENTER.y)));
    }

    #[test]
    fn front_facing_example_scenarios() {
        let coord = GeoCoord::new(10.0, 0.0);
        assert!(is_front_facing(coord, Rotation::new(0.0, 0.0, 0.0)));
        assert!(!is_front_facing(coord, Rotation::new(180.0, 0.0, 0.0)));
    }

    #[test]
    fn front_facing_boundaries_and_antipodes() {
        // Tilting by -25 brings the north pole forward and hides the south pole.
        let tilt = Rotation::new(0.0, -25.0, 0.0);
        assert!(is_front_facing(GeoCoord::new(0.0, 90.0), tilt));
        assert!(!is_front_facing(GeoCoord::new(0.0, -90.0), tilt));
        // A point and its antipode are never both in front. The grid avoids the +-90
        // meridians, where the product is only a rounding error away from zero.
        for lon in (-172..180).step_by(15) {
            for lat in (-75..=75).step_by(15) {
                let a = GeoCoord::new(lon as f64, lat as f64);
                let b = GeoCoord::new(lon as f64 + 180.0, -lat as f64);
                let rotation = Rotation::new(0.0, 0.0, 0.0);
                assert!(!(is_front_facing(a, rotation) && is_front_facing(b, rotation)));
            }
        }
    }

    #[test]
    fn culling_matches_exact_depth_without_tilt() {
        for lon in (-180..180).step_by(7) {
            for lat in (-89..=89).step_by(7) {
                let coord = GeoCoord::new(lon as f64, lat as f64);
                let rotation = Rotation::new(33.0, 0.0, 0.0);
                let depth = Projector::new(rotation, 1.0, CENTER).depth(coord);
                if depth.abs() > 1e-9 {
                    assert_eq!(is_front_facing(coord, rotation), depth > 0.0);
                }
            }
        }
    }

    fn rotation_strategy() -> impl Strategy<Value = Rotation> {
        (-540.0f64..540.0, -90.0f64..=90.0, -180.0f64..180.0)
            .prop_map(|(lon, lat, roll)| Rotation::new(lon, lat, roll))
    }

    fn coord_strategy() -> impl Strategy<Value = GeoCoord> {
        (-180.0f64..=180.0, -90.0f64..=90.0).prop_map(|(lon, lat)| GeoCoord::new(lon, lat))
    }

    proptest! {
        /// Forward then inverse recovers the coordinate for points on the near side.
        #[test]
        fn project_unproject_round_trip(
            coord in coord_strategy(),
            rotation in rotation_strategy(),
            scale in 1.0f64..5000.0,
        ) {
            let projector = Projector::new(rotation, scale, CENTER);
            // Stay off the horizon where the inverse is ill-conditioned.
            prop_assume!(projector.depth(coord) > 0.05);
            // Longitude is meaningless at the poles.
            prop_assume!(coord.lat.abs() < 89.9);

            let screen = projector.project(coord).unwrap();
            let back = projector.unproject(screen).unwrap();
            prop_assert!(close(back.lat, coord.lat, 1e-6), "lat {} -> {}", coord.lat, back.lat);
            prop_assert!(lon_diff(back.lon, coord.lon) < 1e-6, "lon {} -> {}", coord.lon, back.lon);
        }

        /// Every coordinate lands on or inside the globe disk.
        #[test]
        fn projection_stays_on_disk(
            coord in coord_strategy(),
            rotation in rotation_strategy(),
            scale in 1.0f64..5000.0,
        ) {
            let projector = Projector::new(rotation, scale, CENTER);
            let screen = projector.project(coord).unwrap();
            prop_assert!(screen.distance_to(&CENTER) <= scale * (1.0 + 1e-9));
        }

        /// The culling test is exactly the cosine product.
        #[test]
        fn culling_agrees_with_cosine_product(
            coord in prop_oneof![
                coord_strategy(),
                (-180.0f64..=180.0).prop_map(|lon| GeoCoord::new(lon, 90.0)),
                (-180.0f64..=180.0).prop_map(|lon| GeoCoord::new(lon, -90.0)),
            ],
            rotation in rotation_strategy(),
        ) {
            let direct = ((coord.lat + rotation.lat) * RADIANS).cos()
                * ((coord.lon + rotation.lon) * RADIANS).cos()
                > 0.0;
            prop_assert_eq!(is_front_facing(coord, rotation), direct);

            let antipode = GeoCoord::new(coord.lon + 180.0, coord.lat);
            let direct_antipode = ((antipode.lat + rotation.lat) * RADIANS).cos()
                * ((antipode.lon + rotation.lon) * RADIANS).cos()
                > 0.0;
            prop_assert_eq!(is_front_facing(antipode, rotation), direct_antipode);
        }
    }
}

// RenderSync: derive every screen attribute from the current transform. Read-only over engine
// state; rendering twice without a mutation in between yields the same frame.

use serde::{Deserialize, Serialize};

use crate::geometry::{clip_ring, Boundary, ProjectedPath};
use crate::input::InputCoordinator;
use crate::points::{GeoPoint, SizeScale};
use crate::projection::is_front_facing;
use crate::tooltip::{TooltipController, TooltipState};
use crate::types::{InteractionMode, Rotation, Timestamp, ViewportSize};

/// Globe outline / ocean disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobeDisk {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

/// Screen attributes of one point marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSprite {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub visible: bool,
    pub radius: f64,
    pub fill: String,
}

/// Everything the host needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub disk: GlobeDisk,
    pub rotation: Rotation,
    pub scale: f64,
    pub zoom_percentage: i64,
    pub mode: InteractionMode,
    pub paths: Vec<ProjectedPath>,
    pub points: Vec<PointSprite>,
    pub tooltip: TooltipState,
}

impl RenderFrame {
    /// Flat `[x, y, visible, radius]` per point for typed-array transfer.
    pub fn point_buffer(&self) -> Vec<f64> {
        let mut buffer = Vec::with_capacity(self.points.len() * 4);
        for sprite in &self.points {
            buffer.extend_from_slice(&[
                sprite.x,
                sprite.y,
                if sprite.visible { 1.0 } else { 0.0 },
                sprite.radius,
            ]);
        }
        buffer
    }
}

/// Re-projects boundaries and points from the coordinator's transform.
#[derive(Debug, Default)]
pub struct RenderSync {
    boundaries: Vec<Boundary>,
    nominal_radii: Vec<f64>,
    point_fill: String,
}

impl RenderSync {
    /// Nominal radii are computed once; only hover growth changes them afterwards.
    pub fn new(
        boundaries: Vec<Boundary>,
        points: &[GeoPoint],
        sizes: &SizeScale,
        point_fill: String,
    ) -> Self {
        RenderSync {
            boundaries,
            nominal_radii: points.iter().map(|p| sizes.radius(p)).collect(),
            point_fill,
        }
    }

    pub fn boundary_count(&self) -> usize {
        self.boundaries.len()
    }

    /// Build the frame, or `None` while the viewport is too small to draw anything.
    pub fn render(
        &self,
        viewport: ViewportSize,
        coordinator: &InputCoordinator,
        points: &[GeoPoint],
        tooltip: &TooltipController,
        now: Timestamp,
    ) -> Option<RenderFrame> {
        let transform = coordinator.transform();
        if viewport.is_degenerate() || !transform.scale().is_finite() {
            return None;
        }
        let projector = coordinator.projector();
        let rotation = transform.rotation();
        let center = projector.center();

        let mut paths = Vec::new();
        for (feature, boundary) in self.boundaries.iter().enumerate() {
            for ring in &boundary.rings {
                for (closed, points) in clip_ring(&projector, ring) {
                    if points.len() > 1 {
                        paths.push(ProjectedPath {
                            feature,
                            closed,
                            points,
                        });
                    }
                }
            }
        }

        let sprites = points
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let coord = point.coord();
                let nominal = self.nominal_radii.get(index).copied().unwrap_or(0.0);
                let radius = nominal * tooltip.radius_multiplier(index, now);
                match projector.project(coord) {
                    Some(screen) => PointSprite {
                        index,
                        x: screen.x,
                        y: screen.y,
                        visible: is_front_facing(coord, rotation),
                        radius,
                        fill: self.point_fill.clone(),
                    },
                    None => PointSprite {
                        index,
                        x: 0.0,
                        y: 0.0,
                        visible: false,
                        radius,
                        fill: self.point_fill.clone(),
                    },
                }
            })
            .collect();

        Some(RenderFrame {
            disk: GlobeDisk {
                cx: center.x,
                cy: center.y,
                r: transform.scale(),
            },
            rotation,
            scale: transform.scale(),
            zoom_percentage: transform.zoom_percentage(),
            mode: coordinator.mode(),
            paths,
            points: sprites,
            tooltip: tooltip.state(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GlobeConfig, PointSizeSettings, TooltipSettings};
    use crate::input::CoordinatorSettings;
    use crate::points::{ingest, DataRow};
    use crate::transform::{TransformState, ZoomBounds};
    use crate::types::ScreenPoint;

    fn fixture(rotation: Rotation) -> (ViewportSize, InputCoordinator, Vec<GeoPoint>, TooltipController) {
        let config = GlobeConfig::default();
        let viewport = ViewportSize::new(500.0, 500.0);
        let bounds = ZoomBounds::new(&config.zoom, viewport.base_radius());
        let settings = CoordinatorSettings {
            rotation_speed: 0.0,
            initial_rotation: rotation,
            interaction: config.interaction,
        };
        let coordinator = InputCoordinator::new(
            TransformState::new(rotation, bounds),
            settings,
            viewport.center(),
            Timestamp::default(),
        );
        let points = ingest(vec![
            DataRow {
                latitude: 0.0,
                longitude: 10.0,
                label: "near".to_string(),
                size_value: None,
                color_value: None,
            },
            DataRow {
                latitude: 0.0,
                longitude: -170.0,
                label: "far".to_string(),
                size_value: None,
                color_value: None,
            },
        ]);
        let tooltip = TooltipController::new(TooltipSettings::default(), &config.interaction);
        (viewport, coordinator, points, tooltip)
    }

    fn sync(points: &[GeoPoint]) -> RenderSync {
        let boundary = Boundary {
            name: Some("box".to_string()),
            rings: vec![vec![[-20.0, -20.0], [20.0, -20.0], [20.0, 20.0], [-20.0, 20.0], [-20.0, -20.0]]],
        };
        RenderSync::new(
            vec![boundary],
            points,
            &SizeScale::new(PointSizeSettings::default(), points),
            "#008936".to_string(),
        )
    }

    #[test]
    fn points_are_culled_and_sized() {
        let (viewport, coordinator, points, tooltip) = fixture(Rotation::default());
        let frame = sync(&points)
            .render(viewport, &coordinator, &points, &tooltip, Timestamp::default())
            .unwrap();
        assert!(frame.points[0].visible);
        assert!(!frame.points[1].visible);
        assert_eq!(frame.points[0].radius, 3.0);
        assert_eq!(frame.points[0].fill, "#008936");
        assert_eq!(frame.zoom_percentage, 125);
        assert_eq!(frame.disk.r, 250.0);
        assert_eq!(frame.paths.len(), 1);
        assert!(frame.paths[0].closed);
    }

    #[test]
    fn rendering_is_idempotent() {
        let (viewport, coordinator, points, tooltip) = fixture(Rotation::new(35.0, -25.0, 0.0));
        let sync = sync(&points);
        let a = sync.render(viewport, &coordinator, &points, &tooltip, Timestamp::default());
        let b = sync.render(viewport, &coordinator, &points, &tooltip, Timestamp::default());
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_viewport_skips_render() {
        let (_, coordinator, points, tooltip) = fixture(Rotation::default());
        let frame = sync(&points).render(
            ViewportSize::new(0.0, 400.0),
            &coordinator,
            &points,
            &tooltip,
            Timestamp::default(),
        );
        assert!(frame.is_none());
    }

    #[test]
    fn hovered_point_grows() {
        let (viewport, coordinator, points, mut tooltip) = fixture(Rotation::default());
        let start = Timestamp::default();
        tooltip.enter(0, &points[0], ScreenPoint::new(1.0, 1.0), start);
        let frame = sync(&points)
            .render(viewport, &coordinator, &points, &tooltip, Timestamp::from_micros(500_000))
            .unwrap();
        assert_eq!(frame.points[0].radius, 4.5);
        assert!(frame.tooltip.visible);
        assert_eq!(frame.point_buffer().len(), 8);
    }
}

// The explicit engine instance. Owns every piece of per-globe state; nothing is process-wide.
// Input methods mutate through the InputCoordinator and mark the frame dirty; `frame` advances
// animations and runs RenderSync at most once.

use log::{info, warn};

use crate::config::{GlobeConfig, Palette, TooltipStyle};
use crate::error::EngineError;
use crate::geometry::{boundaries_from_json, Boundary};
use crate::input::{CoordinatorSettings, InputCoordinator, ZoomDirection};
use crate::points::{ingest, DataRow, GeoPoint, SizeScale};
use crate::render::{RenderFrame, RenderSync};
use crate::scheduler::TaskHandle;
use crate::tooltip::TooltipController;
use crate::transform::{TransformState, ZoomBounds};
use crate::types::{
    EventBatch, EventType, InteractionMode, Rotation, ScreenPoint, Timestamp, ViewportSize,
};

/// One globe.
#[derive(Debug)]
pub struct GlobeEngine {
    viewport: ViewportSize,
    config: GlobeConfig,
    palette: Palette,
    tooltip_style: TooltipStyle,
    points: Vec<GeoPoint>,
    coordinator: InputCoordinator,
    tooltip: TooltipController,
    sync: RenderSync,
    last_frame: Option<RenderFrame>,
    dirty: bool,
    hover_animating: bool,
    destroyed: bool,
}

impl GlobeEngine {
    /// Build the transform from config defaults and start auto-rotation if the speed is positive.
    /// Fails fast on configuration that would yield a non-finite scale bound.
    pub fn initialize(
        viewport: ViewportSize,
        rows: Vec<DataRow>,
        boundaries: Vec<Boundary>,
        config: GlobeConfig,
        now: Timestamp,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let bounds = zoom_bounds(&config, viewport);
        if !bounds.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "zoom bounds are not finite: {:?}",
                bounds
            )));
        }
        if viewport.is_degenerate() {
            warn!(
                "initialized with degenerate viewport {}x{}; rendering suspended",
                viewport.width, viewport.height
            );
        }

        let points = ingest(rows);
        let palette = config.colors.resolve();
        let sizes = SizeScale::new(config.point_size, &points);
        let sync = RenderSync::new(boundaries, &points, &sizes, palette.point.clone());

        let initial_rotation = Rotation::from_array(config.initial_rotation);
        let coordinator = InputCoordinator::new(
            TransformState::new(initial_rotation, bounds),
            CoordinatorSettings {
                rotation_speed: config.rotation_speed,
                initial_rotation,
                interaction: config.interaction,
            },
            viewport.center(),
            now,
        );
        let tooltip = TooltipController::new(config.tooltip.clone(), &config.interaction);

        info!(
            "globe initialized: {} points, {} boundaries, scale {:.1}, mode {}",
            points.len(),
            sync.boundary_count(),
            coordinator.transform().scale(),
            coordinator.mode().as_str()
        );

        Ok(GlobeEngine {
            viewport,
            tooltip_style: config.tooltip.style(),
            config,
            palette,
            points,
            coordinator,
            tooltip,
            sync,
            last_frame: None,
            dirty: true,
            hover_animating: false,
            destroyed: false,
        })
    }

    /// `initialize` from the JSON documents the host hands over. Empty row or boundary input
    /// is treated as an empty set.
    pub fn from_json(
        config_json: &str,
        viewport: ViewportSize,
        rows_json: &str,
        boundaries_json: &str,
        now: Timestamp,
    ) -> Result<Self, EngineError> {
        let config = if config_json.trim().is_empty() {
            GlobeConfig::default()
        } else {
            GlobeConfig::from_json(config_json)?
        };
        let rows: Vec<DataRow> = if rows_json.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(rows_json)?
        };
        let boundaries = boundaries_from_json(boundaries_json)?;
        Self::initialize(viewport, rows, boundaries, config, now)
    }

    /// New container size: recompute the base radius and re-centre.
    pub fn resize(&mut self, viewport: ViewportSize, now: Timestamp) {
        if self.destroyed {
            return;
        }
        self.viewport = viewport;
        self.dirty = true;
        if viewport.is_degenerate() {
            warn!(
                "viewport {}x{} is degenerate; rendering suspended",
                viewport.width, viewport.height
            );
            return;
        }
        let bounds = zoom_bounds(&self.config, viewport);
        self.coordinator.resize(bounds, viewport.center(), now);
        info!(
            "resized to {}x{}: base radius {:.1}, scale {:.1}",
            viewport.width,
            viewport.height,
            bounds.base_radius,
            self.coordinator.transform().scale()
        );
    }

    /// Cancel all scheduled work and release per-instance state. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.coordinator.shutdown();
        self.tooltip.clear();
        self.points = Vec::new();
        self.sync = RenderSync::default();
        self.last_frame = None;
        self.dirty = false;
        self.hover_animating = false;
        self.destroyed = true;
        info!("globe destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn pointer_down(&mut self, position: ScreenPoint, button: u8) -> bool {
        !self.destroyed && self.mark(|engine| engine.coordinator.pointer_down(position, button))
    }

    pub fn pointer_move(&mut self, position: ScreenPoint) -> bool {
        !self.destroyed && self.mark(|engine| engine.coordinator.pointer_move(position))
    }

    pub fn pointer_up(&mut self, now: Timestamp) -> bool {
        !self.destroyed && self.mark(|engine| engine.coordinator.pointer_up(now))
    }

    pub fn wheel(&mut self, delta_y: f64, now: Timestamp) -> bool {
        !self.destroyed && self.mark(|engine| engine.coordinator.wheel(delta_y, now))
    }

    pub fn zoom_in(&mut self, now: Timestamp) -> Option<TaskHandle> {
        self.zoom(ZoomDirection::In, now)
    }

    pub fn zoom_out(&mut self, now: Timestamp) -> Option<TaskHandle> {
        self.zoom(ZoomDirection::Out, now)
    }

    fn zoom(&mut self, direction: ZoomDirection, now: Timestamp) -> Option<TaskHandle> {
        if self.destroyed {
            return None;
        }
        self.dirty = true;
        Some(self.coordinator.zoom_button(direction, now))
    }

    pub fn reset_view(&mut self, now: Timestamp) -> Option<TaskHandle> {
        if self.destroyed {
            return None;
        }
        self.dirty = true;
        Some(self.coordinator.reset_view(now))
    }

    /// Pointer entered the marker of point `index`. Unknown indices are ignored.
    pub fn point_enter(&mut self, index: usize, pointer: ScreenPoint, now: Timestamp) -> bool {
        if self.destroyed || !pointer.is_finite() {
            return false;
        }
        match self.points.get(index) {
            Some(point) => {
                self.tooltip.enter(index, point, pointer, now);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn point_leave(&mut self, index: usize, now: Timestamp) -> bool {
        if self.destroyed || index >= self.points.len() {
            return false;
        }
        self.tooltip.leave(index, now);
        self.dirty = true;
        true
    }

    /// Apply every queued event in order, then produce at most one frame for `now`.
    pub fn dispatch(&mut self, batch: &EventBatch, now: Timestamp) -> Option<&RenderFrame> {
        for event in &batch.events {
            let at = event.timestamp;
            match &event.event_type {
                EventType::PointerDown { position, button } => {
                    self.pointer_down(*position, *button);
                }
                EventType::PointerMove { position } => {
                    self.pointer_move(*position);
                }
                EventType::PointerUp { .. } => {
                    self.pointer_up(at);
                }
                EventType::Wheel { delta_y } => {
                    self.wheel(*delta_y, at);
                }
                EventType::ZoomIn => {
                    self.zoom_in(at);
                }
                EventType::ZoomOut => {
                    self.zoom_out(at);
                }
                EventType::ResetView => {
                    self.reset_view(at);
                }
                EventType::PointEnter { index, position } => {
                    self.point_enter(*index, *position, at);
                }
                EventType::PointLeave { index } => {
                    self.point_leave(*index, at);
                }
                EventType::Resize { width, height } => {
                    self.resize(ViewportSize::new(*width, *height), at);
                }
            }
        }
        self.frame(now)
    }

    /// Per-animation-frame step. Returns the new frame if anything changed and the viewport
    /// can be drawn, otherwise `None`.
    pub fn frame(&mut self, now: Timestamp) -> Option<&RenderFrame> {
        if self.destroyed {
            return None;
        }
        if self.coordinator.advance(now) {
            self.dirty = true;
        }
        // One extra render after the last hover transition so its end value is drawn.
        let animating = self.tooltip.is_animating(now);
        if animating || self.hover_animating {
            self.dirty = true;
        }
        self.hover_animating = animating;
        self.tooltip.prune(now);

        if !self.dirty {
            return None;
        }
        let frame = self.render(now)?;
        self.dirty = false;
        self.last_frame = Some(frame);
        self.last_frame.as_ref()
    }

    /// Describe the scene at `now` without touching any state.
    pub fn render(&self, now: Timestamp) -> Option<RenderFrame> {
        if self.destroyed {
            return None;
        }
        self.sync
            .render(self.viewport, &self.coordinator, &self.points, &self.tooltip, now)
    }

    pub fn last_frame(&self) -> Option<&RenderFrame> {
        self.last_frame.as_ref()
    }

    pub fn current_zoom_percentage(&self) -> i64 {
        if self.destroyed {
            return 0;
        }
        self.coordinator.transform().zoom_percentage()
    }

    pub fn mode(&self) -> InteractionMode {
        self.coordinator.mode()
    }

    pub fn transform(&self) -> &TransformState {
        self.coordinator.transform()
    }

    pub fn coordinator(&self) -> &InputCoordinator {
        &self.coordinator
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn tooltip_style(&self) -> &TooltipStyle {
        &self.tooltip_style
    }

    fn mark(&mut self, mutation: impl FnOnce(&mut Self) -> bool) -> bool {
        let changed = mutation(self);
        if changed {
            self.dirty = true;
        }
        changed
    }
}

fn zoom_bounds(config: &GlobeConfig, viewport: ViewportSize) -> ZoomBounds {
    let base_radius = viewport.base_radius();
    let base_radius = if base_radius.is_finite() && base_radius > 0.0 {
        base_radius
    } else {
        0.0
    };
    ZoomBounds::new(&config.zoom, base_radius)
}

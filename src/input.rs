// Interaction arbitration. The coordinator owns the transform and the animation scheduler,
// so the only way to mutate the view is through one of its transitions.
//
//   Idle | AutoRotating --pointer down in disk--> Dragging --pointer up--> resting mode
//   any --wheel--> WheelZooming --(same call)--> previous mode
//   any --zoom button--> ButtonZooming --tween done--> mode before the press
//   any --reset--> ResettingView --tween done--> resting mode
//
// The resting mode is AutoRotating when the configured speed is positive, otherwise Idle.

use log::debug;

use crate::config::InteractionSettings;
use crate::projection::Projector;
use crate::scheduler::{AnimationScheduler, TaskHandle, Tween, TweenKind};
use crate::transform::{TransformState, ZoomBounds};
use crate::types::{InteractionMode, Rotation, ScreenPoint, Timestamp};

/// Only the primary button starts a drag.
const PRIMARY_BUTTON: u8 = 0;

/// Direction of a discrete zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Values the coordinator needs from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatorSettings {
    pub rotation_speed: f64,
    pub initial_rotation: Rotation,
    pub interaction: InteractionSettings,
}

/// Finite-state machine deciding which actor may mutate the transform.
#[derive(Debug)]
pub struct InputCoordinator {
    mode: InteractionMode,
    resume_mode: InteractionMode,
    transform: TransformState,
    scheduler: AnimationScheduler,
    settings: CoordinatorSettings,
    center: ScreenPoint,
    last_pointer: Option<ScreenPoint>,
}

impl InputCoordinator {
    /// Seed the machine. Starts auto-rotation at `now` when the speed is positive.
    pub fn new(
        transform: TransformState,
        settings: CoordinatorSettings,
        center: ScreenPoint,
        now: Timestamp,
    ) -> Self {
        let mut coordinator = InputCoordinator {
            mode: InteractionMode::Idle,
            resume_mode: InteractionMode::Idle,
            transform,
            scheduler: AnimationScheduler::new(),
            settings,
            center,
            last_pointer: None,
        };
        coordinator.settle(now);
        coordinator
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn center(&self) -> ScreenPoint {
        self.center
    }

    pub fn projector(&self) -> Projector {
        Projector::new(self.transform.rotation(), self.transform.scale(), self.center)
    }

    /// Mode the machine falls back to when no interaction is in progress.
    pub fn resting_mode(&self) -> InteractionMode {
        if self.settings.rotation_speed > 0.0 {
            InteractionMode::AutoRotating
        } else {
            InteractionMode::Idle
        }
    }

    /// True when the running scheduler task matches the mode and nothing else is running.
    pub fn owner_is_exclusive(&self) -> bool {
        let rotating = self.scheduler.is_auto_rotating();
        let tween = self.scheduler.active_tween();
        match self.mode {
            InteractionMode::AutoRotating => rotating && tween.is_none(),
            InteractionMode::ButtonZooming => !rotating && tween == Some(TweenKind::Zoom),
            InteractionMode::ResettingView => !rotating && tween == Some(TweenKind::ResetView),
            InteractionMode::Idle | InteractionMode::Dragging | InteractionMode::WheelZooming => {
                self.scheduler.is_idle()
            }
        }
    }

    /// Begin a drag if the pointer lands on the globe disk. Returns whether it was accepted.
    pub fn pointer_down(&mut self, position: ScreenPoint, button: u8) -> bool {
        if button != PRIMARY_BUTTON || !position.is_finite() {
            return false;
        }
        if !self.projector().disk_contains(position) {
            return false;
        }
        self.scheduler.cancel_all();
        self.last_pointer = Some(position);
        self.set_mode(InteractionMode::Dragging);
        true
    }

    /// Rotate by the pointer delta since the previous move. Sensitivity shrinks with scale
    /// so the surface keeps pace with the pointer at every zoom level.
    pub fn pointer_move(&mut self, position: ScreenPoint) -> bool {
        if self.mode != InteractionMode::Dragging || !position.is_finite() {
            return false;
        }
        let previous = match self.last_pointer.replace(position) {
            Some(previous) => previous,
            None => return false,
        };
        let dx = position.x - previous.x;
        let dy = position.y - previous.y;
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        let k = self.settings.interaction.drag_sensitivity / self.transform.scale();
        self.transform.rotate_by(dx * k, -dy * k);
        true
    }

    /// End a drag and fall back to the resting mode.
    pub fn pointer_up(&mut self, now: Timestamp) -> bool {
        if self.mode != InteractionMode::Dragging {
            return false;
        }
        self.last_pointer = None;
        self.settle(now);
        true
    }

    /// One discrete wheel step. Not sticky: the previous mode is restored before returning.
    /// A wheel step during a tween cancels the tween and returns to the resting mode.
    pub fn wheel(&mut self, delta_y: f64, now: Timestamp) -> bool {
        if !delta_y.is_finite() || delta_y == 0.0 {
            return false;
        }
        let previous = match self.mode {
            InteractionMode::ButtonZooming | InteractionMode::ResettingView => {
                self.scheduler.cancel_tween();
                self.resting_mode()
            }
            mode => mode,
        };

        self.set_mode(InteractionMode::WheelZooming);
        let factor = if delta_y < 0.0 {
            self.settings.interaction.wheel_zoom_in_factor
        } else {
            self.settings.interaction.wheel_zoom_out_factor
        };
        let before = self.transform.scale();
        self.transform.set_scale(before * factor);
        let changed = self.transform.scale() != before;

        self.restore(previous, now);
        changed
    }

    /// Animate the scale by one zoom-speed step.
    pub fn zoom_button(&mut self, direction: ZoomDirection, now: Timestamp) -> TaskHandle {
        self.resume_mode = match self.mode {
            InteractionMode::AutoRotating | InteractionMode::Idle => self.mode,
            // Keep the mode from before the first press of a burst.
            InteractionMode::ButtonZooming => self.resume_mode,
            _ => self.resting_mode(),
        };
        self.last_pointer = None;

        let bounds = self.transform.bounds();
        let current = self.transform.scale();
        let target = match direction {
            ZoomDirection::In => current * bounds.speed_factor,
            ZoomDirection::Out => current / bounds.speed_factor,
        };
        let tween = Tween::zoom(
            current,
            bounds.clamp(target),
            self.settings.interaction.zoom_duration_ms,
            now,
        );
        let handle = self.scheduler.start_tween(tween);
        self.set_mode(InteractionMode::ButtonZooming);
        handle
    }

    /// Animate rotation and scale back to the configured defaults.
    pub fn reset_view(&mut self, now: Timestamp) -> TaskHandle {
        self.last_pointer = None;
        let bounds = self.transform.bounds();
        let tween = Tween::reset_view(
            (self.transform.rotation(), self.transform.scale()),
            (self.settings.initial_rotation, bounds.initial_scale),
            self.settings.interaction.reset_duration_ms,
            now,
        );
        let handle = self.scheduler.start_tween(tween);
        self.set_mode(InteractionMode::ResettingView);
        handle
    }

    /// Per-frame step of whichever animation owns the transform. Returns whether it changed.
    pub fn advance(&mut self, now: Timestamp) -> bool {
        let (changed, completion) = self.scheduler.advance(now, &mut self.transform);
        if let Some(completion) = completion {
            match completion.kind {
                TweenKind::Zoom => self.restore(self.resume_mode, now),
                TweenKind::ResetView => self.settle(now),
            }
        }
        changed
    }

    /// New viewport: re-centre, rebase the scale bounds and land any tween on its target.
    pub fn resize(&mut self, bounds: ZoomBounds, center: ScreenPoint, now: Timestamp) {
        self.center = center;
        let pending = self.scheduler.active_tween();
        if let Some((rotation, scale)) = self.scheduler.tween_target() {
            self.scheduler.cancel_tween();
            if let Some(rotation) = rotation {
                self.transform.set_rotation(rotation);
            }
            self.transform.set_scale(scale);
        }
        self.transform.rebase(bounds);
        match pending {
            Some(TweenKind::Zoom) => self.restore(self.resume_mode, now),
            Some(TweenKind::ResetView) => {
                self.transform.set_scale(bounds.initial_scale);
                self.settle(now);
            }
            None => {}
        }
    }

    /// Cancel whatever is running. The machine is left Idle with no scheduled work.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_all();
        self.last_pointer = None;
        self.set_mode(InteractionMode::Idle);
    }

    fn settle(&mut self, now: Timestamp) {
        let resting = self.resting_mode();
        self.restore(resting, now);
    }

    fn restore(&mut self, mode: InteractionMode, now: Timestamp) {
        match mode {
            InteractionMode::AutoRotating => {
                if !self.scheduler.is_auto_rotating()
                    && self
                        .scheduler
                        .start_auto_rotation(self.settings.rotation_speed, now)
                        .is_none()
                {
                    self.set_mode(InteractionMode::Idle);
                    return;
                }
                self.set_mode(InteractionMode::AutoRotating);
            }
            InteractionMode::Idle | InteractionMode::Dragging => {
                self.scheduler.cancel_all();
                self.set_mode(mode);
            }
            InteractionMode::WheelZooming
            | InteractionMode::ButtonZooming
            | InteractionMode::ResettingView => self.settle(now),
        }
    }

    fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode != mode {
            debug!("interaction {} -> {}", self.mode.as_str(), mode.as_str());
            self.mode = mode;
        }
    }
}

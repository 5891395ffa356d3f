// Frame-driven animation: the auto-rotation tick and one-shot eased tweens.
// Nothing here owns a clock; the host passes the frame timestamp into `advance`.
// At most one task mutates the transform at a time: starting a tween cancels rotation
// and any earlier tween, starting rotation cancels any tween.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::transform::{shortest_delta, TransformState};
use crate::types::{ease_in_out, Rotation, Timestamp};

/// Handle returned by every start call. Cancelling a stale handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// What a tween is animating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TweenKind {
    Zoom,
    ResetView,
}

/// Transform values produced by a tween for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSample {
    pub rotation: Option<Rotation>,
    pub scale: f64,
    pub finished: bool,
}

/// Time-parameterized interpolation of scale and, optionally, rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    kind: TweenKind,
    start: Timestamp,
    duration_us: u64,
    from_scale: f64,
    to_scale: f64,
    rotation: Option<(Rotation, Rotation)>,
}

impl Tween {
    /// Scale-only tween.
    pub fn zoom(from_scale: f64, to_scale: f64, duration_ms: u64, start: Timestamp) -> Self {
        Tween {
            kind: TweenKind::Zoom,
            start,
            duration_us: duration_ms.saturating_mul(1000),
            from_scale,
            to_scale,
            rotation: None,
        }
    }

    /// Combined rotation + scale tween back to the default view.
    pub fn reset_view(
        from: (Rotation, f64),
        to: (Rotation, f64),
        duration_ms: u64,
        start: Timestamp,
    ) -> Self {
        Tween {
            kind: TweenKind::ResetView,
            start,
            duration_us: duration_ms.saturating_mul(1000),
            from_scale: from.1,
            to_scale: to.1,
            rotation: Some((from.0, to.0)),
        }
    }

    pub fn kind(&self) -> TweenKind {
        self.kind
    }

    pub fn target_scale(&self) -> f64 {
        self.to_scale
    }

    pub fn target_rotation(&self) -> Option<Rotation> {
        self.rotation.map(|(_, to)| to)
    }

    /// Linear progress in [0, 1].
    pub fn progress(&self, now: Timestamp) -> f64 {
        if self.duration_us == 0 {
            return 1.0;
        }
        (now.saturating_since(self.start) as f64 / self.duration_us as f64).min(1.0)
    }

    pub fn sample(&self, now: Timestamp) -> TweenSample {
        let progress = self.progress(now);
        let finished = progress >= 1.0;
        // Land exactly on the target at the end, whatever the curve does.
        let t = if finished { 1.0 } else { ease_in_out(progress) };

        let rotation = self.rotation.map(|(from, to)| {
            if finished {
                to
            } else {
                Rotation::new(
                    from.lon + shortest_delta(from.lon, to.lon) * t,
                    lerp(from.lat, to.lat, t),
                    from.roll + shortest_delta(from.roll, to.roll) * t,
                )
            }
        });
        let scale = if finished {
            self.to_scale
        } else {
            lerp(self.from_scale, self.to_scale, t)
        };

        TweenSample {
            rotation,
            scale,
            finished,
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Repeating per-frame rotation by `speed` degrees per second.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AutoRotation {
    speed: f64,
    last_tick: Timestamp,
}

/// Signalled exactly once when a tween reaches its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub handle: TaskHandle,
    pub kind: TweenKind,
}

/// Owns the running animation tasks and applies them to the transform each frame.
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    next_id: u64,
    rotation: Option<(TaskHandle, AutoRotation)>,
    tween: Option<(TaskHandle, Tween)>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        AnimationScheduler::default()
    }

    fn next_handle(&mut self) -> TaskHandle {
        self.next_id += 1;
        TaskHandle(self.next_id)
    }

    /// Start (or restart) the rotation clock at `now`. Returns `None` for a non-positive speed.
    pub fn start_auto_rotation(&mut self, speed: f64, now: Timestamp) -> Option<TaskHandle> {
        self.cancel_tween();
        self.cancel_auto_rotation();
        if !(speed.is_finite() && speed > 0.0) {
            return None;
        }
        let handle = self.next_handle();
        debug!("auto-rotation {} started at {} deg/s", handle.id(), speed);
        self.rotation = Some((
            handle,
            AutoRotation {
                speed,
                last_tick: now,
            },
        ));
        Some(handle)
    }

    /// Start a tween, cancelling any running rotation or earlier tween first.
    pub fn start_tween(&mut self, tween: Tween) -> TaskHandle {
        self.cancel_auto_rotation();
        self.cancel_tween();
        let handle = self.next_handle();
        debug!("tween {} ({:?}) started", handle.id(), tween.kind());
        self.tween = Some((handle, tween));
        handle
    }

    /// Cancel the task behind `handle`. Returns false if it had already stopped.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        if matches!(self.rotation, Some((h, _)) if h == handle) {
            return self.cancel_auto_rotation();
        }
        if matches!(self.tween, Some((h, _)) if h == handle) {
            return self.cancel_tween();
        }
        false
    }

    pub fn cancel_auto_rotation(&mut self) -> bool {
        match self.rotation.take() {
            Some((handle, _)) => {
                debug!("auto-rotation {} cancelled", handle.id());
                true
            }
            None => false,
        }
    }

    pub fn cancel_tween(&mut self) -> bool {
        match self.tween.take() {
            Some((handle, tween)) => {
                debug!("tween {} ({:?}) cancelled", handle.id(), tween.kind());
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.cancel_auto_rotation();
        self.cancel_tween();
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.rotation.is_some()
    }

    pub fn active_tween(&self) -> Option<TweenKind> {
        self.tween.as_ref().map(|(_, tween)| tween.kind())
    }

    /// End state of the running tween: (rotation, scale).
    pub fn tween_target(&self) -> Option<(Option<Rotation>, f64)> {
        self.tween
            .as_ref()
            .map(|(_, tween)| (tween.target_rotation(), tween.target_scale()))
    }

    pub fn is_idle(&self) -> bool {
        self.rotation.is_none() && self.tween.is_none()
    }

    /// Apply one frame of whichever task is running. Returns true if the transform changed,
    /// plus the completion signal if a tween ended on this frame.
    pub fn advance(
        &mut self,
        now: Timestamp,
        transform: &mut TransformState,
    ) -> (bool, Option<Completion>) {
        if let Some((_, rotation)) = self.rotation.as_mut() {
            // A stale timestamp leaves the tick where it was.
            let elapsed_us = now.saturating_since(rotation.last_tick);
            if elapsed_us == 0 {
                return (false, None);
            }
            rotation.last_tick = now;
            transform.rotate_by(elapsed_us as f64 / 1_000_000.0 * rotation.speed, 0.0);
            return (true, None);
        }

        let sample = match self.tween.as_ref() {
            Some((_, tween)) => tween.sample(now),
            None => return (false, None),
        };
        if let Some(rotation) = sample.rotation {
            transform.set_rotation(rotation);
        }
        transform.set_scale(sample.scale);

        if !sample.finished {
            return (true, None);
        }
        let completion = self.tween.take().map(|(handle, tween)| {
            debug!("tween {} ({:?}) completed", handle.id(), tween.kind());
            Completion {
                handle,
                kind: tween.kind(),
            }
        });
        (true, completion)
    }
}

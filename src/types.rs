// Strong typing over loose numbers. Newtypes for timestamps, screen and geographic coordinates.

use serde::{Deserialize, Serialize};

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// From host milliseconds (`performance.now()`). Negative or non-finite input maps to zero.
    pub fn from_millis(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timestamp((ms * 1000.0).round() as u64)
        } else {
            Timestamp(0)
        }
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Microseconds elapsed since `earlier`; zero if the clock went backwards.
    pub fn saturating_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Planar position in container pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        ScreenPoint { x, y }
    }

    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoCoord {
    pub lon: f64,
    pub lat: f64,
}

impl GeoCoord {
    pub fn new(lon: f64, lat: f64) -> Self {
        GeoCoord { lon, lat }
    }
}

/// Three-axis sphere rotation in degrees, applied before projection.
/// Roll is carried through projection but never touched by drag or zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rotation {
    pub lon: f64,
    pub lat: f64,
    pub roll: f64,
}

impl Rotation {
    pub fn new(lon: f64, lat: f64, roll: f64) -> Self {
        Rotation { lon, lat, roll }
    }

    pub fn from_array(values: [f64; 3]) -> Self {
        Rotation::new(values[0], values[1], values[2])
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.roll.is_finite()
    }
}

/// Container dimensions reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    /// Below this the globe would be sub-pixel; rendering is suspended.
    pub const MIN_RADIUS: f64 = 0.5;

    pub fn new(width: f64, height: f64) -> Self {
        ViewportSize { width, height }
    }

    /// On-screen globe radius at 100% zoom.
    pub fn base_radius(&self) -> f64 {
        self.width.min(self.height) / 2.5
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn is_degenerate(&self) -> bool {
        let radius = self.base_radius();
        !radius.is_finite() || radius < Self::MIN_RADIUS
    }
}

/// Which actor currently owns the transform. Exactly one at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionMode {
    Idle,
    AutoRotating,
    Dragging,
    WheelZooming,
    ButtonZooming,
    ResettingView,
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::Idle => "Idle",
            InteractionMode::AutoRotating => "AutoRotating",
            InteractionMode::Dragging => "Dragging",
            InteractionMode::WheelZooming => "WheelZooming",
            InteractionMode::ButtonZooming => "ButtonZooming",
            InteractionMode::ResettingView => "ResettingView",
        }
    }
}

/// Cubic ease-in-out over progress in [0, 1]. Input is clamped.
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Batch of host events (one JS↔WASM crossing per frame).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventBatch {
    pub events: Vec<InputEvent>,
}

/// Single host event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputEvent {
    pub timestamp: Timestamp,
    pub event_type: EventType,
}

/// Type of host event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventType {
    PointerDown {
        position: ScreenPoint,
        #[serde(default)]
        button: u8,
    },
    PointerMove { position: ScreenPoint },
    PointerUp { position: ScreenPoint },
    Wheel { delta_y: f64 },
    ZoomIn,
    ZoomOut,
    ResetView,
    PointEnter { index: usize, position: ScreenPoint },
    PointLeave { index: usize },
    Resize { width: f64, height: f64 },
}

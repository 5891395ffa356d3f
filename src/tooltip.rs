// Hover feedback: point growth, tooltip content and fade. Independent of the view transform;
// the tooltip position is captured at hover time and stays put while the globe moves.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{InteractionSettings, TooltipSettings};
use crate::points::GeoPoint;
use crate::types::{ease_in_out, ScreenPoint, Timestamp};

/// Radius multiplier of the hovered point.
pub const HOVER_GROWTH: f64 = 1.5;
/// Opacity of a fully shown tooltip.
pub const TOOLTIP_OPACITY: f64 = 0.9;
/// Offset from the pointer to the tooltip's top-left corner.
pub const TOOLTIP_OFFSET: ScreenPoint = ScreenPoint { x: 10.0, y: -10.0 };

/// Text shown in the tooltip: a bold title plus detail lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TooltipContent {
    pub title: String,
    pub lines: Vec<String>,
}

impl TooltipContent {
    pub fn for_point(point: &GeoPoint, settings: &TooltipSettings) -> Self {
        let mut lines = Vec::new();
        if let Some(size) = point.size_value {
            if settings.show_measure_label {
                lines.push(format!("{}: {}", settings.measure_label(), format_number(size)));
            } else {
                lines.push(format_number(size));
            }
        }
        if let Some(color) = point.color_value {
            lines.push(format!("Color: {}", format_number(color)));
        }
        TooltipContent {
            title: point.label.clone(),
            lines,
        }
    }
}

impl fmt::Display for TooltipContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for line in &self.lines {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

/// Snapshot handed to the host each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TooltipState {
    pub visible: bool,
    pub content: TooltipContent,
    pub position: ScreenPoint,
    pub opacity: f64,
}

/// Format like an en-US locale number: grouped thousands, at most three decimals.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac.is_empty();
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}

/// A scalar moving between two values over time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    from: f64,
    to: f64,
    start: Timestamp,
    duration_us: u64,
}

impl Transition {
    fn settled(value: f64) -> Self {
        Transition {
            from: value,
            to: value,
            start: Timestamp::default(),
            duration_us: 0,
        }
    }

    fn towards(current: f64, to: f64, duration_ms: u64, now: Timestamp) -> Self {
        Transition {
            from: current,
            to,
            start: now,
            duration_us: duration_ms.saturating_mul(1000),
        }
    }

    fn is_done(&self, now: Timestamp) -> bool {
        self.duration_us == 0 || now.saturating_since(self.start) >= self.duration_us
    }

    fn value(&self, now: Timestamp) -> f64 {
        if self.is_done(now) {
            return self.to;
        }
        let progress = now.saturating_since(self.start) as f64 / self.duration_us as f64;
        let t = ease_in_out(progress);
        self.from + (self.to - self.from) * t
    }
}

/// Tracks the hovered point, per-point growth transitions and the tooltip fade.
#[derive(Debug)]
pub struct TooltipController {
    settings: TooltipSettings,
    hover_ms: u64,
    fade_in_ms: u64,
    fade_out_ms: u64,
    hovered: Option<usize>,
    growth: HashMap<usize, Transition>,
    opacity: Transition,
    content: TooltipContent,
    position: ScreenPoint,
}

impl TooltipController {
    pub fn new(settings: TooltipSettings, timing: &InteractionSettings) -> Self {
        TooltipController {
            settings,
            hover_ms: timing.hover_duration_ms,
            fade_in_ms: timing.tooltip_fade_in_ms,
            fade_out_ms: timing.tooltip_fade_out_ms,
            hovered: None,
            growth: HashMap::new(),
            opacity: Transition::settled(0.0),
            content: TooltipContent::default(),
            position: ScreenPoint::default(),
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Pointer entered point `index` at `pointer`.
    pub fn enter(&mut self, index: usize, point: &GeoPoint, pointer: ScreenPoint, now: Timestamp) {
        if let Some(previous) = self.hovered.filter(|&previous| previous != index) {
            self.shrink(previous, now);
        }
        self.hovered = Some(index);

        let current = self.radius_multiplier(index, now);
        self.growth.insert(
            index,
            Transition::towards(current, HOVER_GROWTH, self.hover_ms, now),
        );

        self.content = TooltipContent::for_point(point, &self.settings);
        self.position = ScreenPoint::new(pointer.x + TOOLTIP_OFFSET.x, pointer.y + TOOLTIP_OFFSET.y);
        let opacity = self.opacity.value(now);
        self.opacity = Transition::towards(opacity, TOOLTIP_OPACITY, self.fade_in_ms, now);
    }

    /// Pointer left point `index`.
    pub fn leave(&mut self, index: usize, now: Timestamp) {
        self.shrink(index, now);
        if self.hovered == Some(index) {
            self.hovered = None;
            let opacity = self.opacity.value(now);
            self.opacity = Transition::towards(opacity, 0.0, self.fade_out_ms, now);
        }
    }

    /// Drop all hover state, e.g. when the point set is replaced.
    pub fn clear(&mut self) {
        self.hovered = None;
        self.growth.clear();
        self.opacity = Transition::settled(0.0);
        self.content = TooltipContent::default();
    }

    fn shrink(&mut self, index: usize, now: Timestamp) {
        let current = self.radius_multiplier(index, now);
        self.growth
            .insert(index, Transition::towards(current, 1.0, self.hover_ms, now));
    }

    /// Current radius multiplier for point `index` (1.0 when not hovered).
    pub fn radius_multiplier(&self, index: usize, now: Timestamp) -> f64 {
        self.growth
            .get(&index)
            .map(|transition| transition.value(now))
            .unwrap_or(1.0)
    }

    /// True while any growth or fade transition is still moving at `now`.
    pub fn is_animating(&self, now: Timestamp) -> bool {
        !self.opacity.is_done(now) || self.growth.values().any(|t| !t.is_done(now))
    }

    /// Forget finished shrink transitions so the map only holds live entries.
    pub fn prune(&mut self, now: Timestamp) {
        self.growth
            .retain(|_, transition| !(transition.is_done(now) && transition.to == 1.0));
    }

    pub fn state(&self, now: Timestamp) -> TooltipState {
        let opacity = self.opacity.value(now);
        TooltipState {
            visible: opacity > 0.0,
            content: self.content.clone(),
            position: self.position,
            opacity,
        }
    }
}

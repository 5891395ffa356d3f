// globe_core: orthographic globe engine for Rust/WASM hosts.
// The host owns the DOM and the clock; projection, culling, interaction arbitration and
// animation live here. JS forwards events and draws the frames it gets back.

mod config;
mod engine;
mod error;
mod geometry;
mod input;
mod points;
mod projection;
mod render;
mod scheduler;
mod tooltip;
mod transform;
mod types;

use wasm_bindgen::prelude::*;

pub use config::{
    color_with_opacity, ColorSetting, ColorSettings, ColorValue, GlobeConfig,
    InteractionSettings, Palette, PointSizeSettings, SizeType, TooltipSettings, TooltipStyle,
    ZoomConfig, MAX_ANIMATION_MS, PALETTE,
};
pub use engine::GlobeEngine;
pub use error::EngineError;
pub use geometry::{boundaries_from_json, clip_ring, Boundary, ProjectedPath};
pub use input::{CoordinatorSettings, InputCoordinator, ZoomDirection};
pub use points::{ingest, DataRow, GeoPoint, SizeScale};
pub use projection::{is_front_facing, project, unproject, Projector};
pub use render::{GlobeDisk, PointSprite, RenderFrame, RenderSync};
pub use scheduler::{AnimationScheduler, Completion, TaskHandle, Tween, TweenKind, TweenSample};
pub use tooltip::{format_number, TooltipContent, TooltipController, TooltipState};
pub use transform::{shortest_delta, wrap_degrees, TransformState, ZoomBounds};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Globe engine exposed to JavaScript.
///
/// All times are host milliseconds (`performance.now()`). Frames come back as JSON; point
/// positions are also available as a flat `Float64Array` to skip the JSON round trip.
///
/// # Example (JavaScript)
/// ```javascript
/// const globe = new WasmGlobeEngine(configJson, w, h, rowsJson, countriesJson, performance.now());
/// canvas.onpointerdown = (e) => globe.pointer_down(e.offsetX, e.offsetY, e.button);
/// function tick(now) {
///   const frame = globe.frame(now);
///   if (frame) draw(JSON.parse(frame), globe.point_buffer());
///   requestAnimationFrame(tick);
/// }
/// ```
#[wasm_bindgen]
pub struct WasmGlobeEngine {
    inner: GlobeEngine,
}

#[wasm_bindgen]
impl WasmGlobeEngine {
    /// Create an engine. Empty `rows_json` / `boundaries_json` are accepted as empty sets.
    ///
    /// # Returns
    /// The engine, or an error if the configuration or data documents are malformed.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        width: f64,
        height: f64,
        rows_json: &str,
        boundaries_json: &str,
        now_ms: f64,
    ) -> Result<WasmGlobeEngine, JsValue> {
        let inner = GlobeEngine::from_json(
            config_json,
            ViewportSize::new(width, height),
            rows_json,
            boundaries_json,
            Timestamp::from_millis(now_ms),
        )
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGlobeEngine { inner })
    }

    #[wasm_bindgen]
    pub fn resize(&mut self, width: f64, height: f64, now_ms: f64) {
        self.inner
            .resize(ViewportSize::new(width, height), Timestamp::from_millis(now_ms));
    }

    #[wasm_bindgen]
    pub fn destroy(&mut self) {
        self.inner.destroy();
    }

    /// # Returns
    /// `true` if a drag started (primary button, inside the globe disk).
    #[wasm_bindgen]
    pub fn pointer_down(&mut self, x: f64, y: f64, button: u8) -> bool {
        self.inner.pointer_down(ScreenPoint::new(x, y), button)
    }

    #[wasm_bindgen]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.inner.pointer_move(ScreenPoint::new(x, y))
    }

    #[wasm_bindgen]
    pub fn pointer_up(&mut self, now_ms: f64) -> bool {
        self.inner.pointer_up(Timestamp::from_millis(now_ms))
    }

    /// One wheel step; negative `delta_y` zooms in.
    #[wasm_bindgen]
    pub fn wheel(&mut self, delta_y: f64, now_ms: f64) -> bool {
        self.inner.wheel(delta_y, Timestamp::from_millis(now_ms))
    }

    #[wasm_bindgen]
    pub fn zoom_in(&mut self, now_ms: f64) -> bool {
        self.inner.zoom_in(Timestamp::from_millis(now_ms)).is_some()
    }

    #[wasm_bindgen]
    pub fn zoom_out(&mut self, now_ms: f64) -> bool {
        self.inner.zoom_out(Timestamp::from_millis(now_ms)).is_some()
    }

    #[wasm_bindgen]
    pub fn reset_view(&mut self, now_ms: f64) -> bool {
        self.inner.reset_view(Timestamp::from_millis(now_ms)).is_some()
    }

    #[wasm_bindgen]
    pub fn point_enter(&mut self, index: usize, x: f64, y: f64, now_ms: f64) -> bool {
        self.inner
            .point_enter(index, ScreenPoint::new(x, y), Timestamp::from_millis(now_ms))
    }

    #[wasm_bindgen]
    pub fn point_leave(&mut self, index: usize, now_ms: f64) -> bool {
        self.inner.point_leave(index, Timestamp::from_millis(now_ms))
    }

    /// Apply a JSON `EventBatch` and render once.
    ///
    /// # Returns
    /// The frame as JSON, or `undefined` if nothing changed or the viewport is degenerate.
    #[wasm_bindgen]
    pub fn dispatch(&mut self, batch_json: &str, now_ms: f64) -> Result<Option<String>, JsValue> {
        let batch: EventBatch = serde_json::from_str(batch_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid events: {}", e)))?;
        self.inner
            .dispatch(&batch, Timestamp::from_millis(now_ms))
            .map(frame_to_json)
            .transpose()
    }

    /// Advance animations to `now_ms`.
    ///
    /// # Returns
    /// The frame as JSON, or `undefined` if nothing changed or the viewport is degenerate.
    #[wasm_bindgen]
    pub fn frame(&mut self, now_ms: f64) -> Result<Option<String>, JsValue> {
        self.inner
            .frame(Timestamp::from_millis(now_ms))
            .map(frame_to_json)
            .transpose()
    }

    /// `[x, y, visible, radius]` per point of the most recent frame.
    #[wasm_bindgen]
    pub fn point_buffer(&self) -> js_sys::Float64Array {
        let buffer = self
            .inner
            .last_frame()
            .map(RenderFrame::point_buffer)
            .unwrap_or_default();
        js_sys::Float64Array::from(buffer.as_slice())
    }

    #[wasm_bindgen]
    pub fn zoom_percentage(&self) -> i32 {
        self.inner.current_zoom_percentage() as i32
    }

    #[wasm_bindgen]
    pub fn mode(&self) -> String {
        self.inner.mode().as_str().to_string()
    }

    /// Resolved colours and tooltip style as JSON, for styling the host's DOM.
    #[wasm_bindgen]
    pub fn style_json(&self) -> Result<String, JsValue> {
        let style = serde_json::json!({
            "palette": self.inner.palette(),
            "tooltip": self.inner.tooltip_style(),
        });
        serde_json::to_string(&style)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

fn frame_to_json(frame: &RenderFrame) -> Result<String, JsValue> {
    serde_json::to_string(frame)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Error paths build a JsValue, which is only available on wasm32; they are covered by
    // GlobeEngine's own tests.

    #[test]
    fn engine_creation_works() {
        let engine = WasmGlobeEngine::new("{}", 800.0, 600.0, "[]", "", 0.0);
        assert!(engine.is_ok());
    }

    #[test]
    fn frame_is_json() {
        let rows = r#"[{"latitude": 51.5, "longitude": -0.12, "label": "London", "size_value": 9}]"#;
        let mut engine = WasmGlobeEngine::new(r#"{"rotation_speed": 0}"#, 500.0, 500.0, rows, "", 0.0)
            .unwrap();
        let json = engine.frame(16.0).unwrap().unwrap();
        let frame: RenderFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame.points.len(), 1);
        assert_eq!(frame.mode, InteractionMode::Idle);
        assert_eq!(engine.zoom_percentage(), 125);
        assert_eq!(engine.mode(), "Idle");
        assert!(engine.frame(32.0).unwrap().is_none());
    }

    #[test]
    fn buttons_and_destroy() {
        let mut engine = WasmGlobeEngine::new("", 500.0, 500.0, "", "", 0.0).unwrap();
        assert!(engine.zoom_in(0.0));
        assert_eq!(engine.mode(), "ButtonZooming");
        engine.frame(300.0).unwrap();
        assert_eq!(engine.zoom_percentage(), 150);
        assert!(engine.style_json().unwrap().contains("#008936"));

        engine.destroy();
        assert!(!engine.reset_view(400.0));
        assert!(engine.frame(500.0).unwrap().is_none());
    }
}

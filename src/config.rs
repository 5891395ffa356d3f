// Host configuration. Parsed once from JSON, validated at initialize, resolved to concrete values
// so per-frame code never re-interprets loosely typed settings.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Colour-picker palette addressed by `ColorValue::Indexed`.
pub const PALETTE: [&str; 12] = [
    "#b0afae", "#7b7a78", "#545352", "#4477aa", "#7db8da", "#b6d7ea", "#46c646", "#f93f17",
    "#ffcf02", "#276e27", "#ffffff", "#000000",
];

/// Engine configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobeConfig {
    /// Auto-rotation speed in degrees per second. Zero disables auto-rotation.
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f64,
    /// Rotation restored by reset-view: [lon, lat, roll] in degrees.
    #[serde(default = "default_initial_rotation")]
    pub initial_rotation: [f64; 3],
    #[serde(default)]
    pub zoom: ZoomConfig,
    #[serde(default)]
    pub interaction: InteractionSettings,
    #[serde(default)]
    pub colors: ColorSettings,
    #[serde(default)]
    pub point_size: PointSizeSettings,
    #[serde(default)]
    pub tooltip: TooltipSettings,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        GlobeConfig {
            rotation_speed: default_rotation_speed(),
            initial_rotation: default_initial_rotation(),
            zoom: ZoomConfig::default(),
            interaction: InteractionSettings::default(),
            colors: ColorSettings::default(),
            point_size: PointSizeSettings::default(),
            tooltip: TooltipSettings::default(),
        }
    }
}

impl GlobeConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: GlobeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject anything that would produce a non-finite or inverted transform later.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.rotation_speed.is_finite() || self.rotation_speed < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "rotation_speed must be finite and >= 0, got {}",
                self.rotation_speed
            )));
        }
        if self.initial_rotation.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::InvalidConfig(
                "initial_rotation must be finite".to_string(),
            ));
        }
        self.zoom.validate()?;
        self.interaction.validate()?;
        self.point_size.validate()?;
        Ok(())
    }
}

fn default_rotation_speed() -> f64 {
    20.0
}

fn default_initial_rotation() -> [f64; 3] {
    [0.0, -25.0, 0.0]
}

/// Zoom factors relative to the base radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomConfig {
    #[serde(default = "default_min_zoom_scale")]
    pub min_zoom_scale: f64,
    #[serde(default = "default_max_zoom_scale")]
    pub max_zoom_scale: f64,
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f64,
    /// Multiplier applied by one zoom-button press.
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        ZoomConfig {
            min_zoom_scale: default_min_zoom_scale(),
            max_zoom_scale: default_max_zoom_scale(),
            initial_zoom: default_initial_zoom(),
            zoom_speed: default_zoom_speed(),
        }
    }
}

impl ZoomConfig {
    fn validate(&self) -> Result<(), EngineError> {
        let fields = [
            ("min_zoom_scale", self.min_zoom_scale),
            ("max_zoom_scale", self.max_zoom_scale),
            ("initial_zoom", self.initial_zoom),
            ("zoom_speed", self.zoom_speed),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be finite and > 0, got {}",
                    name, value
                )));
            }
        }
        if self.min_zoom_scale > self.max_zoom_scale {
            return Err(EngineError::InvalidConfig(format!(
                "min_zoom_scale {} exceeds max_zoom_scale {}",
                self.min_zoom_scale, self.max_zoom_scale
            )));
        }
        if self.zoom_speed <= 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "zoom_speed must be > 1, got {}",
                self.zoom_speed
            )));
        }
        Ok(())
    }

    /// Initial zoom factor, clamped into the configured range.
    pub fn clamped_initial_zoom(&self) -> f64 {
        self.initial_zoom
            .clamp(self.min_zoom_scale, self.max_zoom_scale)
    }
}

fn default_min_zoom_scale() -> f64 {
    0.5
}

fn default_max_zoom_scale() -> f64 {
    2.5
}

fn default_initial_zoom() -> f64 {
    1.25
}

fn default_zoom_speed() -> f64 {
    1.2
}

/// Upper bound for every animation duration.
pub const MAX_ANIMATION_MS: u64 = 60_000;

/// Pointer and animation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionSettings {
    /// Degrees of rotation per pixel of drag, multiplied by 1 / scale.
    #[serde(default = "default_drag_sensitivity")]
    pub drag_sensitivity: f64,
    #[serde(default = "default_wheel_zoom_in")]
    pub wheel_zoom_in_factor: f64,
    #[serde(default = "default_wheel_zoom_out")]
    pub wheel_zoom_out_factor: f64,
    #[serde(default = "default_zoom_duration_ms")]
    pub zoom_duration_ms: u64,
    #[serde(default = "default_reset_duration_ms")]
    pub reset_duration_ms: u64,
    #[serde(default = "default_hover_duration_ms")]
    pub hover_duration_ms: u64,
    #[serde(default = "default_fade_in_ms")]
    pub tooltip_fade_in_ms: u64,
    #[serde(default = "default_fade_out_ms")]
    pub tooltip_fade_out_ms: u64,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        InteractionSettings {
            drag_sensitivity: default_drag_sensitivity(),
            wheel_zoom_in_factor: default_wheel_zoom_in(),
            wheel_zoom_out_factor: default_wheel_zoom_out(),
            zoom_duration_ms: default_zoom_duration_ms(),
            reset_duration_ms: default_reset_duration_ms(),
            hover_duration_ms: default_hover_duration_ms(),
            tooltip_fade_in_ms: default_fade_in_ms(),
            tooltip_fade_out_ms: default_fade_out_ms(),
        }
    }
}

impl InteractionSettings {
    fn validate(&self) -> Result<(), EngineError> {
        if !self.drag_sensitivity.is_finite() || self.drag_sensitivity <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "drag_sensitivity must be finite and > 0, got {}",
                self.drag_sensitivity
            )));
        }
        if !(self.wheel_zoom_in_factor.is_finite() && self.wheel_zoom_in_factor > 1.0) {
            return Err(EngineError::InvalidConfig(
                "wheel_zoom_in_factor must be > 1".to_string(),
            ));
        }
        if !(self.wheel_zoom_out_factor.is_finite()
            && self.wheel_zoom_out_factor > 0.0
            && self.wheel_zoom_out_factor < 1.0)
        {
            return Err(EngineError::InvalidConfig(
                "wheel_zoom_out_factor must be in (0, 1)".to_string(),
            ));
        }
        for (name, value) in [
            ("zoom_duration_ms", self.zoom_duration_ms),
            ("reset_duration_ms", self.reset_duration_ms),
            ("hover_duration_ms", self.hover_duration_ms),
            ("tooltip_fade_in_ms", self.tooltip_fade_in_ms),
            ("tooltip_fade_out_ms", self.tooltip_fade_out_ms),
        ] {
            if value > MAX_ANIMATION_MS {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be at most {} ms, got {}",
                    name, MAX_ANIMATION_MS, value
                )));
            }
        }
        Ok(())
    }
}

fn default_drag_sensitivity() -> f64 {
    75.0 // 0.3 deg/px at scale 250
}

fn default_wheel_zoom_in() -> f64 {
    1.1
}

fn default_wheel_zoom_out() -> f64 {
    0.9
}

fn default_zoom_duration_ms() -> u64 {
    250
}

fn default_reset_duration_ms() -> u64 {
    1000
}

fn default_hover_duration_ms() -> u64 {
    200
}

fn default_fade_in_ms() -> u64 {
    200
}

fn default_fade_out_ms() -> u64 {
    500
}

/// Colour as delivered by the host's colour picker: a bare CSS string or a picker object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSetting {
    Css(String),
    Picker {
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        index: Option<i64>,
    },
}

impl ColorSetting {
    fn css(value: &str) -> Self {
        ColorSetting::Css(value.to_string())
    }

    /// Resolve once at load time. Unusable settings fall back to `default`.
    pub fn resolve(&self, default: &str) -> ColorValue {
        match self {
            ColorSetting::Css(color) if !color.trim().is_empty() => {
                ColorValue::Fixed(color.trim().to_string())
            }
            ColorSetting::Picker {
                color: Some(color), ..
            } if !color.trim().is_empty() => ColorValue::Fixed(color.trim().to_string()),
            ColorSetting::Picker {
                index: Some(index), ..
            } if *index >= 0 && (*index as usize) < PALETTE.len() => {
                ColorValue::Indexed(*index as usize)
            }
            _ => ColorValue::Fixed(default.to_string()),
        }
    }
}

/// Resolved colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorValue {
    Fixed(String),
    Indexed(usize),
}

impl ColorValue {
    pub fn to_css(&self) -> String {
        match self {
            ColorValue::Fixed(color) => color.clone(),
            ColorValue::Indexed(index) => PALETTE
                .get(*index)
                .copied()
                .unwrap_or(PALETTE[0])
                .to_string(),
        }
    }
}

/// Fill colours for the globe layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSettings {
    #[serde(default = "default_country_color")]
    pub country_color: ColorSetting,
    #[serde(default = "default_country_hover_color")]
    pub country_hover_color: ColorSetting,
    #[serde(default = "default_ocean_color")]
    pub ocean_color: ColorSetting,
    #[serde(default = "default_point_color")]
    pub point_color: ColorSetting,
}

impl Default for ColorSettings {
    fn default() -> Self {
        ColorSettings {
            country_color: default_country_color(),
            country_hover_color: default_country_hover_color(),
            ocean_color: default_ocean_color(),
            point_color: default_point_color(),
        }
    }
}

impl ColorSettings {
    pub fn resolve(&self) -> Palette {
        Palette {
            country: self.country_color.resolve("#d4dadc").to_css(),
            country_hover: self.country_hover_color.resolve("#b8bfc2").to_css(),
            ocean: self.ocean_color.resolve("#e6f3ff").to_css(),
            point: self.point_color.resolve("#008936").to_css(),
        }
    }
}

fn default_country_color() -> ColorSetting {
    ColorSetting::css("#d4dadc")
}

fn default_country_hover_color() -> ColorSetting {
    ColorSetting::css("#b8bfc2")
}

fn default_ocean_color() -> ColorSetting {
    ColorSetting::css("#e6f3ff")
}

fn default_point_color() -> ColorSetting {
    ColorSetting::css("#008936")
}

/// Concrete CSS colours handed to the host with every scene description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub country: String,
    pub country_hover: String,
    pub ocean: String,
    pub point: String,
}

/// How point radii are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeType {
    Fixed,
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSizeSettings {
    #[serde(default = "default_size_type")]
    pub size_type: SizeType,
    #[serde(default = "default_point_size")]
    pub point_size: f64,
    #[serde(default = "default_min_point_size")]
    pub min_point_size: f64,
    #[serde(default = "default_max_point_size")]
    pub max_point_size: f64,
}

impl Default for PointSizeSettings {
    fn default() -> Self {
        PointSizeSettings {
            size_type: default_size_type(),
            point_size: default_point_size(),
            min_point_size: default_min_point_size(),
            max_point_size: default_max_point_size(),
        }
    }
}

impl PointSizeSettings {
    fn validate(&self) -> Result<(), EngineError> {
        for (name, value) in [
            ("point_size", self.point_size),
            ("min_point_size", self.min_point_size),
            ("max_point_size", self.max_point_size),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn default_size_type() -> SizeType {
    SizeType::Fixed
}

fn default_point_size() -> f64 {
    3.0
}

fn default_min_point_size() -> f64 {
    2.0
}

fn default_max_point_size() -> f64 {
    10.0
}

/// Tooltip appearance and content switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipSettings {
    #[serde(default = "default_tooltip_background")]
    pub background_color: ColorSetting,
    #[serde(default = "default_one")]
    pub background_opacity: f64,
    #[serde(default = "default_tooltip_font_color")]
    pub font_color: ColorSetting,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_padding")]
    pub padding: f64,
    #[serde(default = "default_true")]
    pub border_enabled: bool,
    #[serde(default = "default_one")]
    pub border_width: f64,
    #[serde(default = "default_tooltip_border_color")]
    pub border_color: ColorSetting,
    #[serde(default = "default_border_radius")]
    pub border_radius: f64,
    #[serde(default = "default_true")]
    pub shadow_enabled: bool,
    #[serde(default = "default_shadow_blur")]
    pub shadow_blur: f64,
    #[serde(default = "default_shadow_opacity")]
    pub shadow_opacity: f64,
    #[serde(default = "default_true")]
    pub show_measure_label: bool,
    #[serde(default = "default_measure_label")]
    pub measure_label: String,
}

impl Default for TooltipSettings {
    fn default() -> Self {
        TooltipSettings {
            background_color: default_tooltip_background(),
            background_opacity: default_one(),
            font_color: default_tooltip_font_color(),
            font_size: default_font_size(),
            padding: default_padding(),
            border_enabled: default_true(),
            border_width: default_one(),
            border_color: default_tooltip_border_color(),
            border_radius: default_border_radius(),
            shadow_enabled: default_true(),
            shadow_blur: default_shadow_blur(),
            shadow_opacity: default_shadow_opacity(),
            show_measure_label: default_true(),
            measure_label: default_measure_label(),
        }
    }
}

impl TooltipSettings {
    /// Label shown before the size measure, falling back to "Value" when blank.
    pub fn measure_label(&self) -> &str {
        if self.measure_label.trim().is_empty() {
            "Value"
        } else {
            &self.measure_label
        }
    }

    pub fn style(&self) -> TooltipStyle {
        let background = self.background_color.resolve("#ffffff").to_css();
        let opacity = if self.background_opacity.is_finite() {
            self.background_opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let border = if self.border_enabled {
            format!(
                "{}px solid {}",
                self.border_width,
                self.border_color.resolve("#FFFFFF").to_css()
            )
        } else {
            "none".to_string()
        };
        let box_shadow = if self.shadow_enabled {
            format!(
                "0 2px {}px rgba(0,0,0,{})",
                self.shadow_blur, self.shadow_opacity
            )
        } else {
            "none".to_string()
        };

        TooltipStyle {
            background_color: color_with_opacity(&background, opacity),
            color: self.font_color.resolve("#19426C").to_css(),
            border,
            border_radius: format!("{}px", self.border_radius),
            padding: format!("{}px", self.padding),
            font_size: format!("{}px", self.font_size),
            box_shadow,
        }
    }
}

fn default_tooltip_background() -> ColorSetting {
    ColorSetting::css("#ffffff")
}

fn default_tooltip_font_color() -> ColorSetting {
    ColorSetting::css("#19426C")
}

fn default_tooltip_border_color() -> ColorSetting {
    ColorSetting::css("#FFFFFF")
}

fn default_one() -> f64 {
    1.0
}

fn default_font_size() -> f64 {
    14.0
}

fn default_padding() -> f64 {
    8.0
}

fn default_border_radius() -> f64 {
    4.0
}

fn default_shadow_blur() -> f64 {
    4.0
}

fn default_shadow_opacity() -> f64 {
    0.2
}

fn default_true() -> bool {
    true
}

fn default_measure_label() -> String {
    "Value".to_string()
}

/// Resolved tooltip CSS values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TooltipStyle {
    pub background_color: String,
    pub color: String,
    pub border: String,
    pub border_radius: String,
    pub padding: String,
    pub font_size: String,
    pub box_shadow: String,
}

/// Apply an alpha channel to `#rrggbb`, `rgb(..)` or `rgba(..)`. Other forms pass through.
pub fn color_with_opacity(color: &str, opacity: f64) -> String {
    let color = color.trim();
    if let Some(inner) = color
        .strip_prefix("rgba(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels: Vec<&str> = inner.split(',').map(str::trim).collect();
        if channels.len() == 4 {
            return format!(
                "rgba({}, {}, {}, {})",
                channels[0], channels[1], channels[2], opacity
            );
        }
        return color.to_string();
    }
    if let Some(inner) = color
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return format!("rgba({}, {})", inner.trim(), opacity);
    }
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() == 6 && hex.is_ascii() {
            let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
            if let (Ok(r), Ok(g), Ok(b)) = (channel(0..2), channel(2..4), channel(4..6)) {
                return format!("rgba({}, {}, {}, {})", r, g, b, opacity);
            }
        }
    }
    color.to_string()
}

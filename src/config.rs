//! HUD configuration store
//!
//! Two records live here: the long-lived defaults ("appearance") and the
//! per-call overrides. `effective()` merges them field by field.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound for `duration` and `grace_time`, in seconds (one day).
pub const MAX_SECONDS: f64 = 86_400.0;

/// Seconds to a `Duration`, clamped to `0..=MAX_SECONDS`.
fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value.min(MAX_SECONDS)).unwrap_or(Duration::ZERO)
}

/// Errors raised at the configuration boundary.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("indicator colors must contain at least one color")]
    EmptyIndicatorColors,

    #[error("{field} must be a finite number of seconds up to {MAX_SECONDS} (got {value})")]
    InvalidSeconds { field: &'static str, value: f64 },

    #[error("view offset must be finite (got {0})")]
    InvalidOffset(f64),

    #[error("font size must be finite and positive (got {0})")]
    InvalidFont(f64),

    #[error("failed to parse appearance: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read appearance file: {0}")]
    Io(#[from] std::io::Error),
}

// ============ Colors ============

/// RGBA color, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const LIGHT_GRAY: Color = Color::rgba(2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Grayscale color with the given white level and alpha.
    pub const fn white(white: f32, alpha: f32) -> Self {
        Self::rgba(white, white, white, alpha)
    }
}

// ============ Style / mask ============

/// Panel colors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    /// White panel, black text.
    #[default]
    White,
    /// Black panel, white text.
    Black,
    /// Explicit colors. With `icon: None` glyphs keep their own coloring.
    Custom {
        background: Color,
        text: Color,
        icon: Option<Color>,
    },
}

impl Style {
    pub fn background_color(&self) -> Color {
        match self {
            Style::White => Color::WHITE,
            Style::Black => Color::BLACK,
            Style::Custom { background, .. } => *background,
        }
    }

    pub fn text_color(&self) -> Color {
        match self {
            Style::White => Color::BLACK,
            Style::Black => Color::WHITE,
            Style::Custom { text, .. } => *text,
        }
    }

    pub fn icon_color(&self) -> Option<Color> {
        match self {
            Style::Custom { icon, .. } => *icon,
            _ => None,
        }
    }
}

/// Backdrop drawn behind the panel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskType {
    Clear,
    White,
    #[default]
    Black,
    Custom(Color),
}

impl MaskType {
    pub fn mask_color(&self) -> Color {
        match self {
            MaskType::Clear => Color::CLEAR,
            MaskType::White => Color::white(1.0, 0.2),
            MaskType::Black => Color::white(0.0, 0.2),
            MaskType::Custom(color) => *color,
        }
    }
}

/// Two-color spinner gradient, kept for the deprecated
/// `set_activity_indicator_style` setters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorStyle {
    Black,
    White,
    Color(Color),
    GradationColor { head: Color, tail: Color },
}

impl IndicatorStyle {
    pub fn head_color(&self) -> Color {
        match self {
            IndicatorStyle::Black => Color::BLACK,
            IndicatorStyle::White => Color::WHITE,
            IndicatorStyle::Color(color) => *color,
            IndicatorStyle::GradationColor { head, .. } => *head,
        }
    }

    pub fn tail_color(&self) -> Color {
        match self {
            IndicatorStyle::Black => Color::LIGHT_GRAY,
            IndicatorStyle::White => Color::white(1.0, 0.3),
            IndicatorStyle::Color(color) => *color,
            IndicatorStyle::GradationColor { tail, .. } => *tail,
        }
    }

    pub fn colors(&self) -> Vec<Color> {
        vec![self.head_color(), self.tail_color()]
    }
}

/// Message label font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    /// Family name; `None` is the platform system font.
    #[serde(default)]
    pub family: Option<String>,
    pub size: f64,
    #[serde(default)]
    pub bold: bool,
}

impl Font {
    pub fn system(size: f64) -> Self {
        Self { family: None, size, bold: false }
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::system(13.0)
    }
}

// ============ Configuration ============

/// Fully populated configuration, as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub style: Style,
    pub mask_type: MaskType,
    pub indicator_colors: Vec<Color>,
    pub font: Font,
    /// Signed distance of the panel center from the surface center.
    pub view_offset: f64,
    /// Seconds before glyph, image and text HUDs hide themselves.
    pub duration: f64,
    /// Seconds to wait before presenting; `<= 0` presents immediately.
    pub grace_time: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            style: Style::White,
            mask_type: MaskType::Black,
            indicator_colors: vec![Color::BLACK, Color::LIGHT_GRAY],
            font: Font::default(),
            view_offset: 0.0,
            duration: 1.0,
            grace_time: 0.0,
        }
    }
}

impl Configuration {
    /// Parse and validate a JSON appearance document. Missing fields take
    /// the built-in defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Configuration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Setting::IndicatorColors(self.indicator_colors.clone()).validate()?;
        Setting::Font(self.font.clone()).validate()?;
        Setting::ViewOffset(self.view_offset).validate()?;
        Setting::Duration(self.duration).validate()?;
        Setting::GraceTime(self.grace_time).validate()
    }

    /// Delay before presenting, or `None` when the grace period is disabled.
    pub fn grace_period(&self) -> Option<Duration> {
        Some(seconds(self.grace_time)).filter(|d| !d.is_zero())
    }

    pub fn auto_dismiss_after(&self) -> Duration {
        seconds(self.duration)
    }

    fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::Style(v) => self.style = v,
            Setting::MaskType(v) => self.mask_type = v,
            Setting::IndicatorColors(v) => self.indicator_colors = v,
            Setting::Font(v) => self.font = v,
            Setting::ViewOffset(v) => self.view_offset = v,
            Setting::Duration(v) => self.duration = v,
            Setting::GraceTime(v) => self.grace_time = v,
        }
    }
}

/// Per-call overrides. `None` falls through to the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub style: Option<Style>,
    pub mask_type: Option<MaskType>,
    pub indicator_colors: Option<Vec<Color>>,
    pub font: Option<Font>,
    pub view_offset: Option<f64>,
    pub duration: Option<f64>,
    pub grace_time: Option<f64>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        *self == Overrides::default()
    }

    fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::Style(v) => self.style = Some(v),
            Setting::MaskType(v) => self.mask_type = Some(v),
            Setting::IndicatorColors(v) => self.indicator_colors = Some(v),
            Setting::Font(v) => self.font = Some(v),
            Setting::ViewOffset(v) => self.view_offset = Some(v),
            Setting::Duration(v) => self.duration = Some(v),
            Setting::GraceTime(v) => self.grace_time = Some(v),
        }
    }
}

/// One named configuration field with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Style(Style),
    MaskType(MaskType),
    IndicatorColors(Vec<Color>),
    Font(Font),
    ViewOffset(f64),
    Duration(f64),
    GraceTime(f64),
}

impl Setting {
    pub fn name(&self) -> &'static str {
        match self {
            Setting::Style(_) => "style",
            Setting::MaskType(_) => "mask_type",
            Setting::IndicatorColors(_) => "indicator_colors",
            Setting::Font(_) => "font",
            Setting::ViewOffset(_) => "view_offset",
            Setting::Duration(_) => "duration",
            Setting::GraceTime(_) => "grace_time",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Setting::IndicatorColors(colors) if colors.is_empty() => {
                Err(ConfigError::EmptyIndicatorColors)
            }
            Setting::Font(font) if !(font.size.is_finite() && font.size > 0.0) => {
                Err(ConfigError::InvalidFont(font.size))
            }
            Setting::ViewOffset(offset) if !offset.is_finite() => {
                Err(ConfigError::InvalidOffset(*offset))
            }
            Setting::Duration(value) if !(0.0..=MAX_SECONDS).contains(value) => {
                Err(ConfigError::InvalidSeconds { field: "duration", value: *value })
            }
            // negative grace is allowed and means "disabled"
            Setting::GraceTime(value) if !(value.is_finite() && *value <= MAX_SECONDS) => {
                Err(ConfigError::InvalidSeconds { field: "grace_time", value: *value })
            }
            _ => Ok(()),
        }
    }
}

// ============ Store ============

/// Defaults plus overrides for one HUD instance.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    defaults: Configuration,
    overrides: Overrides,
}

impl ConfigStore {
    pub fn new(defaults: Configuration) -> Self {
        Self { defaults, overrides: Overrides::default() }
    }

    pub fn defaults(&self) -> &Configuration {
        &self.defaults
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn set_default(&mut self, setting: Setting) -> Result<(), ConfigError> {
        setting.validate()?;
        self.defaults.apply(setting);
        Ok(())
    }

    pub fn set_override(&mut self, setting: Setting) -> Result<(), ConfigError> {
        setting.validate()?;
        self.overrides.apply(setting);
        Ok(())
    }

    /// Replace every default at once. Nothing changes if `defaults` is invalid.
    pub fn replace_defaults(&mut self, defaults: Configuration) -> Result<(), ConfigError> {
        defaults.validate()?;
        self.defaults = defaults;
        Ok(())
    }

    pub fn load_defaults_json(&mut self, json: &str) -> Result<(), ConfigError> {
        self.replace_defaults(Configuration::from_json(json)?)
    }

    pub fn load_defaults_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = std::fs::read_to_string(path)?;
        self.load_defaults_json(&json)
    }

    pub fn reset_overrides(&mut self) {
        self.overrides = Overrides::default();
    }

    pub fn effective(&self) -> Configuration {
        let o = &self.overrides;
        let d = &self.defaults;
        Configuration {
            style: o.style.unwrap_or(d.style),
            mask_type: o.mask_type.unwrap_or(d.mask_type),
            indicator_colors: o
                .indicator_colors
                .clone()
                .unwrap_or_else(|| d.indicator_colors.clone()),
            font: o.font.clone().unwrap_or_else(|| d.font.clone()),
            view_offset: o.view_offset.unwrap_or(d.view_offset),
            duration: o.duration.unwrap_or(d.duration),
            grace_time: o.grace_time.unwrap_or(d.grace_time),
        }
    }
}

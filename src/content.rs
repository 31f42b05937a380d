//! What the HUD is showing
//!
//! Public show calls map onto one of these descriptors; the state machine
//! only cares whether a descriptor hides itself after `duration`.

use std::sync::Arc;

/// Glyph drawn in place of the spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconType {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Encoded image bytes plus an optional display size.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Arc<[u8]>,
    size: Option<Size>,
}

impl Image {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into(), size: None }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }
}

/// Content descriptor for the current HUD.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Indeterminate spinner. Stays until dismissed.
    Loading { message: Option<String> },
    Glyph { icon: IconType, message: Option<String> },
    Image { image: Image, message: Option<String> },
    /// Message only, no spinner or glyph.
    Text { message: String },
}

impl Content {
    pub fn loading(message: Option<&str>) -> Self {
        Content::Loading { message: message.map(str::to_owned) }
    }

    pub fn glyph(icon: IconType, message: Option<&str>) -> Self {
        Content::Glyph { icon, message: message.map(str::to_owned) }
    }

    pub fn image(image: Image, message: Option<&str>) -> Self {
        Content::Image { image, message: message.map(str::to_owned) }
    }

    pub fn text(message: &str) -> Self {
        Content::Text { message: message.to_owned() }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Content::Loading { message }
            | Content::Glyph { message, .. }
            | Content::Image { message, .. } => message.as_deref(),
            Content::Text { message } => Some(message),
        }
    }

    /// Replace the message text, leaving the kind untouched.
    pub fn set_message(&mut self, text: &str) {
        match self {
            Content::Loading { message }
            | Content::Glyph { message, .. }
            | Content::Image { message, .. } => *message = Some(text.to_owned()),
            Content::Text { message } => *message = text.to_owned(),
        }
    }

    /// Everything except the spinner hides itself after `duration`.
    pub fn auto_dismisses(&self) -> bool {
        !matches!(self, Content::Loading { .. })
    }

    /// Indicator colors only apply to the spinner; renderers ignore them otherwise.
    pub fn shows_indicator(&self) -> bool {
        matches!(self, Content::Loading { .. })
    }

    pub fn icon(&self) -> Option<IconType> {
        match self {
            Content::Glyph { icon, .. } => Some(*icon),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Content::Loading { .. } => "loading",
            Content::Glyph { icon: IconType::Success, .. } => "success",
            Content::Glyph { icon: IconType::Info, .. } => "info",
            Content::Glyph { icon: IconType::Warning, .. } => "warning",
            Content::Glyph { icon: IconType::Error, .. } => "error",
            Content::Image { .. } => "image",
            Content::Text { .. } => "text",
        }
    }
}

//! progress-hud - transient status overlay core
//!
//! Shows, updates and dismisses a centered HUD (spinner, glyph, image or
//! message over a dimmed backdrop). Drawing is left to a platform
//! [`Renderer`]; this crate owns the configuration, the content descriptors
//! and the visibility state machine (grace period, auto-dismiss, re-entrant
//! show/dismiss).
//!
//! ```ignore
//! use progress_hud::{Configure, LogRenderer, ProgressHud};
//!
//! let hud = ProgressHud::new(LogRenderer::new());
//! hud.set_grace_time(0.3);
//! hud.show(Some("Loading"), None);
//! // ...
//! hud.show_success(Some("Done"));
//! ```

pub mod config;
pub mod content;
pub mod hud;
pub mod renderer;
pub mod shared;

pub use config::{Color, ConfigError, Configuration, Font, IndicatorStyle, MaskType, Setting, Style};
pub use content::{Content, IconType, Image, Size};
pub use hud::{Appearance, Completion, Configure, Phase, ProgressHud, Status, HIDE_ACK_TIMEOUT};
pub use renderer::{Ack, LogRenderer, RenderError, Renderer, Surface};

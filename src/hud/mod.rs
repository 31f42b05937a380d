//! HUD instance facade
//!
//! `ProgressHud` is the public surface: configuration setters, the show
//! family, `update` and `dismiss`. Each instance owns its own store and
//! driver task; instances never share state.

mod driver;
pub mod session;

pub use driver::{Status, HIDE_ACK_TIMEOUT};
pub use session::{Completion, Phase};

use crate::config::{
    Color, ConfigError, ConfigStore, Configuration, Font, IndicatorStyle, MaskType, Setting, Style,
};
use crate::content::{Content, IconType, Image, Size};
use crate::renderer::{Renderer, Surface};
use driver::{Driver, Request};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

// ============ Setters ============

/// Field setters shared by the override record (`ProgressHud`) and the
/// defaults (`Appearance`). Invalid values are logged and ignored.
pub trait Configure {
    fn set(&self, setting: Setting) -> &Self;

    fn set_style(&self, style: Style) -> &Self {
        self.set(Setting::Style(style))
    }

    fn set_mask_type(&self, mask_type: MaskType) -> &Self {
        self.set(Setting::MaskType(mask_type))
    }

    fn set_indicator_colors(&self, colors: Vec<Color>) -> &Self {
        self.set(Setting::IndicatorColors(colors))
    }

    fn set_font(&self, font: Font) -> &Self {
        self.set(Setting::Font(font))
    }

    /// Vertical offset of the panel center.
    fn set_view_offset(&self, offset: f64) -> &Self {
        self.set(Setting::ViewOffset(offset))
    }

    /// Seconds before success/info/warning/error, image and text HUDs hide.
    fn set_duration(&self, seconds: f64) -> &Self {
        self.set(Setting::Duration(seconds))
    }

    fn set_grace_time(&self, seconds: f64) -> &Self {
        self.set(Setting::GraceTime(seconds))
    }

    #[deprecated(note = "use `set_indicator_colors`")]
    fn set_activity_indicator_style(&self, style: IndicatorStyle) -> &Self {
        self.set_indicator_colors(style.colors())
    }

    #[deprecated(note = "renamed to `set_duration`")]
    fn set_deadline(&self, seconds: f64) -> &Self {
        self.set_duration(seconds)
    }
}

fn lock(store: &Mutex<ConfigStore>) -> MutexGuard<'_, ConfigStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle on an instance's default configuration.
pub struct Appearance<'a> {
    label: &'a str,
    store: &'a Mutex<ConfigStore>,
}

impl Appearance<'_> {
    pub fn get(&self) -> Configuration {
        lock(self.store).defaults().clone()
    }

    /// Replace the defaults from a JSON document; on error nothing changes.
    pub fn load_json(&self, json: &str) -> Result<(), ConfigError> {
        lock(self.store).load_defaults_json(json)?;
        log::info!("[Hud {}] Appearance loaded", self.label);
        Ok(())
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        lock(self.store).load_defaults_file(path)?;
        log::info!("[Hud {}] Appearance loaded from {}", self.label, path.display());
        Ok(())
    }
}

impl Configure for Appearance<'_> {
    fn set(&self, setting: Setting) -> &Self {
        let name = setting.name();
        if let Err(e) = lock(self.store).set_default(setting) {
            log::warn!("[Hud {}] Ignoring default {}: {}", self.label, name, e);
        }
        self
    }
}

// ============ Facade ============

pub struct ProgressHud {
    label: String,
    store: Mutex<ConfigStore>,
    surface: OnceLock<Surface>,
    requests: mpsc::UnboundedSender<Request>,
    status: watch::Receiver<Status>,
}

impl ProgressHud {
    /// Create a HUD whose driver runs on the ambient Tokio runtime.
    ///
    /// Panics when called outside a runtime, like `tokio::spawn`.
    pub fn new<R: Renderer>(renderer: R) -> Self {
        Self::with_handle(renderer, &Handle::current())
    }

    pub fn with_handle<R: Renderer>(renderer: R, runtime: &Handle) -> Self {
        let label = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(Status::default());

        let driver = Driver::new(label.clone(), renderer, ack_tx, status_tx);
        runtime.spawn(driver.run(request_rx, ack_rx));

        Self {
            label,
            store: Mutex::new(ConfigStore::default()),
            surface: OnceLock::new(),
            requests,
            status,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn appearance(&self) -> Appearance<'_> {
        Appearance { label: &self.label, store: &self.store }
    }

    /// Clear every override so the defaults apply again.
    pub fn reset_styles(&self) -> &Self {
        lock(&self.store).reset_overrides();
        self
    }

    /// Defaults merged with the current overrides.
    pub fn effective(&self) -> Configuration {
        lock(&self.store).effective()
    }

    /// Bind the presentation anchor. Only the first call takes effect.
    pub fn show_on(&self, surface: Surface) -> &Self {
        match self.surface.set(surface.clone()) {
            Ok(()) => self.send(Request::Attach(surface)),
            Err(_) => log::debug!("[Hud {}] show_on({}) ignored, already bound", self.label, surface.label()),
        }
        self
    }

    // ============ Show / update / dismiss ============

    /// Loading spinner. Stays until `dismiss`.
    pub fn show(&self, message: Option<&str>, completion: Option<Completion>) {
        self.show_content(Content::loading(message), completion);
    }

    pub fn show_success(&self, message: Option<&str>) {
        self.show_content(Content::glyph(IconType::Success, message), None);
    }

    pub fn show_info(&self, message: Option<&str>) {
        self.show_content(Content::glyph(IconType::Info, message), None);
    }

    pub fn show_warning(&self, message: Option<&str>) {
        self.show_content(Content::glyph(IconType::Warning, message), None);
    }

    pub fn show_error(&self, message: Option<&str>) {
        self.show_content(Content::glyph(IconType::Error, message), None);
    }

    /// Image in place of the spinner, hidden after `duration`.
    pub fn show_image(&self, image: Image, size: Option<Size>, message: Option<&str>) {
        let image = match size {
            Some(size) => image.with_size(size),
            None => image,
        };
        self.show_content(Content::image(image, message), None);
    }

    /// Message-only HUD, hidden after `duration`.
    pub fn show_message(&self, message: &str) {
        self.show_content(Content::text(message), None);
    }

    /// Show an arbitrary descriptor. The effective configuration is
    /// snapshotted now; later setter calls do not touch this HUD.
    pub fn show_content(&self, content: Content, completion: Option<Completion>) {
        let config = self.effective();
        self.send(Request::Show { content, config, completion });
    }

    /// Replace the message of the current HUD. Ignored while hidden.
    pub fn update(&self, message: &str) {
        self.send(Request::Update(message.to_owned()));
    }

    pub fn dismiss(&self, completion: Option<Completion>) {
        if let Err(mpsc::error::SendError(Request::Dismiss(Some(completion)))) =
            self.requests.send(Request::Dismiss(completion))
        {
            // no driver means nothing is on screen
            completion();
        }
    }

    // ============ State ============

    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.status.borrow().phase
    }

    pub fn is_visible(&self) -> bool {
        self.status.borrow().visible
    }

    /// Resolves once every request issued so far, every delivered renderer
    /// acknowledgement and every timer already due has been processed.
    pub async fn settle(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Request::Settle(tx));
        let _ = rx.await;
    }

    fn send(&self, request: Request) {
        if self.requests.send(request).is_err() {
            log::warn!("[Hud {}] Driver is gone, request dropped", self.label);
        }
    }
}

impl Configure for ProgressHud {
    fn set(&self, setting: Setting) -> &Self {
        let name = setting.name();
        if let Err(e) = lock(&self.store).set_override(setting) {
            log::warn!("[Hud {}] Ignoring {}: {}", self.label, name, e);
        }
        self
    }
}

impl std::fmt::Debug for ProgressHud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHud")
            .field("label", &self.label)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

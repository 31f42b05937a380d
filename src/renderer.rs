//! Renderer adapter
//!
//! The platform side of the HUD: draws the backdrop and panel, runs the
//! show/hide animations. The core only tells it what to do and waits for an
//! [`Ack`].

use crate::config::Configuration;
use crate::content::Content;
use crate::hud::session::AckId;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("renderer failed: {0}")]
    Failed(String),

    #[error("acknowledgement dropped without being resolved")]
    Dropped,

    #[error("acknowledgement not resolved in time")]
    TimedOut,
}

/// Presentation anchor (window / view controller label) bound via `show_on`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Surface(pub String);

impl Surface {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

pub(crate) struct AckEvent {
    pub id: AckId,
    pub result: Result<(), RenderError>,
}

/// Acknowledgement token for one renderer instruction.
///
/// Resolve it with [`Ack::done`] or [`Ack::fail`], from any thread. Dropping
/// it unresolved counts as a failure.
#[must_use = "an unresolved Ack resets the HUD"]
pub struct Ack {
    id: AckId,
    tx: Option<UnboundedSender<AckEvent>>,
}

impl Ack {
    pub(crate) fn new(id: AckId, tx: UnboundedSender<AckEvent>) -> Self {
        Self { id, tx: Some(tx) }
    }

    pub fn id(&self) -> AckId {
        self.id
    }

    pub fn done(mut self) {
        self.resolve(Ok(()));
    }

    pub fn fail(mut self, err: RenderError) {
        self.resolve(Err(err));
    }

    fn resolve(&mut self, result: Result<(), RenderError>) {
        if let Some(tx) = self.tx.take() {
            // driver gone means the HUD was dropped; nothing left to tell
            let _ = tx.send(AckEvent { id: self.id, result });
        }
    }
}

impl Drop for Ack {
    fn drop(&mut self) {
        self.resolve(Err(RenderError::Dropped));
    }
}

impl std::fmt::Debug for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ack")
            .field("id", &self.id)
            .field("resolved", &self.tx.is_none())
            .finish()
    }
}

/// Implemented once per platform. All methods run on the HUD's driver task.
pub trait Renderer: Send + 'static {
    /// Bind the presentation anchor. Called at most once.
    fn attach(&mut self, _surface: &Surface) {}

    /// Build the overlay and play the entrance animation.
    fn present(&mut self, config: &Configuration, content: &Content, ack: Ack);

    /// Swap content on an overlay that is already on screen, without re-entry.
    fn update_content(&mut self, config: &Configuration, content: &Content, ack: Ack);

    /// Play the hide animation and tear the overlay down.
    ///
    /// An ack still unresolved after [`HIDE_ACK_TIMEOUT`](crate::hud::HIDE_ACK_TIMEOUT)
    /// is treated as failed: the HUD resets to hidden and resolving it later
    /// has no effect.
    fn hide(&mut self, ack: Ack);
}

/// Headless renderer: logs every instruction and acknowledges immediately.
#[derive(Debug, Default)]
pub struct LogRenderer {
    surface: Option<Surface>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn surface_label(&self) -> &str {
        self.surface.as_ref().map(Surface::label).unwrap_or("key-window")
    }
}

impl Renderer for LogRenderer {
    fn attach(&mut self, surface: &Surface) {
        log::info!("[LogRenderer] Attached to {}", surface.label());
        self.surface = Some(surface.clone());
    }

    fn present(&mut self, config: &Configuration, content: &Content, ack: Ack) {
        log::info!(
            "[LogRenderer] Present {} on {} (message={:?}, style={:?}, mask={:?}, offset={})",
            content.kind(),
            self.surface_label(),
            content.message(),
            config.style,
            config.mask_type,
            config.view_offset
        );
        ack.done();
    }

    fn update_content(&mut self, _config: &Configuration, content: &Content, ack: Ack) {
        log::info!(
            "[LogRenderer] Update {} (message={:?})",
            content.kind(),
            content.message()
        );
        ack.done();
    }

    fn hide(&mut self, ack: Ack) {
        log::info!("[LogRenderer] Hide");
        ack.done();
    }
}

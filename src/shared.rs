//! Process-wide HUD
//!
//! One default instance, installed once at startup, for call sites that do
//! not want to carry a `ProgressHud` around. It runs on its own runtime so
//! it works from plain threads too.

use crate::content::{Image, Size};
use crate::hud::{Appearance, Completion, ProgressHud};
use crate::renderer::Renderer;
use std::sync::{LazyLock, OnceLock};

static RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("hud-main")
        .enable_time()
        .build()
        .expect("failed to build HUD runtime")
});

static SHARED: OnceLock<ProgressHud> = OnceLock::new();

/// Install the shared HUD. Only the first renderer is kept.
pub fn install<R: Renderer>(renderer: R) -> &'static ProgressHud {
    if let Some(hud) = SHARED.get() {
        log::warn!("[Hud] Shared HUD already installed, renderer ignored");
        return hud;
    }
    SHARED.get_or_init(|| {
        let hud = ProgressHud::with_handle(renderer, RUNTIME.handle());
        log::info!("[Hud] Shared HUD installed ({})", hud.label());
        hud
    })
}

pub fn hud() -> Option<&'static ProgressHud> {
    let hud = SHARED.get();
    if hud.is_none() {
        log::warn!("[Hud] Shared HUD used before install()");
    }
    hud
}

/// Block the calling thread until the shared HUD has processed everything
/// issued so far. Must not be called from inside an async context.
pub fn settle() {
    if let Some(hud) = SHARED.get() {
        RUNTIME.block_on(hud.settle());
    }
}

// ============ Call sites ============

pub fn appearance() -> Option<Appearance<'static>> {
    hud().map(ProgressHud::appearance)
}

pub fn reset_styles() {
    if let Some(hud) = hud() {
        hud.reset_styles();
    }
}

pub fn show(message: Option<&str>, completion: Option<Completion>) {
    if let Some(hud) = hud() {
        hud.show(message, completion);
    }
}

pub fn show_success(message: Option<&str>) {
    if let Some(hud) = hud() {
        hud.show_success(message);
    }
}

pub fn show_info(message: Option<&str>) {
    if let Some(hud) = hud() {
        hud.show_info(message);
    }
}

pub fn show_warning(message: Option<&str>) {
    if let Some(hud) = hud() {
        hud.show_warning(message);
    }
}

pub fn show_error(message: Option<&str>) {
    if let Some(hud) = hud() {
        hud.show_error(message);
    }
}

pub fn show_image(image: Image, size: Option<Size>, message: Option<&str>) {
    if let Some(hud) = hud() {
        hud.show_image(image, size, message);
    }
}

pub fn show_message(message: &str) {
    if let Some(hud) = hud() {
        hud.show_message(message);
    }
}

pub fn update(message: &str) {
    if let Some(hud) = hud() {
        hud.update(message);
    }
}

pub fn dismiss(completion: Option<Completion>) {
    match hud() {
        Some(hud) => hud.dismiss(completion),
        // nothing installed, so nothing is on screen
        None => completion.into_iter().for_each(|c| c()),
    }
}

pub fn is_visible() -> bool {
    SHARED.get().is_some_and(ProgressHud::is_visible)
}

//! HUD Demo - walks the shared HUD through its states against the log renderer.
//!
//! Run with: `cargo run --bin hud_demo`
//!
//! - HUD_APPEARANCE=path/to/appearance.json loads default appearance
//! - RUST_LOG=debug shows timer and supersede decisions

use progress_hud::{shared, Configure, Image, LogRenderer, MaskType, Size, Style, Surface};
use std::time::Duration;

fn pause(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let hud = shared::install(LogRenderer::new());
    hud.show_on(Surface::new("demo-window"));

    if let Ok(path) = std::env::var("HUD_APPEARANCE") {
        if let Err(e) = hud.appearance().load_file(&path) {
            log::error!("[Demo] Failed to load appearance {}: {}", path, e);
        }
    }

    // fast operation: finishes inside the grace period, nothing is presented
    log::info!("[Demo] === Grace period ===");
    hud.set_grace_time(0.4);
    shared::show(Some("Quick fetch..."), None);
    pause(100);
    shared::dismiss(Some(Box::new(|| log::info!("[Demo] Quick fetch done, never shown"))));
    pause(100);

    // slow operation: grace elapses, the spinner appears and is updated in place
    log::info!("[Demo] === Loading ===");
    shared::show(
        Some("Downloading..."),
        Some(Box::new(|| log::info!("[Demo] Spinner on screen"))),
    );
    pause(600);
    shared::update("Downloading 60%");
    pause(300);
    hud.reset_styles();

    log::info!("[Demo] === Glyphs ===");
    hud.set_style(Style::Black).set_duration(0.8);
    shared::show_success(Some("Downloaded"));
    pause(1200);

    hud.set_mask_type(MaskType::Clear);
    shared::show_error(None);
    pause(300);
    shared::show_warning(Some("Superseded the error"));
    pause(1200);
    hud.reset_styles();

    log::info!("[Demo] === Image / message ===");
    let image = Image::new(vec![0u8; 16]);
    shared::show_image(image, Some(Size::new(48.0, 48.0)), Some("Avatar updated"));
    pause(400);
    shared::show_message("Message only");
    pause(1200);

    // dismiss while already hidden still calls back
    shared::dismiss(Some(Box::new(|| log::info!("[Demo] Dismiss while hidden completed"))));
    shared::settle();

    log::info!("[Demo] Finished (visible={})", shared::is_visible());
}

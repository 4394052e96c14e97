use crate::{
    core::message::{GuiToPlayerTx, PlayerToGuiRx},
    ui::app::PianolaApp,
};
use eframe::NativeOptions;
use egui::Theme;
use std::path::PathBuf;

pub mod app;
mod font;
mod keyboard;
mod state;
mod timeline;
mod transport_bar;

pub fn spawn_ui_thread(
    tx: GuiToPlayerTx,
    rx: PlayerToGuiRx,
    session_path: Option<PathBuf>,
) -> Result<(), eframe::Error> {
    eframe::run_native(
        "Pianola",
        get_native_options(),
        Box::new(move |cc| {
            cc.egui_ctx.set_fonts(font::get_fonts());
            cc.egui_ctx.set_theme(Theme::Dark);
            Ok(Box::new(PianolaApp::new(tx, rx, session_path, cc)))
        }),
    )
}

fn get_native_options() -> NativeOptions {
    let mut options = NativeOptions::default();
    options.viewport = options
        .viewport
        .with_inner_size([1280.0, 800.0])
        .with_min_inner_size([800.0, 500.0]);
    options
}

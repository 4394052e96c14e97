use crate::core::message::GuiToPlayerMsg;
use rtrb::RingBuffer;
use std::path::PathBuf;

mod audio;
mod config;
mod core;
mod error;
mod ui;
pub mod utils;

fn main() {
    env_logger::init();

    let session_path = std::env::args().nth(1).map(PathBuf::from);

    // Create channels
    let (to_gui_tx, from_player_rx) = crossbeam::channel::unbounded();
    let (to_player_tx, from_gui_rx) = RingBuffer::<GuiToPlayerMsg>::new(256);

    // Audio thread: owns the output stream, follows transport commands
    audio::spawn_audio_thread(to_gui_tx, from_gui_rx);
    // Ui thread (main thread). Opens the app window
    ui::spawn_ui_thread(to_player_tx, from_player_rx, session_path).unwrap();
}

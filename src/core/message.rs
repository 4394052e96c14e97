use crate::audio::decode::AudioBuffer;
use std::sync::Arc;

/// Commands from the UI thread to the audio player. The transport is the
/// single owner of playback state; the player follows these messages.
pub enum GuiToPlayerMsg {
    SetBuffer(Arc<AudioBuffer>),
    Play,
    Pause,
    Stop,
    SeekTo(f32),
    SetRate(f32),
}

pub enum PlayerToGuiMsg {
    /// Source position in seconds, reported once per audio callback.
    PlaybackPos(f32),
}

pub type GuiToPlayerTx = rtrb::Producer<GuiToPlayerMsg>;
pub type GuiToPlayerRx = rtrb::Consumer<GuiToPlayerMsg>;
pub type PlayerToGuiTx = crossbeam::channel::Sender<PlayerToGuiMsg>;
pub type PlayerToGuiRx = crossbeam::channel::Receiver<PlayerToGuiMsg>;

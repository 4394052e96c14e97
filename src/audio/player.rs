use crate::{
    audio::decode::AudioBuffer,
    core::message::{GuiToPlayerMsg, GuiToPlayerRx, PlayerToGuiMsg, PlayerToGuiTx},
};
use std::sync::Arc;

/// The audio-thread half of the transport. It never decides anything about
/// playback on its own: it follows the command ring buffer and reports its
/// source position back so the UI clock can check for drift.
pub struct PlayerBackend {
    to_gui_tx: PlayerToGuiTx,
    from_gui_rx: GuiToPlayerRx,
    out_sample_rate: usize,

    buffer: Option<Arc<AudioBuffer>>,
    /// Source playhead in frames; fractional because of rate/resampling.
    playhead: f64,
    playing: bool,
    rate: f64,
}

impl PlayerBackend {
    pub fn new(to_gui_tx: PlayerToGuiTx, from_gui_rx: GuiToPlayerRx, out_sample_rate: usize) -> Self {
        Self {
            to_gui_tx,
            from_gui_rx,
            out_sample_rate,
            buffer: None,
            playhead: 0.0,
            playing: false,
            rate: 1.0,
        }
    }

    /// Fill one interleaved stereo output buffer. Runs on the cpal callback.
    pub fn mix_audio(&mut self, output: &mut [f32]) {
        self.handle_messages();
        output.fill(0.0);

        let Some(buffer) = self.buffer.as_ref() else {
            return;
        };
        if !self.playing {
            return;
        }

        let frames = buffer.frames();
        // rate change keeps pitch: we simply step faster through the source
        let step = self.rate * buffer.sample_rate as f64 / self.out_sample_rate as f64;

        for frame in output.chunks_exact_mut(2) {
            if self.playhead >= (frames - 1) as f64 {
                self.playing = false;
                break;
            }
            let index = self.playhead as usize;
            let frac = (self.playhead - index as f64) as f32;
            frame[0] = lerp(buffer.left[index], buffer.left[index + 1], frac);
            frame[1] = lerp(buffer.right[index], buffer.right[index + 1], frac);
            self.playhead += step;
        }

        let _ = self.to_gui_tx.send(PlayerToGuiMsg::PlaybackPos(
            (self.playhead / buffer.sample_rate as f64) as f32,
        ));
    }

    fn handle_messages(&mut self) {
        while let Ok(msg) = self.from_gui_rx.pop() {
            match msg {
                GuiToPlayerMsg::SetBuffer(buffer) => {
                    self.buffer = Some(buffer);
                    self.playhead = 0.0;
                    self.playing = false;
                }
                GuiToPlayerMsg::Play => {
                    self.playing = true;
                }
                GuiToPlayerMsg::Pause => {
                    self.playing = false;
                }
                GuiToPlayerMsg::Stop => {
                    self.playing = false;
                    self.playhead = 0.0;
                }
                GuiToPlayerMsg::SeekTo(seconds) => {
                    if let Some(buffer) = self.buffer.as_ref() {
                        let target = seconds.max(0.0) as f64 * buffer.sample_rate as f64;
                        self.playhead = target.min(buffer.frames().saturating_sub(1) as f64);
                    }
                }
                GuiToPlayerMsg::SetRate(rate) => {
                    if rate > 0.0 {
                        self.rate = rate as f64;
                    }
                }
            }
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(frames: usize) -> (PlayerBackend, rtrb::Producer<GuiToPlayerMsg>) {
        let (gui_tx, gui_rx) = rtrb::RingBuffer::new(64);
        let (player_tx, _player_rx) = crossbeam::channel::unbounded();
        let player = PlayerBackend::new(player_tx, gui_rx, 48000);
        let mut tx = gui_tx;
        let buffer = Arc::new(AudioBuffer {
            left: (0..frames).map(|i| i as f32).collect(),
            right: vec![0.5; frames],
            sample_rate: 48000,
        });
        let _ = tx.push(GuiToPlayerMsg::SetBuffer(buffer));
        (player, tx)
    }

    #[test]
    fn test_silence_until_play() {
        let (mut player, mut tx) = setup(4096);
        let mut out = vec![1.0; 256];
        player.mix_audio(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        let _ = tx.push(GuiToPlayerMsg::Play);
        player.mix_audio(&mut out);
        // ramp source: the left channel is no longer silent
        assert!(out.chunks_exact(2).skip(1).any(|f| f[0] != 0.0));
    }

    #[test]
    fn test_seek_repositions_playhead() {
        let (mut player, mut tx) = setup(48000 * 2);
        let _ = tx.push(GuiToPlayerMsg::SeekTo(1.0));
        let _ = tx.push(GuiToPlayerMsg::Play);
        let mut out = vec![0.0; 2];
        player.mix_audio(&mut out);
        // one second in, the ramp is at 48000
        assert_eq!(out[0], 48000.0);
    }

    #[test]
    fn test_rate_doubles_the_step() {
        let (mut player, mut tx) = setup(48000);
        let _ = tx.push(GuiToPlayerMsg::SetRate(2.0));
        let _ = tx.push(GuiToPlayerMsg::Play);
        let mut out = vec![0.0; 8];
        player.mix_audio(&mut out);
        // frames 0, 2, 4, 6 of the ramp
        assert_eq!(out[0], 0.0);
        assert_eq!(out[2], 2.0);
        assert_eq!(out[4], 4.0);
        assert_eq!(out[6], 6.0);
    }

    #[test]
    fn test_playback_stops_at_buffer_end() {
        let (mut player, mut tx) = setup(16);
        let _ = tx.push(GuiToPlayerMsg::Play);
        let mut out = vec![1.0; 64];
        player.mix_audio(&mut out);
        // tail past the buffer stays silent
        assert_eq!(out[62], 0.0);
        assert_eq!(out[63], 0.0);
    }
}

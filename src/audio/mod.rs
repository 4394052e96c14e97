use crate::core::message::{GuiToPlayerRx, PlayerToGuiTx};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::BufferSize;
use std::thread;

pub mod decode;
pub mod player;

use player::PlayerBackend;

/// Spawn the audio thread: it owns the cpal output stream (and through it
/// the `PlayerBackend`) for the lifetime of the process.
pub fn spawn_audio_thread(to_gui_tx: PlayerToGuiTx, from_gui_rx: GuiToPlayerRx) {
    thread::spawn(move || {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .expect("no output device available");
        let sample_rate = device
            .default_output_config()
            .expect("no output config")
            .sample_rate();

        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate,
            buffer_size: BufferSize::Default,
        };

        let mut backend = PlayerBackend::new(to_gui_tx, from_gui_rx, sample_rate.0 as usize);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| backend.mix_audio(data),
                move |err| {
                    log::error!("audio stream error: {err}");
                },
                None,
            )
            .expect("failed to build output stream");

        stream.play().expect("failed to start output stream");

        // the stream must outlive the process; keep the owning thread parked
        loop {
            thread::park();
        }
    });
}

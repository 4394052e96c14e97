use crate::error::LoadError;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded recording, planar stereo. Mono sources are mirrored into
/// both channels so the player never branches on channel count.
#[derive(Debug)]
pub struct AudioBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Decode a whole audio file up front. This is the one awaited load of a
/// session; a failure here is terminal and bubbles to the UI error state.
pub fn decode_file(path: &Path) -> Result<AudioBuffer, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| LoadError::AudioDecode(format!("probe failed: {err}")))?;
    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| LoadError::AudioDecode("no audio track".to_string()))?;
        (track.id, track.codec_params.clone())
    };
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| LoadError::AudioDecode("missing sample rate".to_string()))?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|err| LoadError::AudioDecode(format!("no decoder: {err}")))?;

    let mut left = Vec::new();
    let mut right = Vec::new();

    // any packet error past this point is end-of-stream
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                let stereo = audio_buf.spec().channels.count() > 1;
                normalize_channel(&audio_buf, &mut left, 0);
                if stereo {
                    normalize_channel(&audio_buf, &mut right, 1);
                }
            }
            Err(err) => log::warn!("skipping undecodable packet: {err}"),
        }
    }

    if left.is_empty() {
        return Err(LoadError::AudioDecode("no decodable frames".to_string()));
    }
    if right.is_empty() {
        right = left.clone();
    }

    Ok(AudioBuffer {
        left,
        right,
        sample_rate,
    })
}

/// Convert one channel of a decoded packet to normalized f32.
fn normalize_channel(audio_buf: &AudioBufferRef, out: &mut Vec<f32>, channel: usize) {
    match audio_buf {
        AudioBufferRef::U8(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| (sample as f32 - 128.0) / 128.0),
            );
        }
        AudioBufferRef::U16(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| (sample as f32 - 32768.0) / 32768.0),
            );
        }
        AudioBufferRef::U24(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| (sample.inner() as f32 - 8_388_608.0) / 8_388_608.0),
            );
        }
        AudioBufferRef::U32(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| (sample as f32 - 2_147_483_648.0) / 2_147_483_648.0),
            );
        }
        AudioBufferRef::S8(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| sample as f32 / -(i8::MIN as f32)),
            );
        }
        AudioBufferRef::S16(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| sample as f32 / -(i16::MIN as f32)),
            );
        }
        AudioBufferRef::S24(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| sample.inner() as f32 / -(1 << 23) as f32),
            );
        }
        AudioBufferRef::S32(buf) => {
            out.extend(
                buf.chan(channel)
                    .iter()
                    .map(|&sample| sample as f32 / -(i32::MIN as f32)),
            );
        }
        AudioBufferRef::F32(buf) => {
            out.extend(buf.chan(channel));
        }
        AudioBufferRef::F64(buf) => {
            out.extend(buf.chan(channel).iter().map(|&sample| sample as f32));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_frames() {
        let buffer = AudioBuffer {
            left: vec![0.0; 44100],
            right: vec![0.0; 44100],
            sample_rate: 44100,
        };
        assert_eq!(buffer.duration_secs(), 1.0);
        assert_eq!(buffer.frames(), 44100);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = decode_file(Path::new("/nonexistent/take.wav")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}

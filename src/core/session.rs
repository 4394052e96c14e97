use crate::{
    audio::decode::{self, AudioBuffer},
    core::{chord::ChordSpan, note::NoteStore},
    error::LoadError,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

/// One practice session record, as stored by the backend. This core only
/// reads it: the audio/midi paths and the saved chord progression.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Session {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub audio_path: PathBuf,
    pub midi_path: PathBuf,
    #[serde(default)]
    pub chords: Vec<ChordSpan>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().into()
}

impl Session {
    /// Read a session document, resolving relative media paths against the
    /// document's own directory.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut session: Session =
            serde_json::from_str(&json).map_err(|err| LoadError::Session(err.to_string()))?;
        if let Some(dir) = path.parent() {
            if session.audio_path.is_relative() {
                session.audio_path = dir.join(&session.audio_path);
            }
            if session.midi_path.is_relative() {
                session.midi_path = dir.join(&session.midi_path);
            }
        }
        Ok(session)
    }
}

/// Everything the transport needs before it becomes usable.
pub struct LoadedMedia {
    pub audio: Arc<AudioBuffer>,
    pub notes: NoteStore,
}

pub type MediaResult = Result<LoadedMedia, LoadError>;

/// Decode the audio and parse the midi off the UI thread. One shot, no
/// retries; either failure is terminal for the session.
pub fn spawn_media_loader(session: &Session) -> crossbeam::channel::Receiver<MediaResult> {
    let (tx, rx) = crossbeam::channel::bounded(1);
    let audio_path = session.audio_path.clone();
    let midi_path = session.midi_path.clone();
    thread::spawn(move || {
        let result = load_media(&audio_path, &midi_path);
        let _ = tx.send(result);
    });
    rx
}

fn load_media(audio_path: &Path, midi_path: &Path) -> MediaResult {
    let audio = decode::decode_file(audio_path)?;
    let notes = NoteStore::from_file(midi_path)?;
    log::info!(
        "loaded session media: {:.1}s audio, {} notes",
        audio.duration_secs(),
        notes.len()
    );
    Ok(LoadedMedia {
        audio: Arc::new(audio),
        notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_parses_with_defaults() {
        let session: Session = serde_json::from_str(
            r#"{"audio_path": "take.mp3", "midi_path": "take.mid"}"#,
        )
        .unwrap();
        assert!(!session.id.is_empty());
        assert!(session.chords.is_empty());
        assert_eq!(session.audio_path, PathBuf::from("take.mp3"));
    }

    #[test]
    fn test_missing_fields_are_an_error() {
        assert!(serde_json::from_str::<Session>(r#"{"name": "x"}"#).is_err());
    }

    #[test]
    fn test_load_surfaces_io_failure() {
        let err = Session::load(Path::new("/nonexistent/session.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}

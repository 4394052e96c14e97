use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures while loading a practice session. Surfaced to the UI as a
/// persistent error state; the user has to retry explicitly.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed midi file: {0}")]
    MidiParse(#[from] midly::Error),
    #[error("audio decode failed: {0}")]
    AudioDecode(String),
    #[error("invalid session file: {0}")]
    Session(String),
}

/// Returned by a note event listener. Logged by the scheduler and contained;
/// one failing listener never stops playback or the remaining listeners.
#[derive(Error, Debug)]
#[error("note listener failed: {0}")]
pub struct ScheduleError(pub String);

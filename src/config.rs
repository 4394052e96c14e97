use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const DEFAULT_POSITION: f32 = 0.0;
pub const DEFAULT_ZOOM: f32 = 1.0;

/// User preferences persisted between runs. Everything in here is a
/// best-effort cache: a missing or corrupt file yields the defaults and is
/// never surfaced as an error.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Prefs {
    pub last_position: f32,
    pub zoom_level: f32,
    pub show_chord_notes: bool,
    pub show_note_degrees: bool,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            last_position: DEFAULT_POSITION,
            zoom_level: DEFAULT_ZOOM,
            show_chord_notes: true,
            show_note_degrees: false,
        }
    }
}

impl Prefs {
    /// Clamp values that deserialized but make no sense (NaN position from a
    /// truncated write, zoom below fit-to-width).
    fn sanitized(mut self) -> Self {
        if !self.last_position.is_finite() || self.last_position < 0.0 {
            self.last_position = DEFAULT_POSITION;
        }
        if !self.zoom_level.is_finite() || self.zoom_level < 1.0 {
            self.zoom_level = DEFAULT_ZOOM;
        }
        self
    }
}

fn prefs_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "Pianola", "Pianola")
        .map(|proj_dirs| proj_dirs.config_dir().join("prefs.json"))
}

pub fn load_prefs() -> Prefs {
    let Some(path) = prefs_path() else {
        return Prefs::default();
    };
    match fs::read_to_string(&path) {
        Ok(json) => match serde_json::from_str::<Prefs>(&json) {
            Ok(prefs) => prefs.sanitized(),
            Err(err) => {
                log::warn!("ignoring corrupt prefs file: {err}");
                Prefs::default()
            }
        },
        Err(_) => Prefs::default(),
    }
}

pub fn save_prefs(prefs: &Prefs) {
    let Some(path) = prefs_path() else { return };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    match serde_json::to_string(prefs) {
        Ok(json) => {
            if let Err(err) = fs::write(&path, json) {
                log::warn!("failed to write prefs: {err}");
            }
        }
        Err(err) => log::warn!("failed to serialize prefs: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_falls_back_to_defaults() {
        let prefs = Prefs {
            last_position: f32::NAN,
            zoom_level: 0.2,
            ..Prefs::default()
        };
        let prefs = prefs.sanitized();
        assert_eq!(prefs.last_position, DEFAULT_POSITION);
        assert_eq!(prefs.zoom_level, DEFAULT_ZOOM);
    }

    #[test]
    fn test_corrupt_json_yields_defaults() {
        let parsed = serde_json::from_str::<Prefs>("{not json");
        assert!(parsed.is_err());
        // load_prefs maps this case to the defaults
        assert_eq!(
            serde_json::from_str::<Prefs>("{}").unwrap(),
            Prefs::default()
        );
    }

    #[test]
    fn test_partial_prefs_fill_in_defaults() {
        let prefs: Prefs = serde_json::from_str(r#"{"zoom_level": 3.5}"#).unwrap();
        assert_eq!(prefs.zoom_level, 3.5);
        assert_eq!(prefs.last_position, DEFAULT_POSITION);
        assert!(prefs.show_chord_notes);
    }
}

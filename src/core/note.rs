use crate::error::LoadError;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::path::Path;

pub const DEFAULT_TEMPO_US: f64 = 500_000.0; // 120 bpm

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
    Unassigned,
}

impl Hand {
    pub fn cycled(self) -> Self {
        match self {
            Hand::Unassigned => Hand::Left,
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Unassigned,
        }
    }
}

/// Identifier of a note within one loaded file. Notes are created in bulk at
/// parse time and never reordered, so the id doubles as a dense index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub midi: u8,
    /// Start in seconds from the beginning of the piece.
    pub start: f32,
    pub duration: f32,
    /// Normalized 0..=1.
    pub velocity: f32,
    pub hand: Hand,
}

impl Note {
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    pub fn contains(&self, t: f32) -> bool {
        self.start <= t && t < self.end()
    }
}

/// All notes of the loaded piece, ordered by start time. Replaced wholesale
/// when a new file is loaded; only the per-note hand assignment is mutable.
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: Vec<Note>,
    last_end: f32,
}

impl NoteStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let smf = Smf::parse(bytes)?;
        Ok(Self::from_smf(&smf))
    }

    pub fn from_smf(smf: &Smf) -> Self {
        let tempo_map = TempoMap::from_smf(smf);
        let mut notes = Vec::new();

        for track in &smf.tracks {
            let mut tick = 0u32;
            // one open slot per key; a retriggered key closes the old note
            let mut open: [Option<(u32, u8)>; 128] = [None; 128];

            for event in track {
                tick = tick.saturating_add(event.delta.as_int());
                let TrackEventKind::Midi { message, .. } = event.kind else {
                    continue;
                };
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        let slot = key.as_int() as usize;
                        if let Some((start_tick, velocity)) = open[slot].take() {
                            push_note(&mut notes, &tempo_map, key.as_int(), start_tick, tick, velocity);
                        }
                        open[slot] = Some((tick, vel.as_int()));
                    }
                    // running-status note-off, or the real thing
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let slot = key.as_int() as usize;
                        if let Some((start_tick, velocity)) = open[slot].take() {
                            push_note(&mut notes, &tempo_map, key.as_int(), start_tick, tick, velocity);
                        }
                    }
                    _ => {}
                }
            }
            // close anything still sounding at end of track
            for (key, slot) in open.iter_mut().enumerate() {
                if let Some((start_tick, velocity)) = slot.take() {
                    push_note(&mut notes, &tempo_map, key as u8, start_tick, tick, velocity);
                }
            }
        }

        notes.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| a.midi.cmp(&b.midi))
        });
        for (index, note) in notes.iter_mut().enumerate() {
            note.id = NoteId(index);
        }
        let last_end = notes.iter().map(|n| n.end()).fold(0.0, f32::max);

        Self { notes, last_end }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id.0)
    }

    /// End of the last note, in seconds.
    pub fn last_end(&self) -> f32 {
        self.last_end
    }

    pub fn set_hand(&mut self, id: NoteId, hand: Hand) {
        if let Some(note) = self.notes.get_mut(id.0) {
            note.hand = hand;
        }
    }
}

fn push_note(
    notes: &mut Vec<Note>,
    tempo_map: &TempoMap,
    key: u8,
    start_tick: u32,
    end_tick: u32,
    velocity: u8,
) {
    let start = tempo_map.seconds_at(start_tick);
    let end = tempo_map.seconds_at(end_tick);
    if end <= start {
        return;
    }
    notes.push(Note {
        id: NoteId(0), // assigned after the final sort
        midi: key,
        start,
        duration: end - start,
        velocity: velocity as f32 / 127.0,
        hand: Hand::Unassigned,
    });
}

/// Tick-to-seconds conversion across every tempo meta event in the file.
#[derive(Debug)]
struct TempoMap {
    timing: TempoTiming,
}

#[derive(Debug)]
enum TempoTiming {
    /// Ticks per beat plus the cumulative tempo segments.
    Metrical {
        ticks_per_beat: f64,
        changes: Vec<TempoChange>,
    },
    /// SMPTE: a fixed number of ticks per second.
    Timecode { ticks_per_second: f64 },
}

#[derive(Debug)]
struct TempoChange {
    tick: u32,
    seconds: f64,
    us_per_beat: f64,
}

impl TempoMap {
    fn from_smf(smf: &Smf) -> Self {
        let timing = match smf.header.timing {
            Timing::Metrical(ticks_per_beat) => {
                let mut raw: Vec<(u32, f64)> = Vec::new();
                for track in &smf.tracks {
                    let mut tick = 0u32;
                    for event in track {
                        tick = tick.saturating_add(event.delta.as_int());
                        if let TrackEventKind::Meta(MetaMessage::Tempo(us)) = event.kind
                            && us.as_int() > 0
                        {
                            raw.push((tick, us.as_int() as f64));
                        }
                    }
                }
                raw.sort_by_key(|&(tick, _)| tick);
                raw.dedup_by_key(|&mut (tick, _)| tick);
                if raw.first().is_none_or(|&(tick, _)| tick > 0) {
                    raw.insert(0, (0, DEFAULT_TEMPO_US));
                }

                let ticks_per_beat = ticks_per_beat.as_int() as f64;
                let mut changes: Vec<TempoChange> = Vec::with_capacity(raw.len());
                for (tick, us_per_beat) in raw {
                    let seconds = match changes.last() {
                        Some(prev) => {
                            prev.seconds
                                + (tick - prev.tick) as f64 * prev.us_per_beat
                                    / (ticks_per_beat * 1_000_000.0)
                        }
                        None => 0.0,
                    };
                    changes.push(TempoChange {
                        tick,
                        seconds,
                        us_per_beat,
                    });
                }
                TempoTiming::Metrical {
                    ticks_per_beat,
                    changes,
                }
            }
            Timing::Timecode(fps, subframe) => TempoTiming::Timecode {
                ticks_per_second: fps.as_f32() as f64 * subframe as f64,
            },
        };
        Self { timing }
    }

    fn seconds_at(&self, tick: u32) -> f32 {
        match &self.timing {
            TempoTiming::Metrical {
                ticks_per_beat,
                changes,
            } => {
                let idx = changes.partition_point(|c| c.tick <= tick);
                // changes[0] is always at tick 0
                let change = &changes[idx.saturating_sub(1)];
                let seconds = change.seconds
                    + (tick - change.tick) as f64 * change.us_per_beat
                        / (ticks_per_beat * 1_000_000.0);
                seconds as f32
            }
            TempoTiming::Timecode { ticks_per_second } => (tick as f64 / ticks_per_second) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::{
        Format, Header, TrackEvent,
        num::{u4, u7, u15, u24, u28},
    };

    fn midi_event(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        }
    }

    fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        midi_event(
            delta,
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        )
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        midi_event(
            delta,
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        )
    }

    fn tempo(delta: u32, us_per_beat: u32) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us_per_beat))),
        }
    }

    fn smf(tracks: Vec<Vec<TrackEvent<'static>>>) -> Smf<'static> {
        Smf {
            header: Header::new(Format::Parallel, Timing::Metrical(u15::new(480))),
            tracks,
        }
    }

    #[test]
    fn test_parse_single_note() {
        let store = NoteStore::from_smf(&smf(vec![vec![
            note_on(0, 60, 100),
            note_off(480, 60),
        ]]));

        assert_eq!(store.len(), 1);
        let note = &store.notes()[0];
        assert_eq!(note.midi, 60);
        assert_eq!(note.start, 0.0);
        // 480 ticks at the default 120 bpm is half a second
        assert!((note.duration - 0.5).abs() < 1e-6);
        assert!((note.velocity - 100.0 / 127.0).abs() < 1e-6);
        assert_eq!(note.hand, Hand::Unassigned);
    }

    #[test]
    fn test_tempo_change_mid_file() {
        // tempo doubles at tick 960; a note at tick 1440 starts at
        // 960 ticks * 500000us + 480 ticks * 250000us = 1.0s + 0.25s
        let store = NoteStore::from_smf(&smf(vec![
            vec![tempo(0, 500_000), tempo(960, 250_000)],
            vec![note_on(1440, 64, 80), note_off(480, 64)],
        ]));

        assert_eq!(store.len(), 1);
        let note = &store.notes()[0];
        assert!((note.start - 1.25).abs() < 1e-6);
        assert!((note.duration - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        let store = NoteStore::from_smf(&smf(vec![vec![
            note_on(0, 72, 90),
            note_on(240, 72, 0),
        ]]));

        assert_eq!(store.len(), 1);
        assert!((store.notes()[0].duration - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_dangling_note_on_is_closed_at_track_end() {
        let store = NoteStore::from_smf(&smf(vec![vec![
            note_on(0, 60, 90),
            note_on(480, 62, 90),
            note_off(480, 62),
        ]]));

        assert_eq!(store.len(), 2);
        // the dangling C closes at the last tick of the track
        let dangling = store.notes().iter().find(|n| n.midi == 60).unwrap();
        assert!((dangling.end() - 1.0).abs() < 1e-6);
        assert!((store.last_end() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_notes_sorted_and_ids_dense() {
        let store = NoteStore::from_smf(&smf(vec![
            vec![note_on(480, 70, 90), note_off(480, 70)],
            vec![note_on(0, 50, 90), note_off(1440, 50)],
        ]));

        assert_eq!(store.len(), 2);
        assert!(store.notes()[0].start <= store.notes()[1].start);
        for (index, note) in store.notes().iter().enumerate() {
            assert_eq!(note.id, NoteId(index));
        }
    }

    #[test]
    fn test_set_hand() {
        let mut store = NoteStore::from_smf(&smf(vec![vec![
            note_on(0, 60, 100),
            note_off(480, 60),
        ]]));

        let id = store.notes()[0].id;
        store.set_hand(id, Hand::Left);
        assert_eq!(store.get(id).unwrap().hand, Hand::Left);
        // out of range ids are ignored
        store.set_hand(NoteId(99), Hand::Right);
    }

    #[test]
    fn test_malformed_bytes_fail_parse() {
        assert!(matches!(
            NoteStore::from_bytes(b"not a midi file"),
            Err(LoadError::MidiParse(_))
        ));
    }
}

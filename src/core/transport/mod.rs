
use crate::{
    audio::decode::AudioBuffer,
    core::{
        message::{GuiToPlayerMsg, GuiToPlayerTx},
        note::{Note, NoteId},
    },
    error::ScheduleError,
};
use std::sync::Arc;

pub const MAX_RATE: f32 = 4.0;

/// How far the audio thread's reported position may diverge from the
/// transport clock before the clock snaps to it.
const RESYNC_THRESHOLD_SECS: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

/// Fired when the playhead crosses a note boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    On {
        id: NoteId,
        midi: u8,
        velocity: f32,
    },
    Off {
        id: NoteId,
        midi: u8,
    },
}

type NoteListener = Box<dyn FnMut(NoteEvent) -> Result<(), ScheduleError>>;

#[derive(Debug, Clone, Copy)]
struct ScheduledNote {
    id: NoteId,
    midi: u8,
    velocity: f32,
    start: f32,
    end: f32,
}

/// The authoritative playback clock and state machine.
///
/// Everything that needs "now" reads it from here (usually via the position
/// ticker); the audio player only ever *follows*, through the message
/// producer. The clock advances in `update(dt)`, called once per UI frame,
/// and the note scheduler fires visual note-on/off events for everything the
/// frame crossed, so the keyboard view and the audio can never disagree about
/// which notes are sounding.
pub struct Transport {
    state: TransportState,
    position: f32,
    rate: f32,
    audio_duration: f32,
    ready: bool,
    tx: GuiToPlayerTx,

    /// Schedule, ordered by start time.
    notes: Vec<ScheduledNote>,
    /// Indices into `notes`, ordered by end time.
    by_end: Vec<usize>,
    /// Next not-yet-fired note-on in `notes`.
    start_cursor: usize,
    /// Next not-yet-fired note-off in `by_end`.
    end_cursor: usize,
    /// Indices of notes currently sounding.
    sounding: Vec<usize>,
    /// Refcount per midi number; unison overlaps must not cancel early.
    active_counts: [u8; 128],

    listeners: Vec<NoteListener>,
}

impl Transport {
    pub fn new(tx: GuiToPlayerTx) -> Self {
        Self {
            state: TransportState::Stopped,
            position: 0.0,
            rate: 1.0,
            audio_duration: 0.0,
            ready: false,
            tx,
            notes: Vec::new(),
            by_end: Vec::new(),
            start_cursor: 0,
            end_cursor: 0,
            sounding: Vec::new(),
            active_counts: [0; 128],
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The longer of the audio buffer and the last note's end.
    pub fn duration(&self) -> f32 {
        let last_note_end = self.by_end.last().map(|&i| self.notes[i].end).unwrap_or(0.0);
        self.audio_duration.max(last_note_end)
    }

    /// Midi numbers currently sounding; the sole input to keyboard
    /// highlighting and chord recognition.
    pub fn active_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.active_counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(midi, _)| midi as u8)
    }

    pub fn is_note_active(&self, midi: u8) -> bool {
        self.active_counts[midi as usize] > 0
    }

    /// Ids of the notes sounding at the current position.
    pub fn sounding_notes(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.sounding.iter().map(|&i| self.notes[i].id)
    }

    pub fn add_note_listener(&mut self, listener: NoteListener) {
        self.listeners.push(listener);
    }

    /// Install the schedule for a freshly parsed piece and re-arm it at the
    /// current position.
    pub fn set_notes(&mut self, notes: &[Note]) {
        self.notes = notes
            .iter()
            .map(|n| ScheduledNote {
                id: n.id,
                midi: n.midi,
                velocity: n.velocity,
                start: n.start,
                end: n.end(),
            })
            .collect();
        self.notes.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut by_end: Vec<usize> = (0..self.notes.len()).collect();
        by_end.sort_by(|&a, &b| self.notes[a].end.total_cmp(&self.notes[b].end));
        self.by_end = by_end;
        self.rearm_at(self.position);
    }

    /// Audio finished decoding; the transport becomes usable.
    pub fn set_ready(&mut self, audio_duration: f32) {
        self.audio_duration = audio_duration.max(0.0);
        self.ready = true;
    }

    /// Hand a freshly loaded session to the player and install its schedule.
    pub fn load_media(&mut self, audio: Arc<AudioBuffer>, notes: &[Note]) {
        let duration = audio.duration_secs();
        let _ = self.tx.push(GuiToPlayerMsg::SetBuffer(audio));
        self.set_notes(notes);
        self.set_ready(duration);
    }

    /// Drop the old session while a new one loads; `play` gates again until
    /// the next `set_ready`.
    pub fn unload(&mut self) {
        self.stop();
        self.ready = false;
        self.audio_duration = 0.0;
        self.notes.clear();
        self.by_end.clear();
    }

    /// Start playback from the current position. No-op while already playing
    /// or before the session finished loading.
    pub fn play(&mut self) {
        if !self.ready || self.state == TransportState::Playing {
            return;
        }
        self.state = TransportState::Playing;
        let _ = self.tx.push(GuiToPlayerMsg::Play);
    }

    /// Freeze the clock and the audio, preserving the exact position.
    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.state = TransportState::Paused;
        let _ = self.tx.push(GuiToPlayerMsg::Pause);
    }

    /// Continue from a pause, from exactly where `pause` left the clock.
    pub fn resume(&mut self) {
        if self.state == TransportState::Paused {
            self.play();
        }
    }

    pub fn toggle_playback(&mut self) {
        match self.state {
            TransportState::Playing => self.pause(),
            TransportState::Paused => self.resume(),
            TransportState::Stopped => self.play(),
        }
    }

    /// Halt and rewind to zero, cancelling everything scheduled.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.release_sounding();
        self.position = 0.0;
        self.start_cursor = 0;
        self.end_cursor = 0;
        let _ = self.tx.push(GuiToPlayerMsg::Stop);
    }

    /// Relocate the clock. Legal in every state and applies synchronously: a
    /// `seek` followed by `play` in the same turn starts from the target.
    ///
    /// The scheduler drops its pending events, synthesizes note-on state for
    /// every note whose interval contains the target (without re-triggering
    /// audio) and re-arms the cursors, so there are no stuck keys after a
    /// backward seek and no ghost keys after a forward one.
    pub fn seek(&mut self, t: f32) {
        let t = if t.is_finite() { t } else { 0.0 };
        let t = t.clamp(0.0, self.duration());
        self.rearm_at(t);
        let _ = self.tx.push(GuiToPlayerMsg::SeekTo(t));
    }

    /// Change the playback speed without touching the current position; only
    /// the slope of future advancement changes, for the audio and the note
    /// scheduler alike. Pitch is not corrected.
    pub fn set_rate(&mut self, rate: f32) {
        if !rate.is_finite() || rate <= 0.0 {
            return;
        }
        self.rate = rate.min(MAX_RATE);
        let _ = self.tx.push(GuiToPlayerMsg::SetRate(self.rate));
    }

    /// Advance the clock by one frame's wall time. Fires note events for
    /// everything crossed in `(t0, t1]`, in time order.
    pub fn update(&mut self, dt: f32) {
        if self.state != TransportState::Playing || !self.ready || dt <= 0.0 {
            return;
        }
        let duration = self.duration();
        let target = (self.position + dt * self.rate).min(duration);
        self.fire_until(target);
        self.position = target;
        if self.position >= duration {
            // end of the piece; hold the position so resume replays the tail
            self.pause();
        }
    }

    /// Reconcile with the audio thread's reported position. Small divergence
    /// is expected (buffer granularity) and ignored; past the threshold the
    /// clock snaps, re-arming the schedule like a seek but without echoing a
    /// seek command back to the audio thread.
    pub fn sync_to_audio(&mut self, audio_pos: f32) {
        if self.state != TransportState::Playing || !audio_pos.is_finite() {
            return;
        }
        if (audio_pos - self.position).abs() > RESYNC_THRESHOLD_SECS {
            self.rearm_at(audio_pos.clamp(0.0, self.duration()));
        }
    }

    /// Fire every note-on and note-off in `(position, target]`, interleaved
    /// in time order so a short note still gets its on before its off.
    fn fire_until(&mut self, target: f32) {
        loop {
            let next_on = self
                .notes
                .get(self.start_cursor)
                .map(|n| n.start)
                .filter(|&s| s <= target);
            let next_off = self
                .by_end
                .get(self.end_cursor)
                .map(|&i| self.notes[i].end)
                .filter(|&e| e <= target);

            match (next_on, next_off) {
                (None, None) => break,
                (Some(_), None) => self.fire_on(),
                (None, Some(_)) => self.fire_off(),
                // offs win ties so a repeated pitch releases before it
                // re-sounds
                (Some(on), Some(off)) => {
                    if off <= on {
                        self.fire_off();
                    } else {
                        self.fire_on();
                    }
                }
            }
        }
    }

    fn fire_on(&mut self) {
        let index = self.start_cursor;
        self.start_cursor += 1;
        let note = self.notes[index];
        self.active_counts[note.midi as usize] =
            self.active_counts[note.midi as usize].saturating_add(1);
        self.sounding.push(index);
        self.emit(NoteEvent::On {
            id: note.id,
            midi: note.midi,
            velocity: note.velocity,
        });
    }

    fn fire_off(&mut self) {
        let index = self.by_end[self.end_cursor];
        self.end_cursor += 1;
        let note = self.notes[index];
        self.active_counts[note.midi as usize] =
            self.active_counts[note.midi as usize].saturating_sub(1);
        if let Some(pos) = self.sounding.iter().position(|&i| i == index) {
            self.sounding.swap_remove(pos);
        }
        self.emit(NoteEvent::Off {
            id: note.id,
            midi: note.midi,
        });
    }

    /// Emit note-offs for everything currently sounding.
    fn release_sounding(&mut self) {
        let sounding = std::mem::take(&mut self.sounding);
        for index in sounding {
            let note = self.notes[index];
            self.emit(NoteEvent::Off {
                id: note.id,
                midi: note.midi,
            });
        }
        self.active_counts = [0; 128];
    }

    /// Drop pending events, move the clock to `t`, rebuild the sounding set
    /// and re-arm both cursors relative to the new position.
    fn rearm_at(&mut self, t: f32) {
        self.release_sounding();
        self.position = t;
        self.start_cursor = self.notes.partition_point(|n| n.start <= t);
        self.end_cursor = self
            .by_end
            .partition_point(|&i| self.notes[i].end <= t);

        for index in 0..self.start_cursor {
            let note = self.notes[index];
            if note.end > t {
                self.active_counts[note.midi as usize] =
                    self.active_counts[note.midi as usize].saturating_add(1);
                self.sounding.push(index);
                self.emit(NoteEvent::On {
                    id: note.id,
                    midi: note.midi,
                    velocity: note.velocity,
                });
            }
        }
    }

    /// A listener error is logged and contained; the rest of the listeners
    /// and the scheduler keep going.
    fn emit(&mut self, event: NoteEvent) {
        for listener in self.listeners.iter_mut() {
            if let Err(err) = listener(event) {
                log::warn!("{err}");
            }
        }
    }
}

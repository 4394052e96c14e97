use crate::{
    config::{self, Prefs},
    core::{
        chord::ChordTimeline,
        history::History,
        looper::LoopEngine,
        message::{GuiToPlayerTx, PlayerToGuiMsg, PlayerToGuiRx},
        note::{NoteId, NoteStore},
        session::{MediaResult, Session, spawn_media_loader},
        ticker::PositionTicker,
        transport::{Transport, TransportState},
        viewport::TimelineViewport,
    },
};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Everything the UI thread owns, wired together. The panels borrow this
/// mutably one at a time; all playback truth lives in `transport` and flows
/// out through `ticker`.
pub struct PracticeState {
    pub transport: Transport,
    pub ticker: PositionTicker,
    pub looper: LoopEngine,
    pub chords: ChordTimeline,
    pub history: History,
    pub notes: NoteStore,
    pub viewport: TimelineViewport,
    pub prefs: Prefs,
    pub load_state: LoadState,
    pub session: Option<Session>,

    rx: PlayerToGuiRx,
    media_rx: Option<crossbeam::channel::Receiver<MediaResult>>,
    restore_position: f32,
}

impl PracticeState {
    pub fn new(tx: GuiToPlayerTx, rx: PlayerToGuiRx) -> Self {
        let prefs = config::load_prefs();
        let mut ticker = PositionTicker::new();
        ticker.restore(prefs.last_position);
        ticker.set_persist_hook(Box::new(|position| {
            let mut prefs = config::load_prefs();
            prefs.last_position = position;
            config::save_prefs(&prefs);
        }));
        let mut viewport = TimelineViewport::new();
        viewport.set_zoom(prefs.zoom_level);

        Self {
            transport: Transport::new(tx),
            ticker,
            looper: LoopEngine::new(),
            chords: ChordTimeline::new(),
            history: History::new(),
            notes: NoteStore::empty(),
            viewport,
            prefs,
            load_state: LoadState::Idle,
            session: None,
            rx,
            media_rx: None,
            restore_position: 0.0,
        }
    }

    /// Open a session document and kick off the one-shot media load. A
    /// failure puts the state machine into `Failed` until the user retries
    /// with another explicit open.
    pub fn open_session(&mut self, path: &Path) {
        match Session::load(path) {
            Ok(session) => {
                log::info!("opening session {:?}", session.name);
                self.transport.unload();
                self.notes = NoteStore::empty();
                self.chords = ChordTimeline::from_spans(session.chords.clone());
                self.history = History::new();
                self.looper.reset();
                self.restore_position = self.prefs.last_position;
                self.media_rx = Some(spawn_media_loader(&session));
                self.session = Some(session);
                self.load_state = LoadState::Loading;
            }
            Err(err) => {
                log::error!("failed to open session: {err}");
                self.load_state = LoadState::Failed(err.to_string());
            }
        }
    }

    /// Per-frame pump, called once at the top of the UI update. The order is
    /// load-bearing: the ticker publishes the freshly advanced clock, and
    /// only then does the loop engine get to look at it.
    pub fn update(&mut self, dt: f32) {
        self.poll_media_load();
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                PlayerToGuiMsg::PlaybackPos(pos) => self.transport.sync_to_audio(pos),
            }
        }

        self.transport.update(dt);
        // publish only actual movement so subscribers (repaint scheduling)
        // stay quiet while the clock is frozen
        let position = self.transport.position();
        if position != self.ticker.snapshot() {
            self.ticker.set(position);
        }
        self.looper.poll(&mut self.transport);

        self.viewport.set_duration(self.transport.duration());
        if self.transport.state() == TransportState::Playing {
            self.viewport.follow_playhead(self.ticker.snapshot());
        }
    }

    fn poll_media_load(&mut self) {
        let Some(media_rx) = self.media_rx.as_ref() else {
            return;
        };
        let Ok(result) = media_rx.try_recv() else {
            return;
        };
        self.media_rx = None;
        match result {
            Ok(media) => {
                self.transport.load_media(media.audio, media.notes.notes());
                self.notes = media.notes;
                self.load_state = LoadState::Ready;
                // put the playhead back where the last run left it
                let target = self.restore_position.min(self.transport.duration());
                if target > 0.0 {
                    self.transport.seek(target);
                    self.ticker.set(target);
                }
            }
            Err(err) => {
                log::error!("session media failed to load: {err}");
                self.load_state = LoadState::Failed(err.to_string());
            }
        }
    }

    pub fn toggle_playback(&mut self) {
        if self.transport.state() != TransportState::Playing {
            self.viewport.resume_follow();
        }
        self.transport.toggle_playback();
    }

    /// Cycle the hand assignment of whatever is sounding on this key.
    pub fn cycle_hand(&mut self, midi: u8) {
        let ids: Vec<NoteId> = self
            .transport
            .sounding_notes()
            .filter(|&id| self.notes.get(id).is_some_and(|n| n.midi == midi))
            .collect();
        for id in ids {
            if let Some(note) = self.notes.get(id) {
                let hand = note.hand.cycled();
                self.notes.set_hand(id, hand);
            }
        }
    }

    /// Persist the prefs, refreshing the mirrored position first so a zoom
    /// or toggle save never writes back a stale playhead.
    pub fn save_prefs(&mut self) {
        self.prefs.last_position = self.ticker.snapshot();
        config::save_prefs(&self.prefs);
    }
}

use crate::{
    core::{
        history::Snapshot,
        message::{GuiToPlayerTx, PlayerToGuiRx},
        transport::TransportState,
    },
    ui::{
        keyboard::KeyboardPanel, state::PracticeState, timeline::TimelinePanel,
        transport_bar::TransportBar,
    },
};
use egui::{Key, Modifiers};
use std::{path::PathBuf, time::Duration};

/// Idle repaint cadence: seeks and scrubs still show up without burning
/// frames while nothing is playing.
const IDLE_REPAINT: Duration = Duration::from_millis(100);

pub struct PianolaApp {
    state: PracticeState,
    transport_bar: TransportBar,
    timeline: TimelinePanel,
    keyboard: KeyboardPanel,
}

impl PianolaApp {
    pub fn new(
        tx: GuiToPlayerTx,
        rx: PlayerToGuiRx,
        session_path: Option<PathBuf>,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let mut state = PracticeState::new(tx, rx);
        // any position movement schedules a repaint, so a seek while paused
        // shows up right away instead of on the next idle poll
        let repaint_ctx = cc.egui_ctx.clone();
        state
            .ticker
            .subscribe(Box::new(move |_| repaint_ctx.request_repaint()));
        if let Some(path) = session_path {
            state.open_session(&path);
        }
        Self {
            state,
            transport_bar: TransportBar::new(),
            timeline: TimelinePanel::new(),
            keyboard: KeyboardPanel::new(),
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let state = &mut self.state;
        ctx.input_mut(|input| {
            if input.consume_key(Modifiers::NONE, Key::Space) {
                state.toggle_playback();
            }
            if input.consume_key(Modifiers::NONE, Key::Home) {
                state.transport.seek(0.0);
            }
            if input.consume_key(Modifiers::COMMAND | Modifiers::SHIFT, Key::Z) {
                state.history.redo(&mut state.chords);
            }
            if input.consume_key(Modifiers::COMMAND, Key::Z) {
                state.history.undo(&mut state.chords);
            }
            // loop region: first press marks the start, second commits
            if input.consume_key(Modifiers::NONE, Key::L) {
                let at = state.transport.position();
                if state.looper.is_defining() {
                    state.looper.commit_region(&mut state.transport, Some(at));
                } else {
                    state.looper.begin_region_at(at);
                }
            }
            if input.consume_key(Modifiers::NONE, Key::A) {
                state.looper.toggle_active(&mut state.transport);
            }
            // jump edit focus to the chord under the playhead
            if input.consume_key(Modifiers::NONE, Key::E) {
                let focus = state
                    .chords
                    .find_span_at(state.transport.position())
                    .map(|(index, _)| index);
                state.chords.set_active(focus);
            }
            if input.consume_key(Modifiers::NONE, Key::Delete)
                || input.consume_key(Modifiers::NONE, Key::Backspace)
            {
                let has_target =
                    !state.chords.selected().is_empty() || state.chords.active().is_some();
                if has_target {
                    state
                        .history
                        .push(Snapshot::Chords(state.chords.spans().to_vec()));
                    if state.chords.selected().is_empty() {
                        state.chords.delete_active();
                    } else {
                        state.chords.delete_selected();
                    }
                }
            }
        });
    }
}

impl eframe::App for PianolaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // large dt after a stall would teleport the scheduler; clamp it
        let dt = ctx.input(|i| i.stable_dt).min(0.1);
        self.state.update(dt);
        self.handle_shortcuts(ctx);

        self.transport_bar.show(ctx, &mut self.state);
        self.keyboard.show(ctx, &mut self.state);
        self.timeline.show(ctx, &mut self.state);

        if self.state.transport.state() == TransportState::Playing {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(IDLE_REPAINT);
        }
    }
}

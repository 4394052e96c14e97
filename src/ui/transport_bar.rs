use crate::{
    core::{chord::InsertSide, history::Snapshot, transport::TransportState},
    ui::state::{LoadState, PracticeState},
    utils::format_time,
};
use egui::{Button, Color32, Context, RichText, Slider, TopBottomPanel};
use egui_phosphor::regular;

pub struct TransportBar {
    /// Index whose label edit already snapshotted this focus session.
    label_edit_armed: Option<usize>,
}

impl TransportBar {
    pub fn new() -> Self {
        Self {
            label_edit_armed: None,
        }
    }

    pub fn show(&mut self, ctx: &Context, state: &mut PracticeState) {
        TopBottomPanel::top("transport_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(regular::FOLDER_OPEN).on_hover_text("Open session").clicked()
                    && let Some(path) = rfd::FileDialog::new()
                        .add_filter("session", &["json"])
                        .pick_file()
                {
                    state.open_session(&path);
                }
                ui.separator();

                self.playback_controls(ui, state);
                ui.separator();
                self.loop_controls(ui, state);
                ui.separator();
                self.rate_and_toggles(ui, state);
                ui.separator();
                self.history_controls(ui, state);
                ui.separator();
                self.chord_editor(ui, state);

                match &state.load_state {
                    LoadState::Loading => {
                        ui.spinner();
                    }
                    LoadState::Failed(message) => {
                        ui.colored_label(Color32::LIGHT_RED, message);
                    }
                    _ => {}
                }
            });
        });
    }

    fn playback_controls(&mut self, ui: &mut egui::Ui, state: &mut PracticeState) {
        let ready = state.transport.is_ready();
        let playing = state.transport.state() == TransportState::Playing;

        let play_icon = if playing { regular::PAUSE } else { regular::PLAY };
        if ui.add_enabled(ready, Button::new(play_icon)).clicked() {
            state.toggle_playback();
        }
        if ui.add_enabled(ready, Button::new(regular::STOP)).clicked() {
            state.transport.stop();
        }
        if ui.add_enabled(ready, Button::new(regular::SKIP_BACK)).clicked() {
            state.transport.seek(0.0);
        }

        let clock = format!(
            "{} / {}",
            format_time(state.ticker.quantised_snapshot(30.0)),
            format_time(state.transport.duration())
        );
        ui.monospace(clock);
    }

    fn loop_controls(&mut self, ui: &mut egui::Ui, state: &mut PracticeState) {
        let defining = state.looper.is_defining();
        let label = if defining { "Set end" } else { "Loop from here" };
        if ui.button(label).on_hover_text("L").clicked() {
            let at = state.transport.position();
            if defining {
                state.looper.commit_region(&mut state.transport, Some(at));
            } else {
                state.looper.begin_region_at(at);
            }
        }
        if let Some(region) = state.looper.region() {
            let toggle = Button::new(RichText::new(regular::REPEAT).color(if region.active {
                Color32::LIGHT_GREEN
            } else {
                Color32::GRAY
            }));
            if ui.add(toggle).on_hover_text("Toggle loop (A)").clicked() {
                state.looper.toggle_active(&mut state.transport);
            }
            if ui.button(regular::X).on_hover_text("Clear loop").clicked() {
                state.looper.reset();
            }
        }
    }

    fn rate_and_toggles(&mut self, ui: &mut egui::Ui, state: &mut PracticeState) {
        let mut rate = state.transport.rate();
        let slider = Slider::new(&mut rate, 0.25..=4.0).logarithmic(true).suffix("x");
        if ui.add(slider).changed() {
            state.transport.set_rate(rate);
        }

        let mut follow = state.viewport.follow_enabled();
        if ui.toggle_value(&mut follow, regular::MAGNET).on_hover_text("Follow playhead").changed() {
            state.viewport.set_follow(follow);
        }

        let mut changed = false;
        changed |= ui
            .toggle_value(&mut state.prefs.show_chord_notes, "chord")
            .on_hover_text("Highlight chord tones")
            .changed();
        changed |= ui
            .toggle_value(&mut state.prefs.show_note_degrees, "deg")
            .on_hover_text("Show scale degrees")
            .changed();
        if changed {
            state.save_prefs();
        }
    }

    fn history_controls(&mut self, ui: &mut egui::Ui, state: &mut PracticeState) {
        if ui
            .add_enabled(state.history.can_undo(), Button::new(regular::ARROW_COUNTER_CLOCKWISE))
            .on_hover_text("Undo")
            .clicked()
        {
            state.history.undo(&mut state.chords);
        }
        if ui
            .add_enabled(state.history.can_redo(), Button::new(regular::ARROW_CLOCKWISE))
            .on_hover_text("Redo")
            .clicked()
        {
            state.history.redo(&mut state.chords);
        }
    }

    fn chord_editor(&mut self, ui: &mut egui::Ui, state: &mut PracticeState) {
        let Some(index) = state.chords.active() else {
            self.label_edit_armed = None;
            ui.weak("no chord selected");
            return;
        };

        let mut label = state.chords.spans()[index].label.clone();
        let response = ui.add(
            egui::TextEdit::singleline(&mut label)
                .hint_text("chord")
                .desired_width(80.0),
        );
        // snapshot once at the first keystroke of an edit session, so a whole
        // rename is one undo step
        if response.changed() && self.label_edit_armed != Some(index) {
            state
                .history
                .push(Snapshot::Chords(state.chords.spans().to_vec()));
            self.label_edit_armed = Some(index);
        }
        if response.changed() {
            state.chords.set_label(index, label);
        }
        if response.lost_focus() {
            self.label_edit_armed = None;
        }

        for (text, side) in [("+ before", InsertSide::Before), ("+ after", InsertSide::After)] {
            if ui.button(text).clicked() {
                let end = state.transport.duration();
                let before = state.chords.spans().to_vec();
                if state.chords.insert_at(index, side, end).is_some() {
                    state.history.push(Snapshot::Chords(before));
                } else {
                    log::debug!("no room to insert a chord");
                }
            }
        }
    }
}

use crate::{
    core::note::Hand,
    ui::state::PracticeState,
    utils::{chord_root_pitch_class, midi_note_name},
};
use egui::{
    Align2, Color32, Context, FontId, Rect, Sense, Stroke, StrokeKind, TopBottomPanel, pos2,
};

const FIRST_KEY: u8 = 21; // A0
const LAST_KEY: u8 = 108; // C8
const WHITE_KEY_COUNT: f32 = 52.0;
const PANEL_HEIGHT: f32 = 110.0;

const DEGREE_NAMES: [&str; 12] = [
    "1", "b2", "2", "b3", "3", "4", "b5", "5", "b6", "6", "b7", "7",
];

/// Strategy for what gets written on a key. Swapping the renderer changes
/// the labelling without touching the keyboard itself.
pub trait KeyRenderer {
    fn label(&self, midi: u8, chord_root: Option<u8>) -> Option<String>;
}

/// Note names on the C keys, the classic octave guide.
pub struct NoteNameRenderer;

impl KeyRenderer for NoteNameRenderer {
    fn label(&self, midi: u8, _chord_root: Option<u8>) -> Option<String> {
        (midi % 12 == 0).then(|| midi_note_name(midi))
    }
}

/// Scale degrees relative to the chord under the playhead.
pub struct DegreeRenderer;

impl KeyRenderer for DegreeRenderer {
    fn label(&self, midi: u8, chord_root: Option<u8>) -> Option<String> {
        let root = chord_root?;
        let degree = (midi as i32 - root as i32).rem_euclid(12) as usize;
        Some(DEGREE_NAMES[degree].to_string())
    }
}

fn is_black(midi: u8) -> bool {
    matches!(midi % 12, 1 | 3 | 6 | 8 | 10)
}

fn hand_color(hand: Hand) -> Color32 {
    match hand {
        Hand::Left => Color32::from_rgb(235, 140, 60),
        Hand::Right => Color32::from_rgb(90, 150, 235),
        Hand::Unassigned => Color32::from_rgb(110, 200, 120),
    }
}

pub struct KeyboardPanel;

impl KeyboardPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&mut self, ctx: &Context, state: &mut PracticeState) {
        TopBottomPanel::bottom("keyboard")
            .exact_height(PANEL_HEIGHT)
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();
                let response = ui.allocate_rect(rect, Sense::click());
                let painter = ui.painter_at(rect);

                let chord_root = state
                    .chords
                    .find_span_at(state.ticker.snapshot())
                    .and_then(|(_, span)| chord_root_pitch_class(&span.label));
                let renderer: &dyn KeyRenderer = if state.prefs.show_note_degrees {
                    &DegreeRenderer
                } else {
                    &NoteNameRenderer
                };

                let white_width = rect.width() / WHITE_KEY_COUNT;
                let mut white_rects: Vec<(u8, Rect)> = Vec::new();
                let mut black_rects: Vec<(u8, Rect)> = Vec::new();

                let mut white_index = 0;
                for midi in FIRST_KEY..=LAST_KEY {
                    if is_black(midi) {
                        let x = rect.left() + white_index as f32 * white_width;
                        let key_rect = Rect::from_min_max(
                            pos2(x - white_width * 0.3, rect.top()),
                            pos2(x + white_width * 0.3, rect.top() + rect.height() * 0.6),
                        );
                        black_rects.push((midi, key_rect));
                    } else {
                        let x = rect.left() + white_index as f32 * white_width;
                        let key_rect = Rect::from_min_max(
                            pos2(x, rect.top()),
                            pos2(x + white_width, rect.bottom()),
                        );
                        white_rects.push((midi, key_rect));
                        white_index += 1;
                    }
                }

                for (midi, key_rect) in &white_rects {
                    let fill = self.key_fill(state, *midi, chord_root, Color32::from_gray(235));
                    painter.rect(
                        *key_rect,
                        1.0,
                        fill,
                        Stroke::new(1.0, Color32::from_gray(60)),
                        StrokeKind::Inside,
                    );
                    if let Some(label) = renderer.label(*midi, chord_root) {
                        painter.text(
                            pos2(key_rect.center().x, key_rect.bottom() - 3.0),
                            Align2::CENTER_BOTTOM,
                            label,
                            FontId::proportional(8.0),
                            Color32::from_gray(90),
                        );
                    }
                }
                for (midi, key_rect) in &black_rects {
                    let fill = self.key_fill(state, *midi, chord_root, Color32::from_gray(25));
                    painter.rect(
                        *key_rect,
                        1.0,
                        fill,
                        Stroke::new(1.0, Color32::from_gray(60)),
                        StrokeKind::Inside,
                    );
                }

                // clicking a sounding key cycles its hand assignment
                if response.clicked()
                    && let Some(pointer) = response.interact_pointer_pos()
                {
                    let hit = black_rects
                        .iter()
                        .chain(white_rects.iter())
                        .find(|(_, r)| r.contains(pointer))
                        .map(|(midi, _)| *midi);
                    if let Some(midi) = hit
                        && state.transport.is_note_active(midi)
                    {
                        state.cycle_hand(midi);
                    }
                }
            });
    }

    fn key_fill(
        &self,
        state: &PracticeState,
        midi: u8,
        chord_root: Option<u8>,
        base: Color32,
    ) -> Color32 {
        if state.transport.is_note_active(midi) {
            let hand = state
                .transport
                .sounding_notes()
                .find_map(|id| {
                    state
                        .notes
                        .get(id)
                        .filter(|n| n.midi == midi)
                        .map(|n| n.hand)
                })
                .unwrap_or(Hand::Unassigned);
            return hand_color(hand);
        }
        if state.prefs.show_chord_notes
            && let Some(root) = chord_root
            && midi % 12 == root
        {
            return base.lerp_to_gamma(Color32::from_rgb(110, 200, 120), 0.35);
        }
        base
    }
}

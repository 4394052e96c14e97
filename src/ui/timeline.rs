use crate::{core::history::Snapshot, ui::state::PracticeState, utils::format_time};
use egui::{
    Align2, CentralPanel, Color32, Context, CursorIcon, FontId, Rect, Sense, Stroke, StrokeKind,
    pos2,
};

const RULER_HEIGHT: f32 = 22.0;
const EDGE_GRAB_PX: f32 = 6.0;
/// Ruler labels never sit closer than this.
const MIN_LABEL_SPACING_PX: f32 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragKind {
    Move,
    ResizeStart,
    ResizeEnd,
}

#[derive(Debug, Clone, Copy)]
struct ChordDrag {
    index: usize,
    kind: DragKind,
    /// Seconds between the pointer and the span start when the grab began.
    grab_offset: f32,
}

pub struct TimelinePanel {
    drag: Option<ChordDrag>,
    scrubbing: bool,
}

impl TimelinePanel {
    pub fn new() -> Self {
        Self {
            drag: None,
            scrubbing: false,
        }
    }

    pub fn show(&mut self, ctx: &Context, state: &mut PracticeState) {
        CentralPanel::default().show(ctx, |ui| {
            let rect = ui.available_rect_before_wrap();
            state.viewport.set_base_width(rect.width());

            let response = ui.allocate_rect(rect, Sense::click_and_drag());
            let painter = ui.painter_at(rect);
            painter.rect_filled(rect, 0.0, Color32::from_gray(24));

            if response.hovered() {
                self.handle_wheel(ui, state, rect);
            }

            self.draw_ruler(&painter, state, rect);
            self.draw_loop_region(&painter, state, rect);
            self.draw_chords(&painter, state, rect);
            self.draw_playhead(&painter, state, rect);

            self.handle_pointer(ui, state, rect, &response);
        });
    }

    fn handle_wheel(&mut self, ui: &egui::Ui, state: &mut PracticeState, rect: Rect) {
        let (scroll, modifiers, pointer) = ui.input(|i| {
            (i.smooth_scroll_delta, i.modifiers, i.pointer.hover_pos())
        });
        if scroll == egui::Vec2::ZERO {
            return;
        }
        if modifiers.command {
            let anchor = pointer.map(|p| p.x - rect.left()).unwrap_or(0.0);
            let factor = (1.0 - scroll.y * 0.007).clamp(0.5, 2.0);
            state.viewport.zoom_around(factor, anchor);
            state.prefs.zoom_level = state.viewport.zoom();
            state.save_prefs();
        } else {
            let dx = if scroll.x != 0.0 { scroll.x } else { scroll.y };
            if dx != 0.0 {
                state.viewport.scroll_by(-dx);
            }
        }
    }

    fn draw_ruler(&self, painter: &egui::Painter, state: &PracticeState, rect: Rect) {
        let viewport = &state.viewport;
        let duration = viewport.duration();
        if duration <= 0.0 {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "open a session to practice",
                FontId::proportional(14.0),
                Color32::from_gray(110),
            );
            return;
        }
        let px_per_sec = viewport.content_width() / duration;
        let step = [1.0f32, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0]
            .into_iter()
            .find(|s| s * px_per_sec >= MIN_LABEL_SPACING_PX)
            .unwrap_or(600.0);

        let first = (viewport.x_to_time(0.0) / step).floor() as i32;
        let last = (viewport.x_to_time(rect.width()) / step).ceil() as i32;
        for tick in first..=last {
            let t = tick as f32 * step;
            let x = rect.left() + viewport.time_to_x(t);
            painter.line_segment(
                [pos2(x, rect.top()), pos2(x, rect.top() + 8.0)],
                Stroke::new(1.0, Color32::from_gray(120)),
            );
            painter.text(
                pos2(x + 3.0, rect.top() + 1.0),
                Align2::LEFT_TOP,
                format_time(t),
                FontId::monospace(9.0),
                Color32::from_gray(140),
            );
        }
        painter.line_segment(
            [
                pos2(rect.left(), rect.top() + RULER_HEIGHT),
                pos2(rect.right(), rect.top() + RULER_HEIGHT),
            ],
            Stroke::new(1.0, Color32::from_gray(50)),
        );
    }

    fn draw_loop_region(&self, painter: &egui::Painter, state: &PracticeState, rect: Rect) {
        let bounds = state
            .looper
            .region()
            .map(|r| (r.start, r.end, r.active))
            .or_else(|| state.looper.preview().map(|(s, e)| (s, e, false)));
        let Some((start, end, active)) = bounds else {
            return;
        };
        let (start, end) = (start.min(end), start.max(end));
        let x0 = rect.left() + state.viewport.time_to_x(start);
        let x1 = rect.left() + state.viewport.time_to_x(end);
        if x1 < rect.left() || x0 > rect.right() {
            return;
        }
        let fill = if active {
            Color32::from_rgba_unmultiplied(120, 220, 130, 26)
        } else {
            Color32::from_rgba_unmultiplied(180, 180, 180, 18)
        };
        let region_rect = Rect::from_min_max(
            pos2(x0.max(rect.left()), rect.top()),
            pos2(x1.min(rect.right()), rect.bottom()),
        );
        painter.rect_filled(region_rect, 0.0, fill);
        for x in [x0, x1] {
            if x >= rect.left() && x <= rect.right() {
                painter.line_segment(
                    [pos2(x, rect.top()), pos2(x, rect.bottom())],
                    Stroke::new(1.0, Color32::from_rgb(120, 220, 130)),
                );
            }
        }
    }

    fn draw_chords(&self, painter: &egui::Painter, state: &PracticeState, rect: Rect) {
        let lane = self.chord_lane(rect);
        painter.rect_filled(lane, 2.0, Color32::from_gray(30));

        for (index, span) in state.chords.spans().iter().enumerate() {
            let x0 = rect.left() + state.viewport.time_to_x(span.start);
            let x1 = rect.left() + state.viewport.time_to_x(span.end());
            if x1 < rect.left() || x0 > rect.right() {
                continue;
            }
            let chord_rect = Rect::from_min_max(
                pos2(x0, lane.top() + 4.0),
                pos2(x1 - 1.0, lane.bottom() - 4.0),
            );
            let is_active = state.chords.active() == Some(index);
            let is_selected = state.chords.selected().contains(&index);
            let fill = if is_active {
                Color32::from_rgb(80, 120, 190)
            } else if is_selected {
                Color32::from_rgb(70, 90, 130)
            } else {
                Color32::from_gray(58)
            };
            painter.rect(
                chord_rect,
                3.0,
                fill,
                Stroke::new(1.0, Color32::from_gray(90)),
                StrokeKind::Inside,
            );
            if chord_rect.width() > 24.0 {
                let label = if span.label.is_empty() {
                    "—"
                } else {
                    span.label.as_str()
                };
                painter.text(
                    chord_rect.center(),
                    Align2::CENTER_CENTER,
                    label,
                    FontId::proportional(12.0),
                    Color32::WHITE,
                );
            }
        }
    }

    fn draw_playhead(&self, painter: &egui::Painter, state: &PracticeState, rect: Rect) {
        let x = rect.left() + state.viewport.time_to_x(state.ticker.snapshot());
        if x < rect.left() || x > rect.right() {
            return;
        }
        painter.line_segment(
            [pos2(x, rect.top()), pos2(x, rect.bottom())],
            Stroke::new(1.5, Color32::from_rgb(230, 90, 80)),
        );
    }

    fn handle_pointer(
        &mut self,
        ui: &egui::Ui,
        state: &mut PracticeState,
        rect: Rect,
        response: &egui::Response,
    ) {
        let Some(pointer) = response.interact_pointer_pos().or(response.hover_pos()) else {
            return;
        };
        let px = pointer.x - rect.left();
        let t = state.viewport.x_to_time(px);
        let in_ruler = pointer.y < rect.top() + RULER_HEIGHT;
        let lane = self.chord_lane(rect);

        // hover cursor over resize edges
        if self.drag.is_none() && lane.contains(pointer) {
            if let Some((_, kind, _)) = self.hit_chord(state, px) {
                ui.ctx().set_cursor_icon(match kind {
                    DragKind::Move => CursorIcon::Grab,
                    _ => CursorIcon::ResizeHorizontal,
                });
            }
        }

        if response.drag_started() {
            if in_ruler {
                self.scrubbing = true;
            } else if lane.contains(pointer)
                && let Some((index, kind, grab_offset)) = self.hit_chord(state, px)
            {
                state
                    .history
                    .push(Snapshot::Chords(state.chords.spans().to_vec()));
                state.chords.set_active(Some(index));
                self.drag = Some(ChordDrag {
                    index,
                    kind,
                    grab_offset,
                });
            }
        }

        if response.dragged() {
            if self.scrubbing {
                state.transport.seek(t);
            } else if let Some(drag) = self.drag {
                let span = &state.chords.spans()[drag.index];
                let (start, duration) = match drag.kind {
                    DragKind::Move => (t - drag.grab_offset, span.duration),
                    DragKind::ResizeStart => {
                        let end = span.end();
                        (t.min(end), end - t.min(end))
                    }
                    DragKind::ResizeEnd => (span.start, t - span.start),
                };
                state.chords.update_span_live(drag.index, start, duration);
            }
        }

        if response.drag_stopped() {
            if self.drag.take().is_some() {
                state.chords.commit_edit();
            }
            self.scrubbing = false;
        }

        if response.clicked() {
            if in_ruler {
                state.transport.seek(t);
            } else if lane.contains(pointer) {
                let hit = state.chords.find_span_at(t).map(|(index, _)| index);
                match hit {
                    Some(index) => {
                        if ui.input(|i| i.modifiers.shift) {
                            state.chords.toggle_selected(index);
                        } else {
                            state.chords.clear_selection();
                            state.chords.set_active(Some(index));
                        }
                    }
                    None => {
                        state.chords.clear_selection();
                        state.chords.set_active(None);
                    }
                }
            } else {
                // clicking the empty area below the lane also scrubs
                state.transport.seek(t);
            }
        }
    }

    /// Hit test the chord lane at a panel-relative x: an edge zone wins over
    /// the span body.
    fn hit_chord(&self, state: &PracticeState, px: f32) -> Option<(usize, DragKind, f32)> {
        let viewport = &state.viewport;
        for (index, span) in state.chords.spans().iter().enumerate() {
            let x0 = viewport.time_to_x(span.start);
            let x1 = viewport.time_to_x(span.end());
            if (px - x0).abs() <= EDGE_GRAB_PX {
                return Some((index, DragKind::ResizeStart, 0.0));
            }
            if (px - x1).abs() <= EDGE_GRAB_PX {
                return Some((index, DragKind::ResizeEnd, 0.0));
            }
            if px > x0 && px < x1 {
                let grab_offset = viewport.x_to_time(px) - span.start;
                return Some((index, DragKind::Move, grab_offset));
            }
        }
        None
    }

    fn chord_lane(&self, rect: Rect) -> Rect {
        Rect::from_min_max(
            pos2(rect.left(), rect.top() + RULER_HEIGHT + 8.0),
            pos2(rect.right(), rect.top() + RULER_HEIGHT + 64.0),
        )
    }
}

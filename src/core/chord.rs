use serde::{Deserialize, Serialize};

/// Spans shorter than this are never produced by an edit; it keeps a resize
/// from collapsing a chord into something unclickable.
pub const MIN_SPAN_SECS: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSpan {
    #[serde(default)]
    pub label: String,
    pub start: f32,
    pub duration: f32,
}

impl ChordSpan {
    pub fn new(label: impl Into<String>, start: f32, duration: f32) -> Self {
        Self {
            label: label.into(),
            start,
            duration,
        }
    }

    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    pub fn contains(&self, t: f32) -> bool {
        self.start <= t && t < self.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertSide {
    Before,
    After,
}

/// The ordered chord annotation lane. Spans are kept sorted by start and
/// non-overlapping; edits clamp against their neighbors so the list never
/// leaves that shape, even mid-drag.
#[derive(Debug, Default)]
pub struct ChordTimeline {
    spans: Vec<ChordSpan>,
    active: Option<usize>,
    selected: Vec<usize>,
}

impl ChordTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a stored progression, restoring order and the non-overlap
    /// shape in case the stored data predates an editor fix.
    pub fn from_spans(mut spans: Vec<ChordSpan>) -> Self {
        spans.retain(|s| s.start.is_finite() && s.duration.is_finite() && s.duration > 0.0);
        spans.sort_by(|a, b| a.start.total_cmp(&b.start));
        for i in 0..spans.len() {
            if i + 1 < spans.len() {
                let next_start = spans[i + 1].start;
                let span = &mut spans[i];
                span.duration = span.duration.min((next_start - span.start).max(0.0));
            }
        }
        spans.retain(|s| s.duration > 0.0);
        Self {
            spans,
            active: None,
            selected: Vec::new(),
        }
    }

    pub fn spans(&self) -> &[ChordSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn set_active(&mut self, index: Option<usize>) {
        self.active = index.filter(|&i| i < self.spans.len());
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn toggle_selected(&mut self, index: usize) {
        if index >= self.spans.len() {
            return;
        }
        if let Some(pos) = self.selected.iter().position(|&i| i == index) {
            self.selected.swap_remove(pos);
        } else {
            self.selected.push(index);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn set_label(&mut self, index: usize, label: impl Into<String>) {
        if let Some(span) = self.spans.get_mut(index) {
            span.label = label.into();
        }
    }

    /// The span containing `t`, if any. Used to move edit focus to the chord
    /// under the playhead.
    pub fn find_span_at(&self, t: f32) -> Option<(usize, &ChordSpan)> {
        let idx = self.spans.partition_point(|s| s.start <= t);
        let idx = idx.checked_sub(1)?;
        let span = &self.spans[idx];
        span.contains(t).then_some((idx, span))
    }

    /// Apply an in-flight drag or resize. This is a live preview: it clamps
    /// against both neighbors so the lane stays well formed while the mouse
    /// moves, and it never touches the undo history.
    pub fn update_span_live(&mut self, index: usize, start: f32, duration: f32) {
        if index >= self.spans.len() {
            return;
        }
        let prev_end = if index > 0 {
            self.spans[index - 1].end()
        } else {
            0.0
        };
        let next_start = self
            .spans
            .get(index + 1)
            .map(|s| s.start)
            .unwrap_or(f32::INFINITY);

        let mut duration = duration.max(MIN_SPAN_SECS);
        let max_start = (next_start - duration).max(prev_end);
        let start = start.clamp(prev_end, max_start);
        duration = duration.min(next_start - start);

        let span = &mut self.spans[index];
        span.start = start;
        span.duration = duration;
    }

    /// Finalize a gesture. The live updates already clamped everything, so
    /// this is a re-sort plus a well-formedness check; the caller snapshots
    /// the pre-gesture state into the history before the gesture starts.
    pub fn commit_edit(&mut self) {
        self.spans.sort_by(|a, b| a.start.total_cmp(&b.start));
        debug_assert!(self.is_well_formed());
    }

    /// Insert an empty-label span next to `index`, taking the free time
    /// between it and its neighbor. With no gap the host span is split in
    /// half instead; with no room at all this is a no-op.
    pub fn insert_at(&mut self, index: usize, side: InsertSide, timeline_end: f32) -> Option<usize> {
        if index >= self.spans.len() {
            return None;
        }
        let (at, span) = match side {
            InsertSide::Before => {
                let prev_end = if index > 0 {
                    self.spans[index - 1].end()
                } else {
                    0.0
                };
                let gap = self.spans[index].start - prev_end;
                if gap >= MIN_SPAN_SECS {
                    (index, ChordSpan::new("", prev_end, gap))
                } else if self.spans[index].duration >= 2.0 * MIN_SPAN_SECS {
                    // split the host span, new chord takes the first half
                    let host = &mut self.spans[index];
                    let half = host.duration / 2.0;
                    let start = host.start;
                    host.start += half;
                    host.duration -= half;
                    (index, ChordSpan::new("", start, half))
                } else {
                    return None;
                }
            }
            InsertSide::After => {
                let host_end = self.spans[index].end();
                let next_start = self
                    .spans
                    .get(index + 1)
                    .map(|s| s.start)
                    .unwrap_or(timeline_end.max(host_end));
                let gap = next_start - host_end;
                if gap >= MIN_SPAN_SECS {
                    (index + 1, ChordSpan::new("", host_end, gap))
                } else if self.spans[index].duration >= 2.0 * MIN_SPAN_SECS {
                    let host = &mut self.spans[index];
                    let half = host.duration / 2.0;
                    host.duration -= half;
                    let start = host.end();
                    (index + 1, ChordSpan::new("", start, half))
                } else {
                    return None;
                }
            }
        };
        self.spans.insert(at, span);
        self.selected.clear();
        self.active = Some(at);
        debug_assert!(self.is_well_formed());
        Some(at)
    }

    /// Delete the edit-focused span.
    pub fn delete_active(&mut self) -> bool {
        let Some(index) = self.active else {
            return false;
        };
        self.spans.remove(index);
        self.active = None;
        self.selected.clear();
        true
    }

    /// Delete every multi-selected span as one atomic batch.
    pub fn delete_selected(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        let mut doomed = std::mem::take(&mut self.selected);
        doomed.sort_unstable();
        doomed.dedup();
        let mut keep = 0usize;
        let mut cursor = 0usize;
        self.spans.retain(|_| {
            let gone = doomed.get(keep).is_some_and(|&d| d == cursor);
            if gone {
                keep += 1;
            }
            cursor += 1;
            !gone
        });
        self.active = None;
        debug_assert!(self.is_well_formed());
        true
    }

    /// Replace the whole list, e.g. from an undo snapshot.
    pub fn restore(&mut self, spans: Vec<ChordSpan>) {
        self.spans = spans;
        self.selected.clear();
        self.active = self.active.filter(|&i| i < self.spans.len());
    }

    pub fn is_well_formed(&self) -> bool {
        self.spans.windows(2).all(|w| w[0].end() <= w[1].start + 1e-4)
            && self.spans.iter().all(|s| s.duration > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::{History, Snapshot};

    fn three_chords() -> ChordTimeline {
        ChordTimeline::from_spans(vec![
            ChordSpan::new("C", 0.0, 2.0),
            ChordSpan::new("F", 2.0, 2.0),
            ChordSpan::new("G", 6.0, 2.0),
        ])
    }

    #[test]
    fn test_from_spans_restores_order_and_shape() {
        let timeline = ChordTimeline::from_spans(vec![
            ChordSpan::new("G", 4.0, 2.0),
            ChordSpan::new("C", 0.0, 10.0), // overlaps G, gets clamped
            ChordSpan::new("bad", f32::NAN, 1.0),
        ]);
        assert!(timeline.is_well_formed());
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.spans()[0].duration, 4.0);
    }

    #[test]
    fn test_find_span_at() {
        let timeline = three_chords();
        assert_eq!(timeline.find_span_at(0.0).unwrap().0, 0);
        assert_eq!(timeline.find_span_at(3.9).unwrap().0, 1);
        // [start, end) intervals: the boundary belongs to the next span
        assert_eq!(timeline.find_span_at(2.0).unwrap().0, 1);
        assert!(timeline.find_span_at(4.5).is_none());
        assert!(timeline.find_span_at(99.0).is_none());
    }

    #[test]
    fn test_live_update_clamps_against_neighbors() {
        let mut timeline = three_chords();
        // try to drag F over C; it stops at C's end
        timeline.update_span_live(1, 0.5, 2.0);
        assert_eq!(timeline.spans()[1].start, 2.0);
        assert!(timeline.is_well_formed());

        // try to resize F into G; the duration clamps to the gap
        timeline.update_span_live(1, 2.0, 10.0);
        assert_eq!(timeline.spans()[1].end(), 6.0);
        assert!(timeline.is_well_formed());
    }

    #[test]
    fn test_edit_sequences_stay_well_formed() {
        let mut timeline = three_chords();
        for (index, start, duration) in [
            (0usize, -5.0f32, 3.0f32),
            (1, 2.5, 100.0),
            (2, 0.0, 0.0),
            (1, 5.9, 0.3),
            (0, 1.0, 1.0),
        ] {
            timeline.update_span_live(index, start, duration);
            timeline.commit_edit();
            assert!(timeline.is_well_formed(), "broken after edit {index}");
        }
    }

    #[test]
    fn test_insert_uses_gap_then_splits() {
        let mut timeline = three_chords();
        // gap between F (ends 4.0) and G (starts 6.0)
        let at = timeline.insert_at(1, InsertSide::After, 10.0).unwrap();
        assert_eq!(at, 2);
        assert_eq!(timeline.spans()[2].start, 4.0);
        assert_eq!(timeline.spans()[2].end(), 6.0);
        assert!(timeline.is_well_formed());

        // no gap between C and F now; inserting after C splits C
        let at = timeline.insert_at(0, InsertSide::After, 10.0).unwrap();
        assert_eq!(at, 1);
        assert_eq!(timeline.spans()[0].duration, 1.0);
        assert_eq!(timeline.spans()[1].duration, 1.0);
        assert!(timeline.is_well_formed());
    }

    #[test]
    fn test_insert_with_no_room_is_a_noop() {
        let mut timeline = ChordTimeline::from_spans(vec![
            ChordSpan::new("C", 0.0, MIN_SPAN_SECS),
            ChordSpan::new("F", MIN_SPAN_SECS, MIN_SPAN_SECS),
        ]);
        assert!(timeline.insert_at(0, InsertSide::After, 0.2).is_none());
        assert!(timeline.insert_at(1, InsertSide::Before, 0.2).is_none());
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_delete_selected_is_atomic() {
        let mut timeline = three_chords();
        timeline.toggle_selected(0);
        timeline.toggle_selected(2);
        assert!(timeline.delete_selected());
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.spans()[0].label, "F");
        assert!(timeline.is_well_formed());
        assert!(timeline.selected().is_empty());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut timeline = three_chords();
        let mut history = History::new();
        let before = timeline.spans().to_vec();

        // a full drag gesture: snapshot, live moves, commit
        history.push(Snapshot::Chords(timeline.spans().to_vec()));
        timeline.update_span_live(1, 2.5, 1.0);
        timeline.update_span_live(1, 3.0, 1.0);
        timeline.commit_edit();
        let after = timeline.spans().to_vec();
        assert_ne!(before, after);

        assert!(history.undo(&mut timeline));
        assert_eq!(timeline.spans(), &before[..]);
        assert!(history.redo(&mut timeline));
        assert_eq!(timeline.spans(), &after[..]);
        // one undo reverts the whole gesture, so nothing else is left
        assert!(history.undo(&mut timeline));
        assert!(!history.undo(&mut timeline));
    }
}

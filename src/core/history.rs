use crate::core::chord::{ChordSpan, ChordTimeline};

/// One committed snapshot of an undo-able state slice.
///
/// Only the chord lane is undo-able today. Adding another slice means adding
/// a variant; the exhaustive matches below turn a forgotten route into a
/// compile error instead of a silently dropped undo.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Chords(Vec<ChordSpan>),
}

/// Past/future stacks of committed snapshots. Live previews during a drag
/// never land here; a gesture pushes the pre-edit state once, so one undo
/// reverts the whole gesture.
#[derive(Debug, Default)]
pub struct History {
    past: Vec<Snapshot>,
    future: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state as it was before an edit. Like any new edit, this
    /// invalidates the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.past.push(snapshot);
        self.future.clear();
    }

    pub fn undo(&mut self, chords: &mut ChordTimeline) -> bool {
        let Some(snapshot) = self.past.pop() else {
            return false;
        };
        self.future.push(Self::capture_matching(&snapshot, chords));
        Self::route(snapshot, chords);
        true
    }

    pub fn redo(&mut self, chords: &mut ChordTimeline) -> bool {
        let Some(snapshot) = self.future.pop() else {
            return false;
        };
        self.past.push(Self::capture_matching(&snapshot, chords));
        Self::route(snapshot, chords);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Snapshot the current state of the same slice `snapshot` belongs to,
    /// so undo/redo can swap the two.
    fn capture_matching(snapshot: &Snapshot, chords: &ChordTimeline) -> Snapshot {
        match snapshot {
            Snapshot::Chords(_) => Snapshot::Chords(chords.spans().to_vec()),
        }
    }

    /// Hand a popped snapshot back to the store that owns its slice.
    fn route(snapshot: Snapshot, chords: &mut ChordTimeline) {
        match snapshot {
            Snapshot::Chords(state) => chords.restore(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_has_nothing_to_do() {
        let mut history = History::new();
        let mut chords = ChordTimeline::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(!history.undo(&mut chords));
        assert!(!history.redo(&mut chords));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = History::new();
        let mut chords = ChordTimeline::from_spans(vec![ChordSpan::new("C", 0.0, 1.0)]);

        history.push(Snapshot::Chords(chords.spans().to_vec()));
        chords.update_span_live(0, 2.0, 1.0);
        chords.commit_edit();
        assert!(history.undo(&mut chords));
        assert!(history.can_redo());

        history.push(Snapshot::Chords(chords.spans().to_vec()));
        assert!(!history.can_redo());
    }
}

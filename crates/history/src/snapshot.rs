use log::debug;
use pcedit_core::PointBuffer;
use std::collections::VecDeque;

/// Bounded undo stack of owned point buffers.
///
/// Holds at most `max_history + 1` snapshots: the current state plus
/// `max_history` earlier ones. Pushing past capacity drops the oldest.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: VecDeque<PointBuffer>,
    max_history: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SnapshotHistory {
    pub fn new(max_history: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_history + 1),
            max_history,
        }
    }

    /// Stores a copy of `buffer` and hands the same reference back.
    pub fn push<'b>(&mut self, buffer: &'b PointBuffer) -> &'b PointBuffer {
        self.entries.push_back(buffer.clone());
        let mut evicted = 0;
        while self.entries.len() > self.max_history + 1 {
            self.entries.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            debug!(
                "history full, evicted {} snapshot(s), {} kept",
                evicted,
                self.entries.len()
            );
        }
        buffer
    }

    /// Removes and returns the most recent snapshot.
    pub fn pop(&mut self) -> Option<PointBuffer> {
        self.entries.pop_back()
    }

    /// Drops the current snapshot and returns the one beneath it, which stays
    /// stored as the new current. `None`, with nothing changed, when fewer
    /// than two snapshots exist.
    pub fn undo(&mut self) -> Option<PointBuffer> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.pop_back();
        self.entries.back().cloned()
    }

    /// The most recent snapshot.
    pub fn current(&self) -> Option<&PointBuffer> {
        self.entries.back()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Takes effect on the next push; stored snapshots are kept until then.
    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcedit_core::PointCloudHeader;
    use proptest::prelude::*;

    fn buffer(tag: f32) -> PointBuffer {
        PointBuffer::from_positions(&PointCloudHeader::xyz(1), &[[tag, 0.0, 0.0]]).unwrap()
    }

    fn tag(buffer: &PointBuffer) -> f32 {
        buffer.positions().unwrap().get(0)[0]
    }

    #[test]
    fn push_returns_the_same_buffer() {
        let mut history = SnapshotHistory::new(3);
        let b = buffer(1.0);
        assert!(std::ptr::eq(history.push(&b), &b));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut history = SnapshotHistory::new(3);
        let mut b = buffer(1.0);
        history.push(&b);
        b.positions_mut().unwrap().set(0, [9.0, 9.0, 9.0]);
        assert_eq!(tag(history.current().unwrap()), 1.0);
    }

    #[test]
    fn overflow_keeps_max_plus_one() {
        let max = 3;
        let mut history = SnapshotHistory::new(max);
        for i in 0..max + 2 {
            history.push(&buffer(i as f32));
        }
        assert_eq!(history.len(), max + 1);

        let mut restored = Vec::new();
        while let Some(b) = history.undo() {
            restored.push(tag(&b));
        }
        assert_eq!(restored, vec![3.0, 2.0, 1.0]);
        assert_eq!(tag(history.current().unwrap()), 1.0);
    }

    #[test]
    fn undo_needs_two_snapshots() {
        let mut history = SnapshotHistory::new(3);
        assert!(history.undo().is_none());
        history.push(&buffer(5.0));
        assert!(history.undo().is_none());
        assert_eq!(history.len(), 1);
        assert_eq!(tag(history.current().unwrap()), 5.0);
    }

    #[test]
    fn pop_removes_the_latest() {
        let mut history = SnapshotHistory::new(3);
        history.push(&buffer(1.0));
        history.push(&buffer(2.0));
        assert_eq!(tag(&history.pop().unwrap()), 2.0);
        assert_eq!(tag(&history.pop().unwrap()), 1.0);
        assert!(history.pop().is_none());
    }

    #[test]
    fn shrinking_max_applies_on_next_push() {
        let mut history = SnapshotHistory::new(5);
        for i in 0..4 {
            history.push(&buffer(i as f32));
        }
        history.set_max_history(1);
        assert_eq!(history.len(), 4);
        history.push(&buffer(4.0));
        assert_eq!(history.len(), 2);
        assert_eq!(tag(&history.undo().unwrap()), 3.0);
    }

    #[test]
    fn zero_max_keeps_only_current() {
        let mut history = SnapshotHistory::new(0);
        history.push(&buffer(1.0));
        history.push(&buffer(2.0));
        assert_eq!(history.len(), 1);
        assert!(history.undo().is_none());
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(max in 0usize..8, pushes in 0usize..24) {
            let mut history = SnapshotHistory::new(max);
            for i in 0..pushes {
                history.push(&buffer(i as f32));
                prop_assert!(history.len() <= max + 1);
            }
            prop_assert_eq!(history.len(), pushes.min(max + 1));
        }
    }
}

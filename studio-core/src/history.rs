//! Undo/redo as explicit snapshots of (items, render state).
//!
//! ```text
//! capture ─► [s0, s1, s2, s3]      cursor = 3
//! undo    ─► [s0, s1, s2 | s3]     cursor = 2  (s3 is the redo tail)
//! capture ─► [s0, s1, s2, s4]      redo tail discarded
//! ```
//!
//! Every snapshot carries a monotonic step number. The history is bounded:
//! once full, the oldest snapshot is dropped.

use std::collections::{HashMap, VecDeque};

use crate::item::{ItemId, ItemList};
use crate::render_state::RenderState;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// One consistent (items, render state) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Monotonic step number.
    pub step: u64,
    /// Items in z-order.
    pub items: ItemList,
    /// Render state for every item.
    pub render: HashMap<ItemId, RenderState>,
}

/// Bounded snapshot history with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    cursor: usize,
    next_step: u64,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history with the default limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty history keeping at most `limit` snapshots.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            next_step: 0,
            limit: limit.max(1),
        }
    }

    /// Record the current state. Any redo tail is discarded.
    ///
    /// Returns the step number assigned.
    pub fn capture(&mut self, items: &ItemList, render: HashMap<ItemId, RenderState>) -> u64 {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        if self.snapshots.len() >= self.limit {
            self.snapshots.pop_front();
        }
        let step = self.next_step;
        self.next_step += 1;
        self.snapshots.push_back(Snapshot {
            step,
            items: items.clone(),
            render,
        });
        self.cursor = self.snapshots.len() - 1;
        step
    }

    /// Step back, returning the snapshot to restore.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward, returning the snapshot to restore.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    /// Whether an earlier snapshot exists.
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a later snapshot exists.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Step number of the snapshot under the cursor.
    #[must_use]
    pub fn current_step(&self) -> Option<u64> {
        self.snapshots.get(self.cursor).map(|snapshot| snapshot.step)
    }

    /// Number of snapshots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, Point};

    fn list(n: usize) -> ItemList {
        ItemList::from(
            (0..n)
                .map(|_| Item::image("a.png", Point::default()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_undo_redo_walks_snapshots() {
        let mut history = History::new();
        let (one, two) = (list(1), list(2));
        history.capture(&ItemList::new(), HashMap::new());
        history.capture(&one, HashMap::new());
        history.capture(&two, HashMap::new());

        assert_eq!(history.undo().map(|s| s.items.len()), Some(1));
        assert_eq!(history.undo().map(|s| s.items.len()), Some(0));
        assert!(history.undo().is_none());
        assert!(history.can_redo());
        assert_eq!(history.redo().map(|s| s.items.len()), Some(1));
        assert_eq!(history.current_step(), Some(1));
    }

    #[test]
    fn test_capture_discards_redo_tail() {
        let mut history = History::new();
        history.capture(&list(0), HashMap::new());
        history.capture(&list(1), HashMap::new());
        history.undo();
        let step = history.capture(&list(3), HashMap::new());

        assert_eq!(step, 2);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(2);
        history.capture(&list(0), HashMap::new());
        history.capture(&list(1), HashMap::new());
        history.capture(&list(2), HashMap::new());

        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().map(|s| s.step), Some(1));
        assert!(!history.can_undo());
    }
}

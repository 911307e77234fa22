use crate::element::Element;
use crate::scene::Scene;

/// Default cap on the undo stack; oldest entries drop past it.
pub const MAX_HISTORY: usize = 50;

/// One immutable deep copy of the elements array.
#[derive(Debug, Clone)]
struct Snapshot {
    elements: Vec<Element>,
    /// Monotonic sequence number; strictly increasing per recorded state.
    seq: u64,
}

/// Snapshot-based undo/redo for the active canvas.
///
/// `record_state` is called once at the start of every mutating gesture;
/// identical consecutive states coalesce. Applying a snapshot swaps the
/// scene's whole elements array, which observers see atomically. The
/// `applying` flag keeps undo/redo application from recording itself.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    capacity: usize,
    next_seq: u64,
    applying: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
            next_seq: 0,
            applying: false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_applying(&self) -> bool {
        self.applying
    }

    /// Push a deep copy of the current elements onto the undo stack and
    /// clear redo. No-op while an undo/redo is being applied, and no-op if
    /// the state equals the top of the stack.
    pub fn record_state(&mut self, scene: &Scene) {
        if self.applying {
            return;
        }
        if let Some(top) = self.undo_stack.last() {
            if top.elements == scene.elements() {
                return;
            }
        }
        let seq = self.bump_seq();
        self.undo_stack.push(Snapshot {
            elements: scene.clone_elements(),
            seq,
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.capacity {
            self.undo_stack.remove(0);
        }
    }

    /// Restore the most recent snapshot. Returns false with the scene
    /// untouched when there is nothing to undo.
    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = Snapshot {
            elements: scene.clone_elements(),
            seq: self.bump_seq(),
        };
        self.redo_stack.push(current);
        self.apply(scene, snapshot);
        true
    }

    /// Symmetric to [`History::undo`].
    pub fn redo(&mut self, scene: &mut Scene) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = Snapshot {
            elements: scene.clone_elements(),
            seq: self.bump_seq(),
        };
        self.undo_stack.push(current);
        self.apply(scene, snapshot);
        true
    }

    /// Cancel path for an in-progress gesture: restore the snapshot taken
    /// at gesture start without touching the redo stack.
    pub fn rollback_last(&mut self, scene: &mut Scene) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        self.apply(scene, snapshot);
        true
    }

    /// Commit path for a gesture that ended with zero net change: the
    /// snapshot taken at gesture start is discarded.
    pub fn discard_if_unchanged(&mut self, scene: &Scene) {
        if let Some(top) = self.undo_stack.last() {
            if top.elements == scene.elements() {
                self.undo_stack.pop();
            }
        }
    }

    /// Dropped when the active canvas changes.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Sequence number of the newest undo entry, if any.
    pub fn last_recorded_seq(&self) -> Option<u64> {
        self.undo_stack.last().map(|s| s.seq)
    }

    fn apply(&mut self, scene: &mut Scene, snapshot: Snapshot) {
        self.applying = true;
        scene.replace_elements(snapshot.elements);
        self.applying = false;
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

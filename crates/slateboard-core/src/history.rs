//! Snapshot-based linear undo/redo.
//!
//! History is a vector of full-state captures with a cursor marking the
//! current one. A commit issued while the cursor sits before the end
//! truncates everything after it first: the redo branch is lost, not
//! retained. Restores fully replace store content, never merge.

use crate::object::{ObjectId, SceneObject};
use crate::store::SceneStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of snapshots to keep.
const MAX_HISTORY: usize = 50;

/// A full capture of scene store state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SceneSnapshot {
    objects: HashMap<ObjectId, SceneObject>,
    z_order: Vec<ObjectId>,
}

impl SceneSnapshot {
    fn capture(store: &SceneStore) -> Self {
        let (objects, z_order) = store.clone_content();
        Self { objects, z_order }
    }

    fn restore(&self, store: &mut SceneStore) {
        store.replace_content(self.objects.clone(), self.z_order.clone());
    }
}

/// Linear snapshot stack driving undo/redo.
#[derive(Debug)]
pub struct HistoryManager {
    snapshots: Vec<SceneSnapshot>,
    /// Index of the snapshot matching current store state.
    cursor: usize,
}

impl HistoryManager {
    /// Create a history seeded with the store's current state, so N undos
    /// after N commits land back on it.
    pub fn new(store: &SceneStore) -> Self {
        Self {
            snapshots: vec![SceneSnapshot::capture(store)],
            cursor: 0,
        }
    }

    /// Capture current store state: truncate after the cursor, append, and
    /// advance the cursor to the new last index. The oldest snapshot is
    /// evicted past capacity.
    pub fn commit(&mut self, store: &SceneStore) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(SceneSnapshot::capture(store));
        if self.snapshots.len() > MAX_HISTORY {
            self.snapshots.remove(0);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot, fully replacing store content.
    /// Returns false (and does nothing) at the start of history.
    pub fn undo(&mut self, store: &mut SceneStore) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.snapshots[self.cursor].restore(store);
        true
    }

    /// Step forward one snapshot, fully replacing store content.
    /// Returns false (and does nothing) at the end of history.
    pub fn redo(&mut self, store: &mut SceneStore) -> bool {
        if self.cursor + 1 >= self.snapshots.len() {
            return false;
        }
        self.cursor += 1;
        self.snapshots[self.cursor].restore(store);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

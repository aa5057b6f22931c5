//! Group-cascading movement synchronization.
//!
//! Dragging a group anchor must move every member by the identical delta,
//! without compounding across frames and without affecting independent
//! member drags. The baseline protocol: record the anchor position on
//! drag-start; each frame applies only `current - baseline` to the members
//! and then resets the baseline to `current`. The cancel path clears the
//! baseline when a drag is dropped without a clean drag-end, so a stale
//! baseline can never corrupt a later drag.

use crate::object::{GroupId, ObjectId};
use crate::store::SceneStore;
use kurbo::{Point, Vec2};

/// Per-drag baseline for an anchor.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    object: ObjectId,
    position: Point,
}

/// Propagates an anchor's per-frame position delta to its group members.
#[derive(Debug, Default)]
pub struct MovementSync {
    baseline: Option<Baseline>,
}

impl MovementSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the baseline if the dragged object is a group anchor.
    /// Plain member drags get no baseline and never cascade.
    pub fn begin_drag(&mut self, store: &SceneStore, id: ObjectId) {
        self.baseline = store
            .get(id)
            .filter(|o| o.is_group_anchor)
            .map(|o| Baseline {
                object: id,
                position: o.position(),
            });
    }

    /// Apply one drag frame: move the dragged object to `position`, and if
    /// it is the baselined anchor, translate every member by the frame's
    /// incremental delta. Returns the ids of all moved objects.
    pub fn drag_frame(
        &mut self,
        store: &mut SceneStore,
        id: ObjectId,
        position: Point,
    ) -> Vec<ObjectId> {
        let Some((group, is_anchor)) = store.get(id).map(|o| (o.group, o.is_group_anchor)) else {
            return Vec::new();
        };
        if let Some(object) = store.get_mut(id) {
            object.set_position(position);
        }
        let mut moved = vec![id];

        let cascades = is_anchor
            && self
                .baseline
                .is_some_and(|baseline| baseline.object == id);
        if let (true, Some(gid), Some(baseline)) = (cascades, group, self.baseline) {
            let delta = position - baseline.position;
            if delta.x != 0.0 || delta.y != 0.0 {
                let members: Vec<ObjectId> = store
                    .iter_ordered()
                    .filter(|o| o.group == Some(gid) && o.id != id)
                    .map(|o| o.id)
                    .collect();
                for mid in members {
                    if let Some(member) = store.get_mut(mid) {
                        member.translate(delta);
                    }
                    moved.push(mid);
                }
            }
            // Each frame contributes only its incremental delta.
            self.baseline = Some(Baseline {
                object: id,
                position,
            });
        }
        moved
    }

    /// Discard the baseline on drag-end or selection-clear.
    pub fn end_drag(&mut self) {
        self.baseline = None;
    }

    /// Leave/blur fallback for drags dropped without a clean drag-end.
    pub fn cancel(&mut self) {
        self.baseline = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }
}

/// Move every member of a group by a delta directly.
/// For non-interactive callers that have no drag state to infer from.
pub fn move_group_together(store: &mut SceneStore, group: GroupId, delta: Vec2) {
    let members: Vec<ObjectId> = store
        .iter_ordered()
        .filter(|o| o.group == Some(group))
        .map(|o| o.id)
        .collect();
    for mid in members {
        if let Some(member) = store.get_mut(mid) {
            member.translate(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupManager;
    use crate::object::{ObjectKind, SceneObject};
    use crate::store::SceneStore;

    /// Group with the anchor at (100,100) sized 400x300 and a text member
    /// at (300,250).
    fn layer_one(store: &mut SceneStore, groups: &mut GroupManager) -> (ObjectId, ObjectId) {
        let gid = groups.create_group(store, Some("Layer 1".into()));
        let anchor_id = groups.anchor_of(store, gid).unwrap().id;
        {
            let anchor = store.get_mut(anchor_id).unwrap();
            anchor.set_position(Point::new(100.0, 100.0));
            anchor.width = 400.0;
            anchor.height = 300.0;
        }
        let mut text = SceneObject::new(
            ObjectKind::Text {
                content: "title".into(),
                font_size: 24.0,
            },
            Point::new(300.0, 250.0),
        );
        text.group = Some(gid);
        let text_id = store.add_object(text);
        (anchor_id, text_id)
    }

    #[test]
    fn test_anchor_drag_moves_member_by_same_delta() {
        let mut store = SceneStore::new();
        let mut groups = GroupManager::new();
        let (anchor, text) = layer_one(&mut store, &mut groups);

        let mut sync = MovementSync::new();
        sync.begin_drag(&store, anchor);
        sync.drag_frame(&mut store, anchor, Point::new(150.0, 120.0));

        assert_eq!(store.get(anchor).unwrap().position(), Point::new(150.0, 120.0));
        assert_eq!(store.get(text).unwrap().position(), Point::new(350.0, 270.0));
    }

    #[test]
    fn test_delta_is_incremental_across_frames() {
        let mut store = SceneStore::new();
        let mut groups = GroupManager::new();
        let (anchor, text) = layer_one(&mut store, &mut groups);

        let mut sync = MovementSync::new();
        sync.begin_drag(&store, anchor);
        sync.drag_frame(&mut store, anchor, Point::new(110.0, 100.0));
        sync.drag_frame(&mut store, anchor, Point::new(120.0, 105.0));
        sync.drag_frame(&mut store, anchor, Point::new(125.0, 110.0));

        // Total anchor delta is (25,10); the member moved by exactly that,
        // not by the sum of cumulative deltas.
        assert_eq!(store.get(text).unwrap().position(), Point::new(325.0, 260.0));
    }

    #[test]
    fn test_member_drag_moves_no_sibling() {
        let mut store = SceneStore::new();
        let mut groups = GroupManager::new();
        let (anchor, text) = layer_one(&mut store, &mut groups);

        let mut sync = MovementSync::new();
        sync.begin_drag(&store, text);
        assert!(!sync.has_baseline());
        sync.drag_frame(&mut store, text, Point::new(10.0, 10.0));

        assert_eq!(store.get(text).unwrap().position(), Point::new(10.0, 10.0));
        assert_eq!(store.get(anchor).unwrap().position(), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_cancel_clears_baseline() {
        let mut store = SceneStore::new();
        let mut groups = GroupManager::new();
        let (anchor, text) = layer_one(&mut store, &mut groups);

        let mut sync = MovementSync::new();
        sync.begin_drag(&store, anchor);
        sync.cancel();
        assert!(!sync.has_baseline());

        // A later frame without a baseline moves only the dragged object.
        sync.drag_frame(&mut store, anchor, Point::new(500.0, 500.0));
        assert_eq!(store.get(text).unwrap().position(), Point::new(300.0, 250.0));
    }

    #[test]
    fn test_move_group_together() {
        let mut store = SceneStore::new();
        let mut groups = GroupManager::new();
        let (anchor, text) = layer_one(&mut store, &mut groups);
        let gid = store.get(anchor).unwrap().group.unwrap();

        move_group_together(&mut store, gid, Vec2::new(-20.0, 35.0));
        assert_eq!(store.get(anchor).unwrap().position(), Point::new(80.0, 135.0));
        assert_eq!(store.get(text).unwrap().position(), Point::new(280.0, 285.0));
    }

    #[test]
    fn test_stale_id_frame_is_noop() {
        let mut store = SceneStore::new();
        let mut sync = MovementSync::new();
        let moved = sync.drag_frame(&mut store, uuid::Uuid::new_v4(), Point::ZERO);
        assert!(moved.is_empty());
    }
}

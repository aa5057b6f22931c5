//! Layout group lifecycle and cascading visibility/lock.
//!
//! A group is defined by its anchor: the single member object with
//! `is_group_anchor` set, which carries the group's display name and is
//! authoritative for its visibility/lock state. Membership lives as a
//! foreign key on each member; the [`LayoutGroup`] listing is derived from
//! the store on demand, so there are no bidirectional references to keep
//! in sync across undo restores.

use crate::error::{CoreError, CoreResult};
use crate::object::{GroupId, ObjectId, ObjectKind, SceneObject};
use crate::store::SceneStore;
use kurbo::Point;
use log::{debug, warn};
use std::collections::HashMap;
use uuid::Uuid;

/// Derived view of a layout group, consumed by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutGroup {
    pub id: GroupId,
    /// Display name (carried by the anchor).
    pub name: String,
    /// The anchor object's id.
    pub anchor: ObjectId,
    /// Member ids in store order. The anchor is a member too.
    pub members: Vec<ObjectId>,
    /// Derived from the anchor.
    pub visible: bool,
    /// Derived from the anchor's movement lock.
    pub locked: bool,
    /// UI-only expand/collapse state.
    pub collapsed: bool,
}

/// Group lifecycle manager.
///
/// Holds only what cannot be derived from the store: group creation order,
/// the UI-only collapse flags, and the auto-name counter. After a history
/// restore, [`GroupManager::rebuild`] reconciles this with the restored
/// objects.
#[derive(Debug, Default)]
pub struct GroupManager {
    /// Group ids in creation order.
    order: Vec<GroupId>,
    /// UI-only expand/collapse state; not part of snapshots.
    collapsed: HashMap<GroupId, bool>,
    /// Counter for auto-generated layer names.
    next_layer_number: u32,
}

impl GroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group and its anchor object. Returns the group id.
    ///
    /// Without an explicit name the group is auto-named "Layer N".
    pub fn create_group(&mut self, store: &mut SceneStore, name: Option<String>) -> GroupId {
        let id = Uuid::new_v4();
        self.next_layer_number += 1;
        let name = name.unwrap_or_else(|| format!("Layer {}", self.next_layer_number));

        let mut anchor = SceneObject::new(ObjectKind::Rectangle { corner_radius: 0.0 }, Point::ZERO);
        anchor.name = name;
        anchor.group = Some(id);
        anchor.is_group_anchor = true;
        store.add_object(anchor);

        self.order.push(id);
        id
    }

    /// Delete a group, cascading to all members.
    ///
    /// Returns the removed object ids and, when this was the last group,
    /// the id of the auto-recreated default group. The scene always keeps
    /// at least one group alive.
    pub fn delete_group(
        &mut self,
        store: &mut SceneStore,
        id: GroupId,
    ) -> (Vec<ObjectId>, Option<GroupId>) {
        if !self.order.contains(&id) {
            debug!("delete of unknown group {id} ignored");
            return (Vec::new(), None);
        }
        let removed: Vec<ObjectId> = store
            .iter_ordered()
            .filter(|o| o.group == Some(id))
            .map(|o| o.id)
            .collect();
        for &oid in &removed {
            store.remove_object(oid);
        }
        self.order.retain(|&gid| gid != id);
        self.collapsed.remove(&id);

        let recreated = if self.order.is_empty() {
            Some(self.create_group(store, None))
        } else {
            None
        };
        (removed, recreated)
    }

    /// Flip visibility on the anchor and every member.
    /// Returns the new visibility and the affected member ids.
    pub fn toggle_visibility(
        &self,
        store: &mut SceneStore,
        id: GroupId,
    ) -> Option<(bool, Vec<ObjectId>)> {
        let next = !self.anchor_of(store, id)?.visible;
        let members = self.member_ids(store, id);
        for &mid in &members {
            if let Some(object) = store.get_mut(mid) {
                object.visible = next;
            }
        }
        Some((next, members))
    }

    /// Flip movement/rotation/scaling locks on the anchor and every member.
    /// `selectable` stays true so locked objects remain inspectable.
    /// Returns the new locked state and the affected member ids.
    pub fn toggle_lock(
        &self,
        store: &mut SceneStore,
        id: GroupId,
    ) -> Option<(bool, Vec<ObjectId>)> {
        let next = !self.anchor_of(store, id)?.locks.movement;
        let members = self.member_ids(store, id);
        for &mid in &members {
            if let Some(object) = store.get_mut(mid) {
                object.locks.set_all(next);
                object.selectable = true;
            }
        }
        Some((next, members))
    }

    /// Rename the group by renaming its anchor only.
    pub fn rename(&self, store: &mut SceneStore, id: GroupId, name: &str) -> bool {
        let Some(anchor_id) = self.anchor_of(store, id).map(|a| a.id) else {
            debug!("rename of unknown group {id} ignored");
            return false;
        };
        if let Some(anchor) = store.get_mut(anchor_id) {
            anchor.name = name.to_string();
        }
        true
    }

    /// Re-parent a non-anchor object to another group (or out of any group).
    /// The object immediately inherits the target's visibility/lock state.
    pub fn transfer_member(
        &self,
        store: &mut SceneStore,
        object_id: ObjectId,
        target: Option<GroupId>,
    ) -> CoreResult<()> {
        let Some(object) = store.get(object_id) else {
            debug!("transfer of unknown object {object_id} ignored");
            return Ok(());
        };
        if object.is_group_anchor {
            warn!("rejected transfer of group anchor {object_id}");
            return Err(CoreError::InvalidOperation(
                "a group anchor cannot be transferred".into(),
            ));
        }
        match target {
            Some(gid) => {
                let Some(anchor) = self.anchor_of(store, gid) else {
                    debug!("transfer into unknown group {gid} ignored");
                    return Ok(());
                };
                let (visible, locks) = (anchor.visible, anchor.locks);
                if let Some(object) = store.get_mut(object_id) {
                    object.group = Some(gid);
                    object.visible = visible;
                    object.locks = locks;
                    object.selectable = true;
                }
            }
            None => {
                if let Some(object) = store.get_mut(object_id) {
                    object.group = None;
                }
            }
        }
        Ok(())
    }

    /// Toggle the UI-only collapse flag.
    pub fn set_collapsed(&mut self, id: GroupId, collapsed: bool) {
        if self.order.contains(&id) {
            self.collapsed.insert(id, collapsed);
        }
    }

    /// Derived group listing in creation order, members in store order.
    pub fn list(&self, store: &SceneStore) -> Vec<LayoutGroup> {
        self.order
            .iter()
            .filter_map(|&id| {
                let anchor = self.anchor_of(store, id)?;
                Some(LayoutGroup {
                    id,
                    name: anchor.name.clone(),
                    anchor: anchor.id,
                    visible: anchor.visible,
                    locked: anchor.locks.movement,
                    members: self.member_ids(store, id),
                    collapsed: self.collapsed.get(&id).copied().unwrap_or(false),
                })
            })
            .collect()
    }

    /// The group's anchor object, if the group exists.
    pub fn anchor_of<'a>(&self, store: &'a SceneStore, id: GroupId) -> Option<&'a SceneObject> {
        store
            .iter_ordered()
            .find(|o| o.group == Some(id) && o.is_group_anchor)
    }

    /// Member ids (anchor included) in store order.
    pub fn member_ids(&self, store: &SceneStore, id: GroupId) -> Vec<ObjectId> {
        store
            .iter_ordered()
            .filter(|o| o.group == Some(id))
            .map(|o| o.id)
            .collect()
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.order.contains(&id)
    }

    /// First group in creation order.
    pub fn first(&self) -> Option<GroupId> {
        self.order.first().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reconcile with the store after a full-state restore.
    ///
    /// Restored objects carry their original group references, so groups
    /// may have appeared or vanished; creation order is preserved for
    /// survivors and newly restored groups append in store order.
    pub fn rebuild(&mut self, store: &SceneStore) {
        let live: Vec<GroupId> = store
            .iter_ordered()
            .filter(|o| o.is_group_anchor)
            .filter_map(|o| o.group)
            .collect();
        self.order.retain(|gid| live.contains(gid));
        for gid in live {
            if !self.order.contains(&gid) {
                self.order.push(gid);
            }
        }
        let order = &self.order;
        self.collapsed.retain(|gid, _| order.contains(gid));
    }
}

//! The scene editor facade.
//!
//! [`SceneEditor`] owns all scene state and is the single mutation entry
//! point for every collaborating surface: panels call the typed operations,
//! the renderer reports interactions through
//! [`SceneEditor::handle_renderer_event`], and both drain the queued
//! [`RendererCommand`]s afterwards. Everything runs on one thread; a
//! mutation requested while another is still applying is queued as a
//! [`Command`] and runs immediately after the current one completes, so
//! every operation observes fully settled state.
//!
//! History commits happen at interaction boundaries, not per frame: a drag
//! of any length contributes exactly one snapshot, on pointer-up.

use crate::error::{CoreError, CoreResult};
use crate::events::{ChangeEvent, EventBus, SubscriptionId};
use crate::group::{GroupManager, LayoutGroup};
use crate::history::HistoryManager;
use crate::movement::MovementSync;
use crate::object::{GroupId, ObjectId, ObjectKind, ObjectPatch, SceneObject};
use crate::renderer::{RendererCommand, RendererEvent};
use crate::snap::{GuidelineCandidate, SnapConfig, SnapEngine};
use crate::storage::SceneBlob;
use crate::store::SceneStore;
use kurbo::{Point, Rect, Vec2};
use log::{debug, warn};
use std::collections::VecDeque;

/// Offset applied to a cloned object so the copy is visibly distinct.
const CLONE_OFFSET: Vec2 = Vec2::new(10.0, 10.0);

/// A deferred mutation, queued when it arrives mid-mutation.
#[derive(Debug, Clone)]
pub enum Command {
    AddObject {
        kind: ObjectKind,
        position: Option<Point>,
    },
    UpdateObject {
        id: ObjectId,
        patch: ObjectPatch,
    },
    DeleteObject {
        id: ObjectId,
    },
    CloneObject {
        id: ObjectId,
    },
    Reorder {
        id: ObjectId,
        index: usize,
    },
    CreateGroup {
        name: Option<String>,
    },
    DeleteGroup {
        id: GroupId,
    },
    RenameGroup {
        id: GroupId,
        name: String,
    },
    ToggleGroupVisibility {
        id: GroupId,
    },
    ToggleGroupLock {
        id: GroupId,
    },
    TransferMember {
        id: ObjectId,
        target: Option<GroupId>,
    },
    Select {
        id: ObjectId,
    },
    ClearSelection,
    Undo,
    Redo,
}

/// Owner of all scene state and the single mutation entry point.
#[derive(Debug)]
pub struct SceneEditor {
    store: SceneStore,
    groups: GroupManager,
    history: HistoryManager,
    movement: MovementSync,
    snap: SnapEngine,
    snap_config: SnapConfig,
    selection: Option<ObjectId>,
    /// Group that newly added objects join.
    active_group: Option<GroupId>,
    bus: EventBus,
    /// Instructions for the renderer to drain and apply.
    renderer_out: VecDeque<RendererCommand>,
    /// Mutations that arrived while another was applying.
    pending: VecDeque<Command>,
    in_flight: bool,
}

impl Default for SceneEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneEditor {
    pub fn new() -> Self {
        Self::with_config(SnapConfig::default())
    }

    pub fn with_config(snap_config: SnapConfig) -> Self {
        let store = SceneStore::new();
        let history = HistoryManager::new(&store);
        Self {
            store,
            groups: GroupManager::new(),
            history,
            movement: MovementSync::new(),
            snap: SnapEngine::new(),
            snap_config,
            selection: None,
            active_group: None,
            bus: EventBus::new(),
            renderer_out: VecDeque::new(),
            pending: VecDeque::new(),
            in_flight: false,
        }
    }

    // ----- mutation plumbing -----

    /// Submit a command. Runs immediately unless a mutation is already
    /// applying, in which case it is queued and runs right after.
    pub fn dispatch(&mut self, command: Command) {
        if self.in_flight {
            debug!("mutation queued behind one in flight");
            self.pending.push_back(command);
            return;
        }
        let result = self.guarded(|editor| editor.execute(command));
        if let Err(e) = result {
            warn!("dispatched command rejected: {e}");
        }
    }

    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> CoreResult<T>) -> CoreResult<T> {
        self.in_flight = true;
        let result = f(self);
        self.in_flight = false;
        self.drain_pending();
        result
    }

    fn drain_pending(&mut self) {
        while let Some(command) = self.pending.pop_front() {
            self.in_flight = true;
            let result = self.execute(command);
            self.in_flight = false;
            if let Err(e) = result {
                warn!("queued command rejected: {e}");
            }
        }
    }

    fn execute(&mut self, command: Command) -> CoreResult<()> {
        match command {
            Command::AddObject { kind, position } => self.do_add_object(kind, position).map(|_| ()),
            Command::UpdateObject { id, patch } => self.do_update_object(id, patch),
            Command::DeleteObject { id } => self.do_delete_object(id),
            Command::CloneObject { id } => self.do_clone_object(id).map(|_| ()),
            Command::Reorder { id, index } => self.do_reorder(id, index),
            Command::CreateGroup { name } => self.do_create_group(name).map(|_| ()),
            Command::DeleteGroup { id } => self.do_delete_group(id),
            Command::RenameGroup { id, name } => self.do_rename_group(id, &name),
            Command::ToggleGroupVisibility { id } => self.do_toggle_group_visibility(id),
            Command::ToggleGroupLock { id } => self.do_toggle_group_lock(id),
            Command::TransferMember { id, target } => self.do_transfer_member(id, target),
            Command::Select { id } => self.do_select(id),
            Command::ClearSelection => {
                self.do_clear_selection();
                Ok(())
            }
            Command::Undo => {
                self.restore_step(true);
                Ok(())
            }
            Command::Redo => {
                self.restore_step(false);
                Ok(())
            }
        }
    }

    /// Snapshot the store if anything changed since the last commit.
    fn commit_change(&mut self) {
        if self.store.take_dirty() {
            self.history.commit(&self.store);
        }
    }

    /// Commit any uncommitted change as one history step.
    /// A no-op when nothing changed since the last commit.
    pub fn commit(&mut self) {
        let _ = self.guarded(|editor| {
            editor.commit_change();
            Ok::<_, CoreError>(())
        });
    }

    // ----- object operations -----

    /// Add an object centered on the canvas. Returns its id.
    pub fn add_object(&mut self, kind: ObjectKind) -> CoreResult<ObjectId> {
        self.guarded(|editor| editor.do_add_object(kind, None))
    }

    /// Add an object at an explicit top-left position. Returns its id.
    pub fn add_object_at(&mut self, kind: ObjectKind, position: Point) -> CoreResult<ObjectId> {
        self.guarded(|editor| editor.do_add_object(kind, Some(position)))
    }

    fn do_add_object(&mut self, kind: ObjectKind, position: Option<Point>) -> CoreResult<ObjectId> {
        let gid = self.ensure_active_group();
        let mut object = SceneObject::new(kind, position.unwrap_or(Point::ZERO));
        if position.is_none() {
            let canvas = self.snap_config.canvas_size;
            object.left = (canvas.width - object.width) / 2.0;
            object.top = (canvas.height - object.height) / 2.0;
        }
        object.group = Some(gid);
        // New members inherit the group's current visibility/lock state.
        if let Some(anchor) = self.groups.anchor_of(&self.store, gid) {
            object.visible = anchor.visible;
            object.locks = anchor.locks;
        }
        let id = self.store.add_object(object);
        self.renderer_out.push_back(RendererCommand::Render { id });
        self.commit_change();
        self.bus.emit(&ChangeEvent::Modification { id });
        Ok(id)
    }

    /// Apply a property patch. Unknown ids are a silent no-op.
    pub fn update_object(&mut self, id: ObjectId, patch: ObjectPatch) -> CoreResult<()> {
        self.guarded(|editor| editor.do_update_object(id, patch))
    }

    fn do_update_object(&mut self, id: ObjectId, patch: ObjectPatch) -> CoreResult<()> {
        if !self.store.apply_patch(id, &patch) {
            return Ok(());
        }
        self.renderer_out.push_back(RendererCommand::Render { id });
        self.commit_change();
        self.bus.emit(&ChangeEvent::Modification { id });
        Ok(())
    }

    /// Delete an object. Group anchors cannot be deleted directly; delete
    /// the group instead. Unknown ids are a silent no-op.
    pub fn delete_object(&mut self, id: ObjectId) -> CoreResult<()> {
        self.guarded(|editor| editor.do_delete_object(id))
    }

    fn do_delete_object(&mut self, id: ObjectId) -> CoreResult<()> {
        let Some(object) = self.store.get(id) else {
            debug!("delete of unknown object {id} ignored");
            return Ok(());
        };
        if object.is_group_anchor {
            warn!("rejected direct delete of group anchor {id}");
            return Err(CoreError::InvalidOperation(
                "a group anchor cannot be deleted directly".into(),
            ));
        }
        self.store.remove_object(id);
        self.renderer_out.push_back(RendererCommand::Remove { id });
        if self.selection == Some(id) {
            self.do_clear_selection();
        }
        self.commit_change();
        self.bus.emit(&ChangeEvent::Modification { id });
        Ok(())
    }

    /// Duplicate an object into the same group, slightly offset.
    /// Returns the copy's id, or `None` for an unknown source.
    pub fn clone_object(&mut self, id: ObjectId) -> CoreResult<Option<ObjectId>> {
        self.guarded(|editor| editor.do_clone_object(id))
    }

    fn do_clone_object(&mut self, id: ObjectId) -> CoreResult<Option<ObjectId>> {
        let Some(source) = self.store.get(id) else {
            debug!("clone of unknown object {id} ignored");
            return Ok(None);
        };
        if source.is_group_anchor {
            warn!("rejected clone of group anchor {id}");
            return Err(CoreError::InvalidOperation(
                "a group anchor cannot be cloned".into(),
            ));
        }
        let mut copy = source.clone();
        copy.regenerate_id();
        copy.translate(CLONE_OFFSET);
        let new_id = self.store.add_object(copy);
        self.renderer_out
            .push_back(RendererCommand::Render { id: new_id });
        self.commit_change();
        self.bus.emit(&ChangeEvent::Modification { id: new_id });
        Ok(Some(new_id))
    }

    /// Move an object to a new z-order index (clamped).
    pub fn reorder(&mut self, id: ObjectId, index: usize) -> CoreResult<()> {
        self.guarded(|editor| editor.do_reorder(id, index))
    }

    fn do_reorder(&mut self, id: ObjectId, index: usize) -> CoreResult<()> {
        self.store.set_z_index(id, index);
        let Some(index) = self.store.z_index_of(id) else {
            return Ok(());
        };
        self.renderer_out
            .push_back(RendererCommand::Reorder { id, index });
        self.commit_change();
        self.bus.emit(&ChangeEvent::Modification { id });
        Ok(())
    }

    // ----- group operations -----

    /// Create a group and make it the active one. Returns its id.
    pub fn create_group(&mut self, name: Option<String>) -> CoreResult<GroupId> {
        self.guarded(|editor| editor.do_create_group(name))
    }

    fn do_create_group(&mut self, name: Option<String>) -> CoreResult<GroupId> {
        let gid = self.groups.create_group(&mut self.store, name);
        self.active_group = Some(gid);
        self.size_anchor_to_canvas(gid);
        if let Some(anchor) = self.groups.anchor_of(&self.store, gid) {
            let id = anchor.id;
            self.renderer_out.push_back(RendererCommand::Render { id });
        }
        self.commit_change();
        self.bus.emit(&ChangeEvent::Group { id: gid });
        Ok(gid)
    }

    /// Delete a group and every member. The last group is replaced with a
    /// fresh empty one so the scene always has a place for new objects.
    pub fn delete_group(&mut self, id: GroupId) -> CoreResult<()> {
        self.guarded(|editor| editor.do_delete_group(id))
    }

    fn do_delete_group(&mut self, id: GroupId) -> CoreResult<()> {
        let (removed, recreated) = self.groups.delete_group(&mut self.store, id);
        if removed.is_empty() && recreated.is_none() {
            return Ok(());
        }
        for &oid in &removed {
            self.renderer_out.push_back(RendererCommand::Remove { id: oid });
        }
        if self.selection.is_some_and(|sid| removed.contains(&sid)) {
            self.do_clear_selection();
        }
        if self.active_group == Some(id) {
            self.active_group = recreated.or_else(|| self.groups.first());
        }
        if let Some(new_gid) = recreated {
            self.size_anchor_to_canvas(new_gid);
            if let Some(anchor) = self.groups.anchor_of(&self.store, new_gid) {
                let anchor_id = anchor.id;
                self.renderer_out
                    .push_back(RendererCommand::Render { id: anchor_id });
            }
        }
        self.commit_change();
        self.bus.emit(&ChangeEvent::Group { id });
        if let Some(new_gid) = recreated {
            self.bus.emit(&ChangeEvent::Group { id: new_gid });
        }
        Ok(())
    }

    /// Rename a group. Unknown groups are a silent no-op.
    pub fn rename_group(&mut self, id: GroupId, name: &str) -> CoreResult<()> {
        let name = name.to_string();
        self.guarded(|editor| editor.do_rename_group(id, &name))
    }

    fn do_rename_group(&mut self, id: GroupId, name: &str) -> CoreResult<()> {
        if !self.groups.rename(&mut self.store, id, name) {
            return Ok(());
        }
        self.commit_change();
        self.bus.emit(&ChangeEvent::Group { id });
        Ok(())
    }

    /// Flip a group's visibility, cascading to every member. Hiding the
    /// group clears the selection if the selected object is affected.
    pub fn toggle_group_visibility(&mut self, id: GroupId) -> CoreResult<()> {
        self.guarded(|editor| editor.do_toggle_group_visibility(id))
    }

    fn do_toggle_group_visibility(&mut self, id: GroupId) -> CoreResult<()> {
        let Some((visible, members)) = self.groups.toggle_visibility(&mut self.store, id) else {
            debug!("visibility toggle for unknown group {id} ignored");
            return Ok(());
        };
        if !visible && self.selection.is_some_and(|sid| members.contains(&sid)) {
            self.do_clear_selection();
        }
        for &mid in &members {
            self.renderer_out.push_back(RendererCommand::Render { id: mid });
        }
        self.commit_change();
        for &mid in &members {
            self.bus.emit(&ChangeEvent::Visibility { id: mid, visible });
        }
        self.bus.emit(&ChangeEvent::Group { id });
        Ok(())
    }

    /// Flip a group's locks, cascading to every member. Locked objects stay
    /// selectable, so the selection is kept.
    pub fn toggle_group_lock(&mut self, id: GroupId) -> CoreResult<()> {
        self.guarded(|editor| editor.do_toggle_group_lock(id))
    }

    fn do_toggle_group_lock(&mut self, id: GroupId) -> CoreResult<()> {
        let Some((locked, members)) = self.groups.toggle_lock(&mut self.store, id) else {
            debug!("lock toggle for unknown group {id} ignored");
            return Ok(());
        };
        for &mid in &members {
            self.renderer_out.push_back(RendererCommand::Render { id: mid });
        }
        self.commit_change();
        for &mid in &members {
            let event = if locked {
                ChangeEvent::Lock { id: mid }
            } else {
                ChangeEvent::Unlock { id: mid }
            };
            self.bus.emit(&event);
        }
        self.bus.emit(&ChangeEvent::Group { id });
        Ok(())
    }

    /// Re-parent an object to another group, or out of any group.
    pub fn transfer_member(&mut self, id: ObjectId, target: Option<GroupId>) -> CoreResult<()> {
        self.guarded(|editor| editor.do_transfer_member(id, target))
    }

    fn do_transfer_member(&mut self, id: ObjectId, target: Option<GroupId>) -> CoreResult<()> {
        self.groups.transfer_member(&mut self.store, id, target)?;
        if !self.store.is_dirty() {
            return Ok(());
        }
        self.renderer_out.push_back(RendererCommand::Render { id });
        self.commit_change();
        self.bus.emit(&ChangeEvent::Modification { id });
        if let Some(gid) = target {
            self.bus.emit(&ChangeEvent::Group { id: gid });
        }
        Ok(())
    }

    /// Group that newly added objects join, creating the first group on
    /// demand.
    fn ensure_active_group(&mut self) -> GroupId {
        if let Some(gid) = self.active_group.filter(|&g| self.groups.contains(g)) {
            return gid;
        }
        let gid = match self.groups.first() {
            Some(gid) => gid,
            None => {
                let gid = self.groups.create_group(&mut self.store, None);
                self.size_anchor_to_canvas(gid);
                if let Some(anchor) = self.groups.anchor_of(&self.store, gid) {
                    let id = anchor.id;
                    self.renderer_out.push_back(RendererCommand::Render { id });
                }
                gid
            }
        };
        self.active_group = Some(gid);
        gid
    }

    /// A group's anchor is a full-surface rectangle.
    fn size_anchor_to_canvas(&mut self, gid: GroupId) {
        let Some(anchor_id) = self.groups.anchor_of(&self.store, gid).map(|a| a.id) else {
            return;
        };
        let canvas = self.snap_config.canvas_size;
        if let Some(anchor) = self.store.get_mut(anchor_id) {
            anchor.width = canvas.width;
            anchor.height = canvas.height;
        }
    }

    // ----- selection -----

    /// Select an object. Unknown or unselectable objects are a no-op.
    pub fn select(&mut self, id: ObjectId) -> CoreResult<()> {
        self.guarded(|editor| editor.do_select(id))
    }

    fn do_select(&mut self, id: ObjectId) -> CoreResult<()> {
        let Some(object) = self.store.get(id) else {
            debug!("select of unknown object {id} ignored");
            return Ok(());
        };
        if !object.selectable || self.selection == Some(id) {
            return Ok(());
        }
        self.selection = Some(id);
        self.renderer_out
            .push_back(RendererCommand::SetActive { id: Some(id) });
        self.bus.emit(&ChangeEvent::Selection { id: Some(id) });
        Ok(())
    }

    /// Clear the selection and any drag baseline tied to it.
    pub fn clear_selection(&mut self) {
        let _ = self.guarded(|editor| {
            editor.do_clear_selection();
            Ok::<_, CoreError>(())
        });
    }

    fn do_clear_selection(&mut self) {
        if self.selection.take().is_none() {
            return;
        }
        self.movement.end_drag();
        self.renderer_out
            .push_back(RendererCommand::SetActive { id: None });
        self.bus.emit(&ChangeEvent::Selection { id: None });
    }

    // ----- undo/redo -----

    /// Step history backward. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        self.guarded(|editor| Ok::<_, CoreError>(editor.restore_step(true)))
            .unwrap_or(false)
    }

    /// Step history forward. Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        self.guarded(|editor| Ok::<_, CoreError>(editor.restore_step(false)))
            .unwrap_or(false)
    }

    fn restore_step(&mut self, backward: bool) -> bool {
        let before: Vec<ObjectId> = self.store.ids_ordered().to_vec();
        let stepped = if backward {
            self.history.undo(&mut self.store)
        } else {
            self.history.redo(&mut self.store)
        };
        if !stepped {
            debug!("history step ignored at {} of history", if backward { "start" } else { "end" });
            return false;
        }
        self.snap.end_drag();
        self.movement.end_drag();

        for id in before {
            if !self.store.contains(id) {
                self.renderer_out.push_back(RendererCommand::Remove { id });
            }
        }
        for &id in self.store.ids_ordered() {
            self.renderer_out.push_back(RendererCommand::Render { id });
        }

        // Restored objects carry their group references; reconcile the
        // registry and revalidate everything pointing into the store.
        self.groups.rebuild(&self.store);
        if self.selection.is_some_and(|sid| !self.store.contains(sid)) {
            self.selection = None;
            self.renderer_out
                .push_back(RendererCommand::SetActive { id: None });
            self.bus.emit(&ChangeEvent::Selection { id: None });
        }
        if self.active_group.is_none_or(|gid| !self.groups.contains(gid)) {
            self.active_group = self.groups.first();
        }
        let groups: Vec<GroupId> = self.groups.list(&self.store).iter().map(|g| g.id).collect();
        for gid in groups {
            self.bus.emit(&ChangeEvent::Group { id: gid });
        }
        true
    }

    // ----- renderer boundary -----

    /// Process one renderer notification.
    ///
    /// Drag frames flow through snapping and group cascade without
    /// committing history; pointer-up finishes the drag and commits once.
    /// Events naming unknown ids are tolerated, the renderer may still
    /// flush interactions for objects the core already removed.
    pub fn handle_renderer_event(&mut self, event: RendererEvent) {
        let _ = self.guarded(|editor| {
            editor.do_handle_renderer_event(event);
            Ok::<_, CoreError>(())
        });
    }

    fn do_handle_renderer_event(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::ObjectMoving { id, left, top } => self.drag_frame(id, left, top),
            RendererEvent::DragEnded | RendererEvent::PointerUp { .. } => self.finish_drag(),
            RendererEvent::DragCancelled => self.cancel_drag(),
            RendererEvent::ObjectModified { id } => {
                if self.store.contains(id) {
                    self.commit_change();
                    self.bus.emit(&ChangeEvent::Modification { id });
                }
            }
            RendererEvent::SelectionCreated { id } => {
                if let Err(e) = self.do_select(id) {
                    warn!("selection from renderer rejected: {e}");
                }
            }
            RendererEvent::SelectionCleared => self.do_clear_selection(),
            RendererEvent::ObjectAdded { id } | RendererEvent::ObjectRemoved { id } => {
                debug!("renderer acknowledged object {id}");
            }
            RendererEvent::PointerDown { .. } | RendererEvent::PointerMove { .. } => {}
        }
    }

    fn drag_frame(&mut self, id: ObjectId, left: f64, top: f64) {
        if !self.store.contains(id) {
            debug!("move event for unknown object {id} ignored");
            return;
        }
        let size = match self.store.get(id) {
            Some(object) if !object.locks.movement => object.bounds().size(),
            Some(_) => {
                debug!("move of movement-locked object {id} ignored");
                return;
            }
            None => return,
        };
        if self.snap.dragging() != Some(id) {
            let config = self.snap_config;
            self.snap.begin_drag(&self.store, &config, id);
            self.movement.begin_drag(&self.store, id);
        }
        let config = self.snap_config;
        let proposed = Rect::from_origin_size(Point::new(left, top), size);
        let adjusted = self.snap.adjust(&config, proposed);

        let moved = self
            .movement
            .drag_frame(&mut self.store, id, Point::new(adjusted.left, adjusted.top));
        // The renderer repositions the dragged visual itself; cascaded
        // members and snap corrections need explicit re-renders.
        for mid in moved {
            if mid != id {
                self.renderer_out.push_back(RendererCommand::Render { id: mid });
            }
        }
        if adjusted.left != left || adjusted.top != top {
            self.renderer_out.push_back(RendererCommand::Render { id });
        }
    }

    fn finish_drag(&mut self) {
        let dragged = self.snap.dragging();
        self.snap.end_drag();
        self.movement.end_drag();
        self.commit_change();
        if let Some(id) = dragged {
            self.bus.emit(&ChangeEvent::Modification { id });
        }
    }

    /// Leave/blur fallback: collapse drag state and commit whatever the
    /// frames already applied.
    fn cancel_drag(&mut self) {
        self.snap.end_drag();
        self.movement.cancel();
        self.commit_change();
    }

    /// Drain the queued renderer instructions.
    pub fn take_renderer_commands(&mut self) -> Vec<RendererCommand> {
        self.renderer_out.drain(..).collect()
    }

    // ----- snapshots -----

    /// Encode the scene into a persistable snapshot blob.
    pub fn save_snapshot(&self) -> CoreResult<Vec<u8>> {
        SceneBlob::capture(&self.store).encode()
    }

    /// Replace the scene from a snapshot blob.
    ///
    /// The blob is fully decoded and validated first; on any error the
    /// current scene is left untouched. A successful load resets history,
    /// selection and drag state.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> CoreResult<()> {
        self.guarded(|editor| editor.do_load_snapshot(bytes))
    }

    fn do_load_snapshot(&mut self, bytes: &[u8]) -> CoreResult<()> {
        let blob = SceneBlob::decode(bytes)?;

        for &id in self.store.ids_ordered() {
            self.renderer_out.push_back(RendererCommand::Remove { id });
        }
        self.store.replace_with_objects(blob.into_objects());
        for &id in self.store.ids_ordered() {
            self.renderer_out.push_back(RendererCommand::Render { id });
        }
        self.renderer_out
            .push_back(RendererCommand::SetActive { id: None });

        self.groups.rebuild(&self.store);
        self.history = HistoryManager::new(&self.store);
        self.selection = None;
        self.active_group = self.groups.first();
        self.snap.end_drag();
        self.movement.end_drag();

        self.bus.emit(&ChangeEvent::Selection { id: None });
        let groups: Vec<GroupId> = self.groups.list(&self.store).iter().map(|g| g.id).collect();
        for gid in groups {
            self.bus.emit(&ChangeEvent::Group { id: gid });
        }
        Ok(())
    }

    // ----- queries -----

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.store.get(id)
    }

    /// Objects in z-order (back to front).
    pub fn list_objects(&self) -> Vec<&SceneObject> {
        self.store.iter_ordered().collect()
    }

    /// Groups in creation order.
    pub fn list_groups(&self) -> Vec<LayoutGroup> {
        self.groups.list(&self.store)
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn active_group(&self) -> Option<GroupId> {
        self.active_group
    }

    /// Make a group the target for newly added objects.
    pub fn set_active_group(&mut self, id: GroupId) -> bool {
        if self.groups.contains(id) {
            self.active_group = Some(id);
            true
        } else {
            debug!("activation of unknown group {id} ignored");
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Active snap guidelines for visual feedback, per axis.
    pub fn active_guidelines(&self) -> (Option<GuidelineCandidate>, Option<GuidelineCandidate>) {
        self.snap.active_guidelines()
    }

    pub fn snap_config(&self) -> &SnapConfig {
        &self.snap_config
    }

    pub fn set_snap_config(&mut self, config: SnapConfig) {
        self.snap_config = config;
    }

    /// Register a change subscriber.
    pub fn subscribe(&mut self, callback: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor() -> SceneEditor {
        let _ = env_logger::builder().is_test(true).try_init();
        SceneEditor::with_config(SnapConfig {
            canvas: false,
            grid: false,
            ..SnapConfig::default()
        })
    }

    fn rect() -> ObjectKind {
        ObjectKind::Rectangle { corner_radius: 0.0 }
    }

    #[test]
    fn test_add_object_joins_active_group() {
        let mut editor = editor();
        let id = editor.add_object_at(rect(), Point::new(50.0, 60.0)).unwrap();

        let gid = editor.active_group().expect("first group auto-created");
        assert_eq!(editor.object(id).unwrap().group, Some(gid));
        assert_eq!(editor.list_groups().len(), 1);
        assert!(editor.can_undo());

        assert!(editor.undo());
        assert!(editor.object(id).is_none());
    }

    #[test]
    fn test_delete_anchor_rejected() {
        let mut editor = editor();
        editor.add_object(rect()).unwrap();
        let anchor = editor.list_groups()[0].anchor;

        let result = editor.delete_object(anchor);
        assert!(matches!(result, Err(CoreError::InvalidOperation(_))));
        assert!(editor.object(anchor).is_some());
    }

    #[test]
    fn test_clone_offsets_and_shares_group() {
        let mut editor = editor();
        let id = editor.add_object_at(rect(), Point::new(40.0, 40.0)).unwrap();
        let copy = editor.clone_object(id).unwrap().expect("clone succeeds");

        let original = editor.object(id).unwrap();
        let cloned = editor.object(copy).unwrap();
        assert_ne!(cloned.id, original.id);
        assert_eq!(cloned.group, original.group);
        assert!((cloned.left - 50.0).abs() < f64::EPSILON);
        assert!((cloned.top - 50.0).abs() < f64::EPSILON);

        // Cloning an anchor is rejected; cloning a ghost is a no-op.
        let anchor = editor.list_groups()[0].anchor;
        assert!(editor.clone_object(anchor).is_err());
        assert_eq!(editor.clone_object(uuid::Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_hiding_group_clears_selection_of_member() {
        let mut editor = editor();
        let id = editor.add_object(rect()).unwrap();
        let gid = editor.active_group().unwrap();

        let selections = Rc::new(RefCell::new(Vec::new()));
        {
            let selections = Rc::clone(&selections);
            editor.subscribe(move |event| {
                if let ChangeEvent::Selection { id } = event {
                    selections.borrow_mut().push(*id);
                }
            });
        }

        editor.select(id).unwrap();
        editor.toggle_group_visibility(gid).unwrap();

        assert_eq!(editor.selected(), None);
        assert!(!editor.object(id).unwrap().visible);
        assert_eq!(*selections.borrow(), vec![Some(id), None]);
    }

    #[test]
    fn test_lock_toggle_emits_lock_then_unlock() {
        let mut editor = editor();
        let id = editor.add_object(rect()).unwrap();
        let gid = editor.active_group().unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        {
            let events = Rc::clone(&events);
            editor.subscribe(move |event| {
                match event {
                    ChangeEvent::Lock { .. } => events.borrow_mut().push("lock"),
                    ChangeEvent::Unlock { .. } => events.borrow_mut().push("unlock"),
                    _ => {}
                };
            });
        }

        editor.toggle_group_lock(gid).unwrap();
        assert!(editor.object(id).unwrap().locks.movement);
        assert!(editor.object(id).unwrap().selectable);

        editor.toggle_group_lock(gid).unwrap();
        assert!(!editor.object(id).unwrap().locks.any());

        // One lock and one unlock per member (anchor + object).
        assert_eq!(*events.borrow(), vec!["lock", "lock", "unlock", "unlock"]);
    }

    #[test]
    fn test_redo_discarded_by_new_commit() {
        let mut editor = editor();
        let id = editor.add_object_at(rect(), Point::ZERO).unwrap();
        editor.update_object(id, ObjectPatch::Left(10.0)).unwrap();

        assert!(editor.undo());
        assert!(editor.can_redo());

        editor.update_object(id, ObjectPatch::Left(99.0)).unwrap();
        assert!(!editor.can_redo());
        assert!(!editor.redo());
        assert!((editor.object(id).unwrap().left - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_undo_revalidates_selection() {
        let mut editor = editor();
        editor.add_object(rect()).unwrap();
        let id = editor.add_object(rect()).unwrap();
        editor.select(id).unwrap();

        assert!(editor.undo());
        assert!(editor.object(id).is_none());
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn test_drag_commits_one_snapshot_on_pointer_up() {
        let mut editor = editor();
        let id = editor.add_object_at(rect(), Point::new(500.0, 500.0)).unwrap();

        for (left, top) in [(510.0, 505.0), (530.0, 515.0), (560.0, 520.0)] {
            editor.handle_renderer_event(RendererEvent::ObjectMoving { id, left, top });
        }
        editor.handle_renderer_event(RendererEvent::PointerUp {
            position: Point::new(560.0, 520.0),
        });

        assert!((editor.object(id).unwrap().left - 560.0).abs() < f64::EPSILON);

        // The whole drag is one history step.
        assert!(editor.undo());
        assert!((editor.object(id).unwrap().left - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_anchor_drag_cascades_to_member() {
        let mut editor = editor();
        let member = editor.add_object_at(rect(), Point::new(300.0, 250.0)).unwrap();
        let anchor = editor.list_groups()[0].anchor;

        editor.handle_renderer_event(RendererEvent::ObjectMoving {
            id: anchor,
            left: 500.0,
            top: 400.0,
        });
        editor.handle_renderer_event(RendererEvent::PointerUp {
            position: Point::new(500.0, 400.0),
        });

        // Anchor started at the origin; the member moved by the same delta.
        assert_eq!(editor.object(anchor).unwrap().position(), Point::new(500.0, 400.0));
        assert_eq!(editor.object(member).unwrap().position(), Point::new(800.0, 650.0));

        let commands = editor.take_renderer_commands();
        assert!(commands.contains(&RendererCommand::Render { id: member }));
    }

    #[test]
    fn test_drag_snaps_to_earlier_object_edge() {
        let mut editor = editor();
        let target = editor.add_object_at(rect(), Point::new(300.0, 300.0)).unwrap();
        let dragged = editor.add_object_at(ObjectKind::Circle, Point::new(700.0, 700.0)).unwrap();

        editor.handle_renderer_event(RendererEvent::ObjectMoving {
            id: dragged,
            left: 296.0,
            top: 400.0,
        });

        // Left edge pulled onto the target's left edge; top unaffected.
        let object = editor.object(dragged).unwrap();
        assert!((object.left - 300.0).abs() < f64::EPSILON);
        assert!((object.top - 400.0).abs() < f64::EPSILON);
        let (horizontal, vertical) = editor.active_guidelines();
        assert!(horizontal.is_none());
        assert!(vertical.is_some());
        let _ = target;

        editor.handle_renderer_event(RendererEvent::DragCancelled);
        assert_eq!(editor.active_guidelines(), (None, None));
    }

    #[test]
    fn test_movement_locked_object_does_not_move() {
        let mut editor = editor();
        let id = editor.add_object_at(rect(), Point::new(100.0, 100.0)).unwrap();
        let gid = editor.active_group().unwrap();
        editor.toggle_group_lock(gid).unwrap();

        editor.handle_renderer_event(RendererEvent::ObjectMoving {
            id,
            left: 400.0,
            top: 400.0,
        });
        assert_eq!(editor.object(id).unwrap().position(), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_stale_moving_event_ignored() {
        let mut editor = editor();
        editor.add_object(rect()).unwrap();
        editor.take_renderer_commands();

        editor.handle_renderer_event(RendererEvent::ObjectMoving {
            id: uuid::Uuid::new_v4(),
            left: 10.0,
            top: 10.0,
        });
        assert!(editor.take_renderer_commands().is_empty());
    }

    #[test]
    fn test_delete_group_moves_active_to_replacement() {
        let mut editor = editor();
        let id = editor.add_object(rect()).unwrap();
        let gid = editor.active_group().unwrap();
        editor.select(id).unwrap();

        editor.delete_group(gid).unwrap();
        assert!(editor.object(id).is_none());
        assert_eq!(editor.selected(), None);

        // The last group is auto-replaced and becomes active.
        let groups = editor.list_groups();
        assert_eq!(groups.len(), 1);
        assert_ne!(groups[0].id, gid);
        assert_eq!(editor.active_group(), Some(groups[0].id));
    }

    #[test]
    fn test_queued_commands_run_in_order() {
        let mut editor = editor();
        editor.in_flight = true;
        editor.dispatch(Command::CreateGroup {
            name: Some("First".into()),
        });
        editor.dispatch(Command::CreateGroup {
            name: Some("Second".into()),
        });
        assert!(editor.list_groups().is_empty());

        editor.in_flight = false;
        editor.drain_pending();
        let names: Vec<String> = editor.list_groups().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["First".to_string(), "Second".to_string()]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut editor = editor();
        let id = editor.add_object_at(rect(), Point::new(25.0, 35.0)).unwrap();
        editor.rename_group(editor.active_group().unwrap(), "Hero").unwrap();
        let bytes = editor.save_snapshot().unwrap();

        let mut other = SceneEditor::new();
        other.load_snapshot(&bytes).unwrap();

        assert_eq!(other.list_objects().len(), 2); // anchor + rectangle
        assert_eq!(other.object(id).unwrap().position(), Point::new(25.0, 35.0));
        let groups = other.list_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Hero");
        assert!(!other.can_undo());
    }

    #[test]
    fn test_malformed_snapshot_leaves_scene_untouched() {
        let mut editor = editor();
        let id = editor.add_object_at(rect(), Point::new(25.0, 35.0)).unwrap();
        editor.take_renderer_commands();

        let result = editor.load_snapshot(b"{\"version\":1,\"objects\":");
        assert!(matches!(result, Err(CoreError::MalformedSnapshot(_))));
        assert!(editor.object(id).is_some());
        assert_eq!(editor.list_objects().len(), 2);
        assert!(editor.take_renderer_commands().is_empty());
    }
}

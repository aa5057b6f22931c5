//! Canonical scene object collection.
//!
//! The store is the sole source of truth for objects. Z-order is the
//! store's sequence position: `z_order` runs back to front. Every mutation
//! marks the store dirty so the next commit knows a snapshot is due.
//! Operations on unknown ids are silent no-ops; the renderer may emit stale
//! events after an asynchronous removal and the core tolerates that.

use crate::object::{ObjectId, ObjectPatch, SceneObject};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical collection of scene objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneStore {
    objects: HashMap<ObjectId, SceneObject>,
    /// Z-order of objects (back to front).
    z_order: Vec<ObjectId>,
    #[serde(skip)]
    dirty: bool,
}

impl SceneStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object on top of the z-order. Returns its id.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id;
        self.z_order.push(id);
        self.objects.insert(id, object);
        self.dirty = true;
        id
    }

    /// Remove an object. Unknown ids are a no-op.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        let removed = self.objects.remove(&id);
        if removed.is_some() {
            self.z_order.retain(|&oid| oid != id);
            self.dirty = true;
        } else {
            debug!("remove of unknown object {id} ignored");
        }
        removed
    }

    /// Apply a property patch. Returns whether anything was patched.
    pub fn apply_patch(&mut self, id: ObjectId, patch: &ObjectPatch) -> bool {
        match self.objects.get_mut(&id) {
            Some(object) => {
                object.apply_patch(patch);
                self.dirty = true;
                true
            }
            None => {
                debug!("patch for unknown object {id} ignored");
                false
            }
        }
    }

    /// Move an object to a new z-order index (clamped to the valid range).
    pub fn set_z_index(&mut self, id: ObjectId, index: usize) {
        let Some(pos) = self.z_order.iter().position(|&oid| oid == id) else {
            debug!("reorder of unknown object {id} ignored");
            return;
        };
        self.z_order.remove(pos);
        let index = index.min(self.z_order.len());
        self.z_order.insert(index, id);
        self.dirty = true;
    }

    /// Current z-order index of an object.
    pub fn z_index_of(&self, id: ObjectId) -> Option<usize> {
        self.z_order.iter().position(|&oid| oid == id)
    }

    /// Get an object by id.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Get a mutable reference to an object. Marks the store dirty.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        let object = self.objects.get_mut(&id);
        if object.is_some() {
            self.dirty = true;
        }
        object
    }

    /// Iterate objects in z-order (back to front).
    pub fn iter_ordered(&self) -> impl Iterator<Item = &SceneObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    /// Object ids in z-order.
    pub fn ids_ordered(&self) -> &[ObjectId] {
        &self.z_order
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Take and reset the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clone the full content for a history snapshot.
    pub(crate) fn clone_content(&self) -> (HashMap<ObjectId, SceneObject>, Vec<ObjectId>) {
        (self.objects.clone(), self.z_order.clone())
    }

    /// Fully replace the content (history restore). Never a partial merge.
    pub(crate) fn replace_content(
        &mut self,
        objects: HashMap<ObjectId, SceneObject>,
        z_order: Vec<ObjectId>,
    ) {
        self.objects = objects;
        self.z_order = z_order;
        self.dirty = false;
    }

    /// Fully replace the content from an ordered object list (snapshot load).
    pub(crate) fn replace_with_objects(&mut self, objects: Vec<SceneObject>) {
        self.objects.clear();
        self.z_order.clear();
        for object in objects {
            self.z_order.push(object.id);
            self.objects.insert(object.id, object);
        }
        self.dirty = false;
    }
}

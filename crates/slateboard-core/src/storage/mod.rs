//! Snapshot persistence.
//!
//! A scene snapshot is a versioned JSON blob of the ordered object list.
//! [`SceneBlob`] owns the wire format and its validation; the [`Storage`]
//! trait abstracts where blobs live, with in-memory and on-disk backends.
//! Decoding validates fully before any state is touched, so a malformed
//! blob can never leave a scene half-loaded.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::{CoreError, CoreResult};
use crate::object::{GroupId, SceneObject};
use crate::store::SceneStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Current snapshot format version.
pub const BLOB_VERSION: u32 = 1;

/// Errors from snapshot backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("snapshot not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Where snapshot blobs live.
pub trait Storage {
    /// Persist a blob under an id, replacing any previous one.
    fn save(&mut self, id: &str, blob: &[u8]) -> StorageResult<()>;

    /// Load a blob by id.
    fn load(&self, id: &str) -> StorageResult<Vec<u8>>;

    /// Delete a blob. Missing ids are an error.
    fn delete(&mut self, id: &str) -> StorageResult<()>;

    /// List stored snapshot ids, sorted.
    fn list(&self) -> StorageResult<Vec<String>>;

    fn exists(&self, id: &str) -> bool;
}

/// Versioned snapshot wire format: the ordered object list.
///
/// Z-order is the list order, back to front. Group structure needs no
/// separate section; it is derived from the anchors on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneBlob {
    pub version: u32,
    pub objects: Vec<SceneObject>,
}

impl SceneBlob {
    /// Capture the store into an encodable blob.
    pub fn capture(store: &SceneStore) -> Self {
        Self {
            version: BLOB_VERSION,
            objects: store.iter_ordered().cloned().collect(),
        }
    }

    /// Encode to JSON bytes.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and fully validate JSON bytes.
    ///
    /// Rejects unknown versions, duplicate object ids, and groups with
    /// zero or multiple anchors among the referenced members.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let blob: SceneBlob = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::MalformedSnapshot(e.to_string()))?;
        if blob.version != BLOB_VERSION {
            return Err(CoreError::MalformedSnapshot(format!(
                "unsupported snapshot version {}",
                blob.version
            )));
        }

        let mut seen = HashSet::new();
        for object in &blob.objects {
            if !seen.insert(object.id) {
                return Err(CoreError::MalformedSnapshot(format!(
                    "duplicate object id {}",
                    object.id
                )));
            }
        }

        let groups: HashSet<GroupId> = blob.objects.iter().filter_map(|o| o.group).collect();
        for gid in groups {
            let anchors = blob
                .objects
                .iter()
                .filter(|o| o.group == Some(gid) && o.is_group_anchor)
                .count();
            if anchors != 1 {
                return Err(CoreError::MalformedSnapshot(format!(
                    "group {gid} has {anchors} anchors"
                )));
            }
        }
        Ok(blob)
    }

    /// The validated object list, consumed on load.
    pub fn into_objects(self) -> Vec<SceneObject> {
        self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupManager;
    use crate::object::ObjectKind;
    use kurbo::Point;

    fn populated_store() -> SceneStore {
        let mut store = SceneStore::new();
        let mut groups = GroupManager::new();
        let gid = groups.create_group(&mut store, None);
        let mut circle = SceneObject::new(ObjectKind::Circle, Point::new(30.0, 40.0));
        circle.group = Some(gid);
        store.add_object(circle);
        store
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let store = populated_store();
        let bytes = SceneBlob::capture(&store).encode().unwrap();
        let blob = SceneBlob::decode(&bytes).unwrap();

        let ids: Vec<_> = blob.objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, store.ids_ordered());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = SceneBlob::decode(b"not json at all");
        assert!(matches!(result, Err(CoreError::MalformedSnapshot(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut blob = SceneBlob::capture(&populated_store());
        blob.version = 99;
        let bytes = serde_json::to_vec(&blob).unwrap();
        assert!(matches!(
            SceneBlob::decode(&bytes),
            Err(CoreError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let mut blob = SceneBlob::capture(&populated_store());
        let copy = blob.objects[0].clone();
        blob.objects.push(copy);
        let bytes = serde_json::to_vec(&blob).unwrap();
        assert!(matches!(
            SceneBlob::decode(&bytes),
            Err(CoreError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_decode_rejects_anchorless_group() {
        let mut blob = SceneBlob::capture(&populated_store());
        for object in &mut blob.objects {
            object.is_group_anchor = false;
        }
        let bytes = serde_json::to_vec(&blob).unwrap();
        assert!(matches!(
            SceneBlob::decode(&bytes),
            Err(CoreError::MalformedSnapshot(_))
        ));
    }
}

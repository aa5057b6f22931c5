//! Slateboard Core Library
//!
//! Scene-state engine for the Slateboard layout composer: the object/group
//! data model, group-cascading movement synchronization, snapshot-based
//! undo/redo, and guideline snapping during drags. Rendering, panel chrome
//! and import/export UI live in collaborator crates and talk to this core
//! through [`editor::SceneEditor`].

pub mod editor;
pub mod error;
pub mod events;
pub mod group;
pub mod history;
pub mod movement;
pub mod object;
pub mod renderer;
pub mod snap;
pub mod storage;
pub mod store;

pub use editor::{Command, SceneEditor};
pub use error::{CoreError, CoreResult};
pub use events::{ChangeEvent, EventBus, SubscriptionId};
pub use group::{GroupManager, LayoutGroup};
pub use history::HistoryManager;
pub use movement::{MovementSync, move_group_together};
pub use object::{
    GroupId, LockFlags, ObjectId, ObjectKind, ObjectPatch, ObjectStyle, SceneObject,
    SerializableColor,
};
pub use renderer::{RendererCommand, RendererEvent};
pub use snap::{
    Axis, GRID_SIZE, GuidelineCandidate, GuidelineSource, SNAP_THRESHOLD, SnapAdjustment,
    SnapConfig, SnapEngine,
};
pub use storage::{
    BLOB_VERSION, FileStorage, MemoryStorage, SceneBlob, Storage, StorageError, StorageResult,
};
pub use store::SceneStore;

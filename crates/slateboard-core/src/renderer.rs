//! Renderer collaborator boundary.
//!
//! The renderer owns pixels and pointer capture; the core owns state. They
//! talk through two plain enums: the renderer reports [`RendererEvent`]s
//! into [`crate::editor::SceneEditor::handle_renderer_event`], and the core
//! queues [`RendererCommand`]s for the renderer to drain and apply. Neither
//! side calls into the other directly.

use crate::object::ObjectId;
use kurbo::Point;

/// An interaction or lifecycle notification from the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RendererEvent {
    /// The renderer materialized a visual for an object.
    ObjectAdded { id: ObjectId },
    /// The renderer dropped a visual.
    ObjectRemoved { id: ObjectId },
    /// A visual's properties were edited in place.
    ObjectModified { id: ObjectId },
    /// A drag-move frame with the proposed top-left position.
    ObjectMoving { id: ObjectId, left: f64, top: f64 },
    /// A drag finished cleanly.
    DragEnded,
    /// The drag was dropped mid-gesture (pointer left the surface, focus
    /// lost). Applied frames stand; drag state must still collapse.
    DragCancelled,
    /// The user selected an object.
    SelectionCreated { id: ObjectId },
    /// The user clicked empty canvas.
    SelectionCleared,
    PointerDown { position: Point },
    PointerMove { position: Point },
    /// End of a pointer interaction; a drag in progress finishes here.
    PointerUp { position: Point },
}

/// An instruction queued by the core for the renderer to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererCommand {
    /// Re-render an object from its current store state.
    Render { id: ObjectId },
    /// Drop an object's visual.
    Remove { id: ObjectId },
    /// Move an object's visual to a z-order index.
    Reorder { id: ObjectId, index: usize },
    /// Mark the active (selected) object; `None` clears the marker.
    SetActive { id: Option<ObjectId> },
}

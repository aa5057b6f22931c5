//! Scene object definitions for the composition surface.

mod style;

pub use style::{ObjectStyle, SerializableColor};

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ObjectId = Uuid;

/// Unique identifier for layout groups.
pub type GroupId = Uuid;

/// Kind-specific payload for a scene object, matched exhaustively wherever
/// behavior differs between kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Text {
        content: String,
        font_size: f64,
    },
    Image {
        source: String,
        natural_width: f64,
        natural_height: f64,
    },
    /// Video placeholder; playback is the renderer's concern.
    Video {
        source: String,
        natural_width: f64,
        natural_height: f64,
    },
    Rectangle {
        corner_radius: f64,
    },
    Circle,
    Triangle,
}

impl ObjectKind {
    /// Short label for display and logging.
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Text { .. } => "text",
            ObjectKind::Image { .. } => "image",
            ObjectKind::Video { .. } => "video",
            ObjectKind::Rectangle { .. } => "rectangle",
            ObjectKind::Circle => "circle",
            ObjectKind::Triangle => "triangle",
        }
    }

    /// Default extent for a freshly placed object of this kind.
    fn default_size(&self) -> Size {
        match self {
            ObjectKind::Text { .. } => Size::new(200.0, 40.0),
            ObjectKind::Image {
                natural_width,
                natural_height,
                ..
            }
            | ObjectKind::Video {
                natural_width,
                natural_height,
                ..
            } => {
                if *natural_width > 0.0 && *natural_height > 0.0 {
                    Size::new(*natural_width, *natural_height)
                } else {
                    Size::new(320.0, 180.0)
                }
            }
            ObjectKind::Rectangle { .. } => Size::new(200.0, 150.0),
            ObjectKind::Circle => Size::new(120.0, 120.0),
            ObjectKind::Triangle => Size::new(140.0, 120.0),
        }
    }
}

/// Movement/rotation/scaling lock flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockFlags {
    pub movement: bool,
    pub rotation: bool,
    pub scaling: bool,
}

impl LockFlags {
    /// All three locks engaged.
    pub fn locked() -> Self {
        Self {
            movement: true,
            rotation: true,
            scaling: true,
        }
    }

    /// Whether any lock is engaged.
    pub fn any(&self) -> bool {
        self.movement || self.rotation || self.scaling
    }

    /// Set all three flags at once.
    pub fn set_all(&mut self, locked: bool) {
        self.movement = locked;
        self.rotation = locked;
        self.scaling = locked;
    }
}

/// A single object on the composition surface.
///
/// Group membership is a foreign key on the member only; the group listing
/// is derived from it. For a group anchor, `name` carries the group's
/// display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Display name. For a group anchor this is the group's display name.
    pub name: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub style: ObjectStyle,
    pub visible: bool,
    pub locks: LockFlags,
    /// Locked objects stay selectable so they remain inspectable.
    pub selectable: bool,
    /// Owning group, if any.
    pub group: Option<GroupId>,
    /// Whether this object is the single designated anchor of its group.
    pub is_group_anchor: bool,
}

impl SceneObject {
    /// Create a new object of the given kind at a position, with
    /// kind-specific default extent.
    pub fn new(kind: ObjectKind, position: Point) -> Self {
        let size = kind.default_size();
        Self {
            id: Uuid::new_v4(),
            name: kind.label().to_string(),
            kind,
            left: position.x,
            top: position.y,
            width: size.width,
            height: size.height,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            style: ObjectStyle::default(),
            visible: true,
            locks: LockFlags::default(),
            selectable: true,
            group: None,
            is_group_anchor: false,
        }
    }

    /// Top-left position.
    pub fn position(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Set the top-left position.
    pub fn set_position(&mut self, position: Point) {
        self.left = position.x;
        self.top = position.y;
    }

    /// Translate by a delta.
    pub fn translate(&mut self, delta: Vec2) {
        self.left += delta.x;
        self.top += delta.y;
    }

    /// Axis-aligned bounds in world coordinates, scale applied.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.width * self.scale_x,
            self.top + self.height * self.scale_y,
        )
    }

    /// Regenerate the object's id.
    /// Used when duplicating so the copy gets a unique identity.
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }

    /// Apply a single property update.
    /// Kind-specific patches on the wrong kind are no-ops.
    pub fn apply_patch(&mut self, patch: &ObjectPatch) {
        match patch {
            ObjectPatch::Left(v) => self.left = *v,
            ObjectPatch::Top(v) => self.top = *v,
            ObjectPatch::Width(v) => self.width = v.max(1.0),
            ObjectPatch::Height(v) => self.height = v.max(1.0),
            ObjectPatch::Rotation(v) => self.rotation = *v,
            ObjectPatch::ScaleX(v) => self.scale_x = *v,
            ObjectPatch::ScaleY(v) => self.scale_y = *v,
            ObjectPatch::Name(v) => self.name = v.clone(),
            ObjectPatch::Fill(v) => self.style.fill = *v,
            ObjectPatch::Stroke(v) => self.style.stroke = *v,
            ObjectPatch::StrokeWidth(v) => self.style.stroke_width = v.max(0.0),
            ObjectPatch::Opacity(v) => self.style.opacity = v.clamp(0.0, 1.0),
            ObjectPatch::Visible(v) => self.visible = *v,
            ObjectPatch::TextContent(v) => {
                if let ObjectKind::Text { content, .. } = &mut self.kind {
                    *content = v.clone();
                }
            }
            ObjectPatch::FontSize(v) => {
                if let ObjectKind::Text { font_size, .. } = &mut self.kind {
                    *font_size = v.max(1.0);
                }
            }
        }
    }
}

/// A single property update, applied with exhaustive matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectPatch {
    Left(f64),
    Top(f64),
    Width(f64),
    Height(f64),
    Rotation(f64),
    ScaleX(f64),
    ScaleY(f64),
    Name(String),
    Fill(Option<SerializableColor>),
    Stroke(SerializableColor),
    StrokeWidth(f64),
    Opacity(f64),
    Visible(bool),
    TextContent(String),
    FontSize(f64),
}

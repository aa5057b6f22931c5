//! Guideline snapping during drags.
//!
//! On drag-start the engine builds horizontal and vertical candidate lists
//! from the canvas geometry and the other visible, movement-unlocked
//! objects. Each drag-move frame matches the dragged bounds' key points
//! against the candidates independently per axis; the nearest candidate
//! strictly inside the threshold pulls the object onto the guideline, and
//! an axis without a match can fall back to the grid. Nothing persists
//! across drags.

use crate::object::ObjectId;
use crate::store::SceneStore;
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};

/// Distance below which a dragged edge/center is pulled onto a guideline.
/// The bound is exclusive: a candidate exactly at this distance is not
/// snapped.
pub const SNAP_THRESHOLD: f64 = 10.0;

/// Grid cell size for the grid fallback.
pub const GRID_SIZE: f64 = 20.0;

/// Guideline orientation. A horizontal guideline is a horizontal line,
/// matched against the dragged object's top/center-y/bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Where a guideline candidate came from, for visual feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuidelineSource {
    CanvasEdge,
    CanvasCenter,
    ObjectEdge,
    ObjectCenter,
    Grid,
}

/// A computed alignment line considered during a drag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuidelineCandidate {
    pub axis: Axis,
    /// Y coordinate for horizontal candidates, X for vertical ones.
    pub coordinate: f64,
    pub source: GuidelineSource,
}

/// Snapping configuration.
#[derive(Debug, Clone, Copy)]
pub struct SnapConfig {
    /// Snap to other objects' edges and centers.
    pub objects: bool,
    /// Snap to canvas edges and center.
    pub canvas: bool,
    /// Grid fallback for axes without a guideline match.
    pub grid: bool,
    pub threshold: f64,
    pub grid_size: f64,
    /// Fixed extent of the composition surface.
    pub canvas_size: Size,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            objects: true,
            canvas: true,
            grid: false,
            threshold: SNAP_THRESHOLD,
            grid_size: GRID_SIZE,
            canvas_size: Size::new(1280.0, 720.0),
        }
    }
}

/// Result of adjusting a proposed position for one drag frame.
#[derive(Debug, Clone, Copy)]
pub struct SnapAdjustment {
    pub left: f64,
    pub top: f64,
    /// The horizontal guideline the object snapped onto, if any.
    pub guide_horizontal: Option<GuidelineCandidate>,
    /// The vertical guideline the object snapped onto, if any.
    pub guide_vertical: Option<GuidelineCandidate>,
}

/// Computes alignment candidates at drag-start and adjusts proposed
/// positions on every drag-move frame.
///
/// Idle until `begin_drag`; `end_drag` (clean or via the cancel fallback)
/// always collapses back to idle and clears all candidate state.
#[derive(Debug, Default)]
pub struct SnapEngine {
    dragging: Option<ObjectId>,
    horizontal: Vec<GuidelineCandidate>,
    vertical: Vec<GuidelineCandidate>,
    active_horizontal: Option<GuidelineCandidate>,
    active_vertical: Option<GuidelineCandidate>,
}

impl SnapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.dragging.is_none()
    }

    /// The object currently being dragged, if any.
    pub fn dragging(&self) -> Option<ObjectId> {
        self.dragging
    }

    /// Build candidate lists for a drag of `id`.
    ///
    /// Insertion order is the deterministic tie-break: canvas edges, canvas
    /// center, then other objects in store order, each contributing its
    /// three horizontal then three vertical key points.
    pub fn begin_drag(&mut self, store: &SceneStore, config: &SnapConfig, id: ObjectId) {
        self.horizontal.clear();
        self.vertical.clear();
        self.active_horizontal = None;
        self.active_vertical = None;
        self.dragging = Some(id);

        if config.canvas {
            let extent = config.canvas_size;
            for (coordinate, source) in [
                (0.0, GuidelineSource::CanvasEdge),
                (extent.height, GuidelineSource::CanvasEdge),
                (extent.height / 2.0, GuidelineSource::CanvasCenter),
            ] {
                self.horizontal.push(GuidelineCandidate {
                    axis: Axis::Horizontal,
                    coordinate,
                    source,
                });
            }
            for (coordinate, source) in [
                (0.0, GuidelineSource::CanvasEdge),
                (extent.width, GuidelineSource::CanvasEdge),
                (extent.width / 2.0, GuidelineSource::CanvasCenter),
            ] {
                self.vertical.push(GuidelineCandidate {
                    axis: Axis::Vertical,
                    coordinate,
                    source,
                });
            }
        }

        if config.objects {
            for object in store.iter_ordered() {
                if object.id == id || !object.visible || object.locks.movement {
                    continue;
                }
                let bounds = object.bounds();
                for (coordinate, source) in [
                    (bounds.y0, GuidelineSource::ObjectEdge),
                    (bounds.center().y, GuidelineSource::ObjectCenter),
                    (bounds.y1, GuidelineSource::ObjectEdge),
                ] {
                    self.horizontal.push(GuidelineCandidate {
                        axis: Axis::Horizontal,
                        coordinate,
                        source,
                    });
                }
                for (coordinate, source) in [
                    (bounds.x0, GuidelineSource::ObjectEdge),
                    (bounds.center().x, GuidelineSource::ObjectCenter),
                    (bounds.x1, GuidelineSource::ObjectEdge),
                ] {
                    self.vertical.push(GuidelineCandidate {
                        axis: Axis::Vertical,
                        coordinate,
                        source,
                    });
                }
            }
        }
    }

    /// Adjust a proposed position, independently per axis.
    ///
    /// A guideline match shifts the object by `candidate - keypoint` on
    /// that axis and becomes the active guideline. The grid fallback
    /// applies only to an axis without a guideline match; the other axis
    /// may still snap to a guideline.
    pub fn adjust(&mut self, config: &SnapConfig, proposed: Rect) -> SnapAdjustment {
        let mut left = proposed.x0;
        let mut top = proposed.y0;
        self.active_horizontal = None;
        self.active_vertical = None;

        let h_keys = [proposed.y0, proposed.center().y, proposed.y1];
        match best_match(&self.horizontal, &h_keys, config.threshold) {
            Some((candidate, shift)) => {
                top += shift;
                self.active_horizontal = Some(candidate);
            }
            None if config.grid => {
                top = (top / config.grid_size).round() * config.grid_size;
            }
            None => {}
        }

        let v_keys = [proposed.x0, proposed.center().x, proposed.x1];
        match best_match(&self.vertical, &v_keys, config.threshold) {
            Some((candidate, shift)) => {
                left += shift;
                self.active_vertical = Some(candidate);
            }
            None if config.grid => {
                left = (left / config.grid_size).round() * config.grid_size;
            }
            None => {}
        }

        SnapAdjustment {
            left,
            top,
            guide_horizontal: self.active_horizontal,
            guide_vertical: self.active_vertical,
        }
    }

    /// Active guidelines for visual feedback, per axis.
    pub fn active_guidelines(&self) -> (Option<GuidelineCandidate>, Option<GuidelineCandidate>) {
        (self.active_horizontal, self.active_vertical)
    }

    /// Clear all candidate and guideline state; nothing persists across
    /// drags. Also the cancel fallback for dropped drags.
    pub fn end_drag(&mut self) {
        self.dragging = None;
        self.horizontal.clear();
        self.vertical.clear();
        self.active_horizontal = None;
        self.active_vertical = None;
    }
}

/// Find the candidate/key-point pair of minimum absolute distance.
/// Strict `<` on both comparisons keeps the earliest-inserted candidate on
/// ties and makes the threshold an exclusive bound.
fn best_match(
    candidates: &[GuidelineCandidate],
    keys: &[f64; 3],
    threshold: f64,
) -> Option<(GuidelineCandidate, f64)> {
    let mut best: Option<(GuidelineCandidate, f64, f64)> = None;
    for candidate in candidates {
        for &key in keys {
            let distance = (candidate.coordinate - key).abs();
            if best.as_ref().is_none_or(|(_, d, _)| distance < *d) {
                best = Some((*candidate, distance, candidate.coordinate - key));
            }
        }
    }
    best.and_then(|(candidate, distance, shift)| {
        (distance < threshold).then_some((candidate, shift))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectKind, SceneObject};
    use kurbo::Point;

    fn rect(store: &mut SceneStore, left: f64, top: f64, width: f64, height: f64) -> ObjectId {
        let mut object = SceneObject::new(
            ObjectKind::Rectangle { corner_radius: 0.0 },
            Point::new(left, top),
        );
        object.width = width;
        object.height = height;
        store.add_object(object)
    }

    fn objects_only() -> SnapConfig {
        SnapConfig {
            canvas: false,
            grid: false,
            ..SnapConfig::default()
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut store = SceneStore::new();
        rect(&mut store, 100.0, 0.0, 50.0, 50.0);
        let dragged = rect(&mut store, 500.0, 500.0, 30.0, 30.0);

        let config = objects_only();
        let mut engine = SnapEngine::new();
        engine.begin_drag(&store, &config, dragged);

        // Left edge exactly threshold away from the candidate at x=100.
        let at_threshold = engine.adjust(&config, Rect::new(90.0, 300.0, 120.0, 330.0));
        assert!(at_threshold.guide_vertical.is_none());
        assert!((at_threshold.left - 90.0).abs() < f64::EPSILON);

        // One unit closer, it snaps.
        let inside = engine.adjust(&config, Rect::new(91.0, 300.0, 121.0, 330.0));
        assert!(inside.guide_vertical.is_some());
        assert!((inside.left - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_earlier_object_wins_tie() {
        // Rectangles with left=100 and left=105, rectangle-1 added first;
        // a third object's left edge near 100 snaps to 100, not 105.
        let mut store = SceneStore::new();
        rect(&mut store, 100.0, 0.0, 300.0, 50.0);
        rect(&mut store, 105.0, 100.0, 300.0, 50.0);
        let dragged = rect(&mut store, 500.0, 500.0, 40.0, 40.0);

        let config = objects_only();
        let mut engine = SnapEngine::new();
        engine.begin_drag(&store, &config, dragged);

        let adjusted = engine.adjust(&config, Rect::new(98.0, 300.0, 138.0, 340.0));
        assert!((adjusted.left - 100.0).abs() < f64::EPSILON);

        // Equidistant between both candidates: the earlier insertion wins.
        let tied = engine.adjust(&config, Rect::new(102.5, 300.0, 142.5, 340.0));
        assert!((tied.left - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_axes_snap_independently() {
        let mut store = SceneStore::new();
        rect(&mut store, 100.0, 200.0, 50.0, 50.0);
        let dragged = rect(&mut store, 500.0, 500.0, 30.0, 30.0);

        let config = objects_only();
        let mut engine = SnapEngine::new();
        engine.begin_drag(&store, &config, dragged);

        // Vertical within threshold, horizontal far away.
        let adjusted = engine.adjust(&config, Rect::new(97.0, 400.0, 127.0, 430.0));
        assert!(adjusted.guide_vertical.is_some());
        assert!(adjusted.guide_horizontal.is_none());
        assert!((adjusted.left - 100.0).abs() < f64::EPSILON);
        assert!((adjusted.top - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_grid_fallback_per_axis() {
        let mut store = SceneStore::new();
        rect(&mut store, 100.0, 200.0, 50.0, 50.0);
        let dragged = rect(&mut store, 500.0, 500.0, 30.0, 30.0);

        let config = SnapConfig {
            canvas: false,
            grid: true,
            ..SnapConfig::default()
        };
        let mut engine = SnapEngine::new();
        engine.begin_drag(&store, &config, dragged);

        // Vertical snaps to the guideline at x=100; horizontal has no
        // match and rounds to the nearest grid multiple instead.
        let adjusted = engine.adjust(&config, Rect::new(97.0, 411.0, 127.0, 441.0));
        assert!(adjusted.guide_vertical.is_some());
        assert!(adjusted.guide_horizontal.is_none());
        assert!((adjusted.left - 100.0).abs() < f64::EPSILON);
        assert!((adjusted.top - 420.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hidden_and_locked_objects_excluded() {
        let mut store = SceneStore::new();
        let hidden = rect(&mut store, 100.0, 0.0, 50.0, 50.0);
        store.get_mut(hidden).unwrap().visible = false;
        let locked = rect(&mut store, 200.0, 0.0, 50.0, 50.0);
        store.get_mut(locked).unwrap().locks.movement = true;
        let dragged = rect(&mut store, 500.0, 500.0, 30.0, 30.0);

        let config = objects_only();
        let mut engine = SnapEngine::new();
        engine.begin_drag(&store, &config, dragged);

        let near_hidden = engine.adjust(&config, Rect::new(98.0, 300.0, 128.0, 330.0));
        assert!(near_hidden.guide_vertical.is_none());
        let near_locked = engine.adjust(&config, Rect::new(198.0, 300.0, 228.0, 330.0));
        assert!(near_locked.guide_vertical.is_none());
    }

    #[test]
    fn test_canvas_candidates() {
        let store = SceneStore::new();
        let config = SnapConfig {
            objects: false,
            grid: false,
            ..SnapConfig::default()
        };
        let mut engine = SnapEngine::new();
        engine.begin_drag(&store, &config, uuid::Uuid::new_v4());

        // Canvas center is at (640, 360); the dragged center at (636, 356)
        // pulls onto it on both axes.
        let adjusted = engine.adjust(&config, Rect::new(621.0, 341.0, 651.0, 371.0));
        assert_eq!(
            adjusted.guide_vertical.map(|g| g.source),
            Some(GuidelineSource::CanvasCenter)
        );
        assert_eq!(
            adjusted.guide_horizontal.map(|g| g.source),
            Some(GuidelineSource::CanvasCenter)
        );
        assert!((adjusted.left - 625.0).abs() < f64::EPSILON);
        assert!((adjusted.top - 345.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_end_drag_clears_state() {
        let mut store = SceneStore::new();
        rect(&mut store, 100.0, 100.0, 50.0, 50.0);
        let dragged = rect(&mut store, 500.0, 500.0, 30.0, 30.0);

        let config = objects_only();
        let mut engine = SnapEngine::new();
        engine.begin_drag(&store, &config, dragged);
        engine.adjust(&config, Rect::new(98.0, 98.0, 128.0, 128.0));
        assert!(!engine.is_idle());

        engine.end_drag();
        assert!(engine.is_idle());
        assert_eq!(engine.active_guidelines(), (None, None));

        // With no candidates, nothing snaps.
        let adjusted = engine.adjust(&config, Rect::new(98.0, 98.0, 128.0, 128.0));
        assert!(adjusted.guide_vertical.is_none());
        assert!(adjusted.guide_horizontal.is_none());
    }
}

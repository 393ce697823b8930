//! Input model: modifier keys, the gesture state machine, and hover coalescing.
//!
//! `InputState` is the active gesture tracked between pointer-down and
//! pointer-up. Each variant carries what the engine needs to turn the next
//! pointer position into an absolute transform update, so updates never
//! accumulate drift. `HoverThrottle` keeps only the latest pointer position
//! between frames.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::consts::{MIN_DIMENSION_PX, ROTATION_SNAP_DEG};
use crate::doc::MaskId;
use crate::geom::{BoundingBox, Point};
use crate::manipulation::ResizeHandle;
use crate::transform::normalize_degrees;

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held. Snaps rotation.
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Internal state for the gesture state machine. All points are source space.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Moving an object.
    Dragging {
        id: MaskId,
        /// Pointer position at the previous update.
        last_source: Point,
    },
    /// Dragging one corner handle of an object.
    Resizing {
        id: MaskId,
        handle: ResizeHandle,
        /// The corner opposite the handle; it stays put.
        anchor: Point,
        /// Handle corner minus pointer at gesture start.
        grab_offset: Point,
    },
    /// Turning an object about its current center.
    Rotating {
        id: MaskId,
        /// Rotation pivot.
        center: Point,
        /// Pointer angle about `center` at gesture start, in degrees.
        start_angle: f64,
        /// Object rotation at gesture start.
        start_rotation: f64,
    },
}

impl InputState {
    /// The object the active gesture targets.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Dragging { id, .. } | Self::Resizing { id, .. } | Self::Rotating { id, .. } => Some(id.as_str()),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

// =============================================================================
// RESIZE
// =============================================================================

/// Position of `handle` on `bbox`.
#[must_use]
pub fn handle_corner(handle: ResizeHandle, bbox: &BoundingBox) -> Point {
    match handle {
        ResizeHandle::Nw => Point::new(bbox.x1, bbox.y1),
        ResizeHandle::Ne => Point::new(bbox.x2, bbox.y1),
        ResizeHandle::Sw => Point::new(bbox.x1, bbox.y2),
        ResizeHandle::Se => Point::new(bbox.x2, bbox.y2),
    }
}

/// The corner that stays fixed while `handle` is dragged.
#[must_use]
pub fn anchor_corner(handle: ResizeHandle, bbox: &BoundingBox) -> Point {
    let opposite = match handle {
        ResizeHandle::Nw => ResizeHandle::Se,
        ResizeHandle::Ne => ResizeHandle::Sw,
        ResizeHandle::Sw => ResizeHandle::Ne,
        ResizeHandle::Se => ResizeHandle::Nw,
    };
    handle_corner(opposite, bbox)
}

/// Box spanned by `anchor` and a dragged `corner`. If the corner crosses the
/// anchor on an axis, that side collapses to the minimum size at the anchor.
#[must_use]
pub fn box_from_handle(handle: ResizeHandle, anchor: Point, corner: Point) -> BoundingBox {
    let grows_right = matches!(handle, ResizeHandle::Ne | ResizeHandle::Se);
    let grows_down = matches!(handle, ResizeHandle::Sw | ResizeHandle::Se);

    let (x1, x2) = if grows_right {
        (anchor.x, corner.x.max(anchor.x + MIN_DIMENSION_PX))
    } else {
        (corner.x.min(anchor.x - MIN_DIMENSION_PX), anchor.x)
    };
    let (y1, y2) = if grows_down {
        (anchor.y, corner.y.max(anchor.y + MIN_DIMENSION_PX))
    } else {
        (corner.y.min(anchor.y - MIN_DIMENSION_PX), anchor.y)
    };
    BoundingBox::new(x1, y1, x2, y2)
}

// =============================================================================
// ROTATE
// =============================================================================

/// Absolute rotation for a rotate gesture: the start rotation plus how far
/// the pointer has swept about the pivot. Shift snaps to whole steps.
#[must_use]
pub fn rotation_from_sweep(start_rotation: f64, start_angle: f64, angle_now: f64, modifiers: Modifiers) -> f64 {
    let raw = normalize_degrees(start_rotation + (angle_now - start_angle));
    if modifiers.shift { normalize_degrees((raw / ROTATION_SNAP_DEG).round() * ROTATION_SNAP_DEG) } else { raw }
}

// =============================================================================
// HOVER
// =============================================================================

/// A hover update waiting for the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingHover {
    /// Pointer at this display-space position.
    At(Point),
    /// Pointer left the overlay.
    Left,
}

/// Coalesces pointer movement so hover hit-tests run at most once per frame.
#[derive(Debug, Clone, Default)]
pub struct HoverThrottle {
    pending: Option<PendingHover>,
    current: Option<MaskId>,
}

impl HoverThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer position, superseding any position not yet processed.
    pub fn pointer_moved(&mut self, display: Point) {
        self.pending = Some(PendingHover::At(display));
    }

    pub fn pointer_left(&mut self) {
        self.pending = Some(PendingHover::Left);
    }

    /// Take the latest pending update, if any arrived since the last frame.
    pub fn take(&mut self) -> Option<PendingHover> {
        self.pending.take()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The currently hovered object.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Set the hovered object. Returns the previous value when it changed.
    pub fn set_current(&mut self, next: Option<MaskId>) -> Option<Option<MaskId>> {
        if self.current == next {
            return None;
        }
        Some(std::mem::replace(&mut self.current, next))
    }

    /// Forget the hovered object without reporting a change. Used when the
    /// whole object set is replaced.
    pub fn clear(&mut self) {
        self.pending = None;
        self.current = None;
    }
}

//! Manipulation state per mask and the store that owns it.
//!
//! [`TransformStore`] is the only writer of [`ManipulationState`]. Every
//! operation addresses exactly one mask id, derives the next state from the
//! previous one through the pure rules in [`crate::transform`], and swaps it
//! in. Other entries are never touched. Unknown ids are ignored: the host can
//! race a gesture against a fresh segmentation result and that is not an error.

#[cfg(test)]
#[path = "manipulation_test.rs"]
mod manipulation_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::doc::MaskId;
use crate::geom::BoundingBox;
use crate::transform::{FlipAxis, PartialImageEdits, TransformModel};

/// Corner handle used for a resize gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    Nw,
    Ne,
    Sw,
    Se,
}

/// Which gesture currently owns an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize(ResizeHandle),
    Rotate,
}

/// Live manipulation state of one mask.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManipulationState {
    pub mask_id: MaskId,
    #[serde(flatten)]
    pub model: TransformModel,
    pub is_dragging: bool,
    pub is_resizing: bool,
    pub is_rotating: bool,
    /// The host shows the rotate handle for this object.
    pub is_rotation_mode: bool,
    pub resize_handle: Option<ResizeHandle>,
    /// Excluded from hit-testing and rendering; state is kept for unhiding.
    pub is_hidden: bool,
    /// Bumped whenever `model` changes.
    pub version: u64,
}

impl ManipulationState {
    /// Identity state for a newly known mask.
    #[must_use]
    pub fn new(mask_id: MaskId, original: BoundingBox) -> Self {
        Self {
            mask_id,
            model: TransformModel::new(original),
            is_dragging: false,
            is_resizing: false,
            is_rotating: false,
            is_rotation_mode: false,
            resize_handle: None,
            is_hidden: false,
            version: 0,
        }
    }

    /// The gesture currently in progress, if any.
    #[must_use]
    pub fn active_gesture(&self) -> Option<GestureKind> {
        if self.is_dragging {
            Some(GestureKind::Drag)
        } else if self.is_resizing {
            Some(GestureKind::Resize(self.resize_handle.unwrap_or(ResizeHandle::Se)))
        } else if self.is_rotating {
            Some(GestureKind::Rotate)
        } else {
            None
        }
    }

    /// Same state with a new model; bumps `version` only if the model changed.
    fn with_model(&self, model: TransformModel) -> Self {
        let mut next = self.clone();
        if model != self.model {
            next.model = model;
            next.version = self.version.wrapping_add(1);
        }
        next
    }
}

/// Store of manipulation state keyed by mask id.
pub struct TransformStore {
    states: HashMap<MaskId, ManipulationState>,
}

impl TransformStore {
    #[must_use]
    pub fn new() -> Self {
        Self { states: HashMap::new() }
    }

    /// Drop every entry and create identity state for each `(id, box)`.
    pub fn rebuild<I>(&mut self, masks: I)
    where
        I: IntoIterator<Item = (MaskId, BoundingBox)>,
    {
        self.states.clear();
        for (id, original) in masks {
            self.states.insert(id.clone(), ManipulationState::new(id, original.sanitized()));
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ManipulationState> {
        self.states.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManipulationState> {
        self.states.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Replace the entry for `id` with `f(current)`. Unknown ids are a no-op.
    fn update<F>(&mut self, id: &str, op: &'static str, f: F) -> Option<&ManipulationState>
    where
        F: FnOnce(&ManipulationState) -> ManipulationState,
    {
        let Some(slot) = self.states.get_mut(id) else {
            debug!(mask_id = %id, op, "ignoring operation on unknown mask");
            return None;
        };
        *slot = f(slot);
        Some(&*slot)
    }

    // --- Geometry ---

    /// Translate by `(dx, dy)` source pixels.
    pub fn move_by(&mut self, id: &str, dx: f64, dy: f64) -> Option<&ManipulationState> {
        self.update(id, "move", |s| s.with_model(s.model.moved(dx, dy)))
    }

    /// Fit into `requested`, clamping degenerate sides to one pixel.
    pub fn resize_to(&mut self, id: &str, requested: BoundingBox) -> Option<&ManipulationState> {
        self.update(id, "resize", |s| s.with_model(s.model.resized(requested)))
    }

    /// Set the absolute rotation in degrees.
    pub fn rotate_to(&mut self, id: &str, degrees: f64) -> Option<&ManipulationState> {
        self.update(id, "rotate", |s| s.with_model(s.model.rotated(degrees)))
    }

    pub fn flip(&mut self, id: &str, axis: FlipAxis) -> Option<&ManipulationState> {
        self.update(id, "flip", |s| s.with_model(s.model.flipped(axis)))
    }

    /// Restore the original box and an identity transform. Gesture flags are cleared too.
    pub fn reset(&mut self, id: &str) -> Option<&ManipulationState> {
        self.update(id, "reset", |s| {
            let mut next = s.with_model(s.model.reset());
            next.is_dragging = false;
            next.is_resizing = false;
            next.is_rotating = false;
            next.resize_handle = None;
            next
        })
    }

    /// Merge the present keys of `partial` into the image edits.
    pub fn apply_edit(&mut self, id: &str, partial: &PartialImageEdits) -> Option<&ManipulationState> {
        self.update(id, "edit", |s| s.with_model(s.model.with_edits(partial)))
    }

    // --- Flags ---

    pub fn set_hidden(&mut self, id: &str, hidden: bool) -> Option<&ManipulationState> {
        self.update(id, "hide", |s| ManipulationState { is_hidden: hidden, ..s.clone() })
    }

    pub fn set_rotation_mode(&mut self, id: &str, on: bool) -> Option<&ManipulationState> {
        self.update(id, "rotation_mode", |s| ManipulationState { is_rotation_mode: on, ..s.clone() })
    }

    /// Mark `gesture` as active. Any other active gesture is overridden.
    pub fn begin_gesture(&mut self, id: &str, gesture: GestureKind) -> Option<&ManipulationState> {
        self.update(id, "begin_gesture", |s| {
            let mut next = s.clone();
            next.is_dragging = gesture == GestureKind::Drag;
            next.is_rotating = gesture == GestureKind::Rotate;
            next.is_resizing = matches!(gesture, GestureKind::Resize(_));
            next.resize_handle = match gesture {
                GestureKind::Resize(handle) => Some(handle),
                _ => None,
            };
            next
        })
    }

    /// Clear every gesture flag and the resize handle.
    pub fn end_gesture(&mut self, id: &str) -> Option<&ManipulationState> {
        self.update(id, "end_gesture", |s| ManipulationState {
            is_dragging: false,
            is_resizing: false,
            is_rotating: false,
            resize_handle: None,
            ..s.clone()
        })
    }
}

impl Default for TransformStore {
    fn default() -> Self {
        Self::new()
    }
}

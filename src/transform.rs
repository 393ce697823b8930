//! Transform model: one object's manipulation state and its composition rules.
//!
//! A [`TransformModel`] couples the object's original box (where segmentation
//! found it), its current box (where it is drawn now) and the [`Transform`]
//! that maps one onto the other. Every operation returns a new model; nothing
//! here mutates shared state, so the store above can prove isolation by
//! construction.
//!
//! Mapping from source pixels to the drawn position, with `origin` the
//! original box's top-left corner and `c` the current box center:
//!
//! 1. `q = origin + position + scale * (p - origin)`
//! 2. reflect `q` about `c` for each flip flag
//! 3. rotate `q` by `rotation` degrees about `c`
//!
//! Hit-testing runs the same steps backwards.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use serde::{Deserialize, Serialize};

use crate::consts::{EDIT_BLUR_RANGE, EDIT_HUE_RANGE, EDIT_PERCENT_RANGE, MIN_DIMENSION_PX};
use crate::geom::{BoundingBox, Point};

/// Non-uniform scale factors relative to the original box. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub width: f64,
    pub height: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self { width: 1.0, height: 1.0 }
    }
}

/// Axis for a mirror flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// The kinds of local image adjustment an object can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Brightness,
    Contrast,
    Saturation,
    Hue,
    Blur,
    Exposure,
    Vibrance,
}

impl EditKind {
    /// Every edit kind, in a stable order.
    pub const ALL: [EditKind; 7] = [
        EditKind::Brightness,
        EditKind::Contrast,
        EditKind::Saturation,
        EditKind::Hue,
        EditKind::Blur,
        EditKind::Exposure,
        EditKind::Vibrance,
    ];

    /// Accepted value range, inclusive.
    #[must_use]
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::Hue => EDIT_HUE_RANGE,
            Self::Blur => EDIT_BLUR_RANGE,
            _ => EDIT_PERCENT_RANGE,
        }
    }

    /// Clamp `value` into this kind's range. Non-finite input becomes zero.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }
}

/// Local image adjustments, all zero at identity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageEdits {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub hue: f64,
    pub blur: f64,
    pub exposure: f64,
    pub vibrance: f64,
}

impl ImageEdits {
    #[must_use]
    pub fn get(&self, kind: EditKind) -> f64 {
        match kind {
            EditKind::Brightness => self.brightness,
            EditKind::Contrast => self.contrast,
            EditKind::Saturation => self.saturation,
            EditKind::Hue => self.hue,
            EditKind::Blur => self.blur,
            EditKind::Exposure => self.exposure,
            EditKind::Vibrance => self.vibrance,
        }
    }

    fn slot(&mut self, kind: EditKind) -> &mut f64 {
        match kind {
            EditKind::Brightness => &mut self.brightness,
            EditKind::Contrast => &mut self.contrast,
            EditKind::Saturation => &mut self.saturation,
            EditKind::Hue => &mut self.hue,
            EditKind::Blur => &mut self.blur,
            EditKind::Exposure => &mut self.exposure,
            EditKind::Vibrance => &mut self.vibrance,
        }
    }

    /// Merge the keys present in `partial`, clamped to range. Absent keys are untouched.
    #[must_use]
    pub fn merged(mut self, partial: &PartialImageEdits) -> Self {
        for kind in EditKind::ALL {
            if let Some(v) = partial.get(kind) {
                *self.slot(kind) = kind.clamp(v);
            }
        }
        self
    }

    /// Whether every adjustment is zero.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        EditKind::ALL.iter().all(|k| self.get(*k) == 0.0)
    }
}

/// Sparse update for [`ImageEdits`]. Only present fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialImageEdits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrance: Option<f64>,
}

impl PartialImageEdits {
    /// A partial carrying a single key.
    #[must_use]
    pub fn single(kind: EditKind, value: f64) -> Self {
        let mut partial = Self::default();
        match kind {
            EditKind::Brightness => partial.brightness = Some(value),
            EditKind::Contrast => partial.contrast = Some(value),
            EditKind::Saturation => partial.saturation = Some(value),
            EditKind::Hue => partial.hue = Some(value),
            EditKind::Blur => partial.blur = Some(value),
            EditKind::Exposure => partial.exposure = Some(value),
            EditKind::Vibrance => partial.vibrance = Some(value),
        }
        partial
    }

    #[must_use]
    pub fn get(&self, kind: EditKind) -> Option<f64> {
        match kind {
            EditKind::Brightness => self.brightness,
            EditKind::Contrast => self.contrast,
            EditKind::Saturation => self.saturation,
            EditKind::Hue => self.hue,
            EditKind::Blur => self.blur,
            EditKind::Exposure => self.exposure,
            EditKind::Vibrance => self.vibrance,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        EditKind::ALL.iter().all(|k| self.get(*k).is_none())
    }
}

/// Position, scale, rotation, flips and image edits applied on top of a mask's
/// original geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Offset of the scaled original box's top-left corner from where it started.
    pub position: Point,
    pub scale: Scale,
    /// Absolute clockwise rotation in degrees about the current box center, in (-180, 180].
    pub rotation: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub image_edits: ImageEdits,
}

impl Transform {
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Normalize an angle in degrees into (-180, 180].
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// An object's original box, current box and the transform relating them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformModel {
    pub original_bounding_box: BoundingBox,
    pub current_bounding_box: BoundingBox,
    pub transform: Transform,
}

impl TransformModel {
    /// Identity model for a freshly detected object.
    #[must_use]
    pub fn new(original: BoundingBox) -> Self {
        Self { original_bounding_box: original, current_bounding_box: original, transform: Transform::identity() }
    }

    /// Translate by `(dx, dy)` source pixels.
    #[must_use]
    pub fn moved(&self, dx: f64, dy: f64) -> Self {
        let mut next = *self;
        next.transform.position.x += dx;
        next.transform.position.y += dy;
        next.current_bounding_box = self.current_bounding_box.translated(dx, dy);
        next
    }

    /// Fit the object into `requested`, keeping scale and position consistent
    /// with the original box. Sides shorter than one pixel are floored at the
    /// requested top-left corner.
    #[must_use]
    pub fn resized(&self, requested: BoundingBox) -> Self {
        let original = self.original_bounding_box;
        let origin = original.origin();
        let new_w = requested.width().max(MIN_DIMENSION_PX);
        let new_h = requested.height().max(MIN_DIMENSION_PX);
        let target = BoundingBox::from_origin_size(requested.origin(), new_w, new_h);

        let scale = Scale { width: new_w / original.width(), height: new_h / original.height() };

        // Place the scaled original center on the target center, measured from `origin`.
        let original_center = original.center();
        let target_center = target.center();
        let position = Point::new(
            (target_center.x - origin.x) - scale.width * (original_center.x - origin.x),
            (target_center.y - origin.y) - scale.height * (original_center.y - origin.y),
        );

        let mut next = *self;
        next.transform.scale = scale;
        next.transform.position = position;
        next.current_bounding_box = target;
        next
    }

    /// Set the absolute rotation. Repeating the same value is a no-op.
    #[must_use]
    pub fn rotated(&self, degrees: f64) -> Self {
        let mut next = *self;
        next.transform.rotation = normalize_degrees(degrees);
        next
    }

    /// Toggle the flip flag for `axis`.
    #[must_use]
    pub fn flipped(&self, axis: FlipAxis) -> Self {
        let mut next = *self;
        match axis {
            FlipAxis::Horizontal => next.transform.flip_horizontal = !next.transform.flip_horizontal,
            FlipAxis::Vertical => next.transform.flip_vertical = !next.transform.flip_vertical,
        }
        next
    }

    /// Back to the original box with an identity transform, edits included.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self::new(self.original_bounding_box)
    }

    /// Merge the present keys of `partial` into the image edits.
    #[must_use]
    pub fn with_edits(&self, partial: &PartialImageEdits) -> Self {
        let mut next = *self;
        next.transform.image_edits = self.transform.image_edits.merged(partial);
        next
    }

    /// Recompute the drawn (pre-rotation) box from the original box, scale and position.
    #[must_use]
    pub fn world_box(&self) -> BoundingBox {
        let original = self.original_bounding_box;
        let t = &self.transform;
        let origin = Point::new(original.x1 + t.position.x, original.y1 + t.position.y);
        BoundingBox::from_origin_size(origin, original.width() * t.scale.width, original.height() * t.scale.height)
    }

    /// Map a source-space point of the original mask to where it is drawn now.
    #[must_use]
    pub fn source_to_world(&self, p: Point) -> Point {
        let original = self.original_bounding_box;
        let t = &self.transform;
        let center = self.current_bounding_box.center();
        let mut q = Point::new(
            original.x1 + t.position.x + t.scale.width * (p.x - original.x1),
            original.y1 + t.position.y + t.scale.height * (p.y - original.y1),
        );
        if t.flip_horizontal {
            q.x = 2.0 * center.x - q.x;
        }
        if t.flip_vertical {
            q.y = 2.0 * center.y - q.y;
        }
        q.rotated_about(center, t.rotation)
    }

    /// Map a drawn point back into the original mask's source space.
    #[must_use]
    pub fn world_to_source(&self, p: Point) -> Point {
        let original = self.original_bounding_box;
        let t = &self.transform;
        let center = self.current_bounding_box.center();
        let mut q = if t.rotation == 0.0 { p } else { p.rotated_about(center, -t.rotation) };
        if t.flip_horizontal {
            q.x = 2.0 * center.x - q.x;
        }
        if t.flip_vertical {
            q.y = 2.0 * center.y - q.y;
        }
        Point::new(
            original.x1 + (q.x - original.x1 - t.position.x) / t.scale.width,
            original.y1 + (q.y - original.y1 - t.position.y) / t.scale.height,
        )
    }
}

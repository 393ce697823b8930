//! Geometry primitives shared by every layer: points, axis-aligned boxes, the
//! base image's natural size, and the display <-> source mapping.
//!
//! Source space is the base image's natural pixel grid; every bounding box and
//! transform is expressed there. Display space is whatever the host renders
//! into (CSS pixels of the overlay element). [`Viewport`] converts between the
//! two so the rest of the engine never sees display coordinates.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

use crate::consts::MIN_DIMENSION_PX;

/// A point in either display or source space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Rotate this point by `degrees` (clockwise on a y-down grid) about `center`.
    #[must_use]
    pub fn rotated_about(self, center: Point, degrees: f64) -> Point {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point { x: center.x + dx * cos - dy * sin, y: center.y + dx * sin + dy * cos }
    }

    /// Angle in degrees of the vector from `center` to this point.
    #[must_use]
    pub fn angle_from(self, center: Point) -> f64 {
        (self.y - center.y).atan2(self.x - center.x).to_degrees()
    }
}

/// Axis-aligned rectangle in source-image pixels, `x2 > x1` and `y2 > y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from a top-left corner and a size.
    #[must_use]
    pub fn from_origin_size(origin: Point, width: f64, height: f64) -> Self {
        Self { x1: origin.x, y1: origin.y, x2: origin.x + width, y2: origin.y + height }
    }

    /// Repair a box received from outside: non-finite coordinates become 0,
    /// swapped corners are reordered, and each side is at least one pixel.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        let (ax, bx) = (finite(self.x1), finite(self.x2));
        let (ay, by) = (finite(self.y1), finite(self.y2));
        let x1 = ax.min(bx);
        let y1 = ay.min(by);
        let x2 = ax.max(bx).max(x1 + MIN_DIMENSION_PX);
        let y2 = ay.max(by).max(y1 + MIN_DIMENSION_PX);
        Self { x1, y1, x2, y2 }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    /// Whether the two boxes share any area.
    #[must_use]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    /// The same box shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { x1: self.x1 + dx, y1: self.y1 + dy, x2: self.x2 + dx, y2: self.y2 + dy }
    }

    /// Component-wise comparison within `eps`.
    #[must_use]
    pub fn approx_eq(&self, other: &BoundingBox, eps: f64) -> bool {
        (self.x1 - other.x1).abs() <= eps
            && (self.y1 - other.y1).abs() <= eps
            && (self.x2 - other.x2).abs() <= eps
            && (self.y2 - other.y2).abs() <= eps
    }
}

/// Natural pixel dimensions of the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A size with a zero side carries no usable geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    #[must_use]
    pub fn diagonal(&self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }
}

/// Mapping between display space and source space.
///
/// `offset_x` / `offset_y` are where the image's top-left corner lands in
/// display pixels. `scale_x` / `scale_y` are display pixels per source pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { offset_x: 0.0, offset_y: 0.0, scale_x: 1.0, scale_y: 1.0 }
    }
}

impl Viewport {
    /// Viewport for an image of `natural` size rendered into a
    /// `display_width` x `display_height` element at the origin.
    ///
    /// Falls back to identity scale on any axis that cannot be derived.
    #[must_use]
    pub fn fit(natural: ImageSize, display_width: f64, display_height: f64) -> Self {
        let ratio = |display: f64, natural: u32| {
            if natural == 0 || !display.is_finite() || display <= 0.0 {
                1.0
            } else {
                display / f64::from(natural)
            }
        };
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale_x: ratio(display_width, natural.width),
            scale_y: ratio(display_height, natural.height),
        }
    }

    /// Convert a display-space point into source-image pixels.
    #[must_use]
    pub fn display_to_source(&self, display: Point) -> Point {
        Point { x: (display.x - self.offset_x) / self.scale_x, y: (display.y - self.offset_y) / self.scale_y }
    }

    /// Convert a source-image point into display space.
    #[must_use]
    pub fn source_to_display(&self, source: Point) -> Point {
        Point { x: source.x * self.scale_x + self.offset_x, y: source.y * self.scale_y + self.offset_y }
    }
}

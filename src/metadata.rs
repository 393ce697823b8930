//! Metadata synthesis: textual descriptors derived from live geometry.
//!
//! DESIGN
//! ======
//! Synthesis is a pure function of one object's current box, the base image
//! size, the other visible objects, its rotation and its image edits. It never
//! reads or writes transforms; the engine snapshots what it needs, calls
//! [`synthesize`], and stores the result on the object's record.
//!
//! Fields that cannot be derived (no image size yet) keep their prior value.
//! The free-text fields carry machine-generated edit clauses such as
//! `brightness +20%`. Each kind of edit owns exactly one clause: the previous
//! clause is stripped by strict pattern match before the new one is appended,
//! and a clause whose edit is back to zero is dropped.

#[cfg(test)]
#[path = "metadata_test.rs"]
mod metadata_test;

use crate::consts::{
    CENTERED_ORIENTATION, ORIENTATION_SECTOR_DEG, ORIENTATION_SECTOR_LABELS, SIZE_BAND_BOUNDS, SIZE_BAND_LABELS,
};
use crate::doc::ObjectMetadata;
use crate::geom::{BoundingBox, ImageSize, Point};
use crate::transform::{EditKind, ImageEdits};

/// Another visible object, as seen by the relationship pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub label: String,
    pub bbox: BoundingBox,
}

/// How the orientation label is chosen for a non-zero rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationPolicy {
    /// Derive the label from the rotation (rotate gestures).
    FromRotation,
    /// Keep the prior label if there is one (drag, resize, edits).
    KeepPrior,
}

/// Snapshot of everything one synthesis pass reads.
#[derive(Debug, Clone)]
pub struct SynthesisInput<'a> {
    pub current_box: BoundingBox,
    pub image_size: Option<ImageSize>,
    pub neighbors: &'a [Neighbor],
    pub rotation: f64,
    pub edits: ImageEdits,
    pub prior: &'a ObjectMetadata,
    pub orientation: OrientationPolicy,
    /// Neighbours farther than this fraction of the image diagonal do not count.
    pub neighbor_fraction: f64,
}

/// Derive a fresh set of descriptors.
#[must_use]
pub fn synthesize(input: &SynthesisInput<'_>) -> ObjectMetadata {
    let prior = input.prior;
    let size = input.image_size.filter(|s| !s.is_empty());

    let (location, relative_size, relationship) = match size {
        Some(size) => (
            location_label(&input.current_box, size),
            size_label(&input.current_box, size).to_owned(),
            relationship_label(&input.current_box, size, input.neighbors, input.neighbor_fraction),
        ),
        None => (prior.location.clone(), prior.relative_size.clone(), prior.relationship.clone()),
    };

    let orientation = match input.orientation {
        OrientationPolicy::FromRotation => orientation_label(input.rotation, None),
        OrientationPolicy::KeepPrior => orientation_label(input.rotation, Some(&prior.orientation)),
    };

    ObjectMetadata {
        description: prior.description.clone(),
        location,
        relationship,
        relative_size,
        shape_and_color: annotate(&prior.shape_and_color, &input.edits, EditField::ShapeAndColor),
        texture: annotate(&prior.texture, &input.edits, EditField::Texture),
        appearance_details: annotate(&prior.appearance_details, &input.edits, EditField::Appearance),
        orientation,
    }
}

// =============================================================================
// GEOMETRY LABELS
// =============================================================================

/// Which cell of a 3x3 grid over the image holds the box center.
#[must_use]
pub fn location_label(bbox: &BoundingBox, image: ImageSize) -> String {
    let center = bbox.center();
    let row = third(center.y, f64::from(image.height));
    let col = third(center.x, f64::from(image.width));
    let row_name = ["top", "middle", "bottom"][row];
    let col_name = ["left", "center", "right"][col];
    match (row, col) {
        (1, 1) => "center".to_owned(),
        _ => format!("{row_name}-{col_name}"),
    }
}

/// Index 0..=2 of the third that `v` falls in along an axis of length `len`.
/// Points off the image clamp to the nearest edge cell.
fn third(v: f64, len: f64) -> usize {
    let t = v / len;
    if !t.is_finite() || t < 1.0 / 3.0 {
        0
    } else if t < 2.0 / 3.0 {
        1
    } else {
        2
    }
}

/// Relative size band of the box against the whole image.
#[must_use]
pub fn size_label(bbox: &BoundingBox, image: ImageSize) -> &'static str {
    let fraction = bbox.area() / image.area();
    let band = SIZE_BAND_BOUNDS.iter().position(|bound| fraction < *bound).unwrap_or(SIZE_BAND_BOUNDS.len());
    SIZE_BAND_LABELS[band]
}

/// Relation to other objects. Any intersecting box wins (the nearest of
/// them by center distance); otherwise the nearest center within the
/// distance cutoff.
#[must_use]
pub fn relationship_label(bbox: &BoundingBox, image: ImageSize, neighbors: &[Neighbor], fraction: f64) -> String {
    let center = bbox.center();
    if let Some((overlapping, _)) = nearest_to(center, neighbors.iter().filter(|n| n.bbox.intersects(bbox))) {
        return format!("overlapping {}", overlapping.label);
    }
    match nearest_to(center, neighbors.iter()) {
        Some((neighbor, distance)) if distance <= image.diagonal() * fraction => format!("near {}", neighbor.label),
        _ => "isolated".to_owned(),
    }
}

fn nearest_to<'a>(center: Point, candidates: impl Iterator<Item = &'a Neighbor>) -> Option<(&'a Neighbor, f64)> {
    candidates.map(|n| (n, n.bbox.center().distance_to(center))).min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Orientation label for an absolute rotation in degrees.
///
/// Zero is always [`CENTERED_ORIENTATION`]. Otherwise a non-empty `prior`
/// label wins, and failing that the rotation is bucketed into compass sectors.
#[must_use]
pub fn orientation_label(rotation: f64, prior: Option<&str>) -> String {
    if rotation == 0.0 || !rotation.is_finite() {
        return CENTERED_ORIENTATION.to_owned();
    }
    if let Some(prior) = prior.map(str::trim).filter(|p| !p.is_empty()) {
        return prior.to_owned();
    }
    #[allow(clippy::cast_possible_truncation)]
    let sector = ((rotation / ORIENTATION_SECTOR_DEG).round() as i64).rem_euclid(8);
    #[allow(clippy::cast_sign_loss)]
    let label = ORIENTATION_SECTOR_LABELS[sector as usize];
    if sector == 0 {
        let direction = if rotation > 0.0 { "clockwise" } else { "counter-clockwise" };
        format!("{label} {direction}")
    } else {
        label.to_owned()
    }
}

// =============================================================================
// EDIT CLAUSES
// =============================================================================

/// Free-text field an edit kind annotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
    Appearance,
    ShapeAndColor,
    Texture,
}

fn field_for(kind: EditKind) -> EditField {
    match kind {
        EditKind::Brightness | EditKind::Contrast | EditKind::Exposure => EditField::Appearance,
        EditKind::Saturation | EditKind::Hue | EditKind::Vibrance => EditField::ShapeAndColor,
        EditKind::Blur => EditField::Texture,
    }
}

fn kind_name(kind: EditKind) -> &'static str {
    match kind {
        EditKind::Brightness => "brightness",
        EditKind::Contrast => "contrast",
        EditKind::Saturation => "saturation",
        EditKind::Hue => "hue",
        EditKind::Blur => "blur",
        EditKind::Exposure => "exposure",
        EditKind::Vibrance => "vibrance",
    }
}

/// Round to one decimal so slider noise does not leak into text.
fn rounded(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The clause describing `value` for `kind`, or `None` at zero.
#[must_use]
pub fn edit_clause(kind: EditKind, value: f64) -> Option<String> {
    let v = rounded(value);
    if v == 0.0 || !v.is_finite() {
        return None;
    }
    Some(match kind {
        EditKind::Hue => format!("hue shift {v}°"),
        EditKind::Blur => format!("blurred {v}px"),
        _ => format!("{} {v:+}%", kind_name(kind)),
    })
}

/// Whether `part` is exactly a clause [`edit_clause`] would emit for `kind`.
#[must_use]
pub fn is_edit_clause(kind: EditKind, part: &str) -> bool {
    let number = |s: &str| s.parse::<f64>().is_ok_and(f64::is_finite);
    match kind {
        EditKind::Hue => part.strip_prefix("hue shift ").and_then(|r| r.strip_suffix('°')).is_some_and(number),
        EditKind::Blur => part.strip_prefix("blurred ").and_then(|r| r.strip_suffix("px")).is_some_and(number),
        _ => part
            .strip_prefix(kind_name(kind))
            .and_then(|r| r.strip_prefix(' '))
            .and_then(|r| r.strip_suffix('%'))
            .is_some_and(|r| r.starts_with(['+', '-']) && number(r)),
    }
}

/// Rewrite one free-text field. Clauses owned by this field are only ever
/// appended after the author's text, so they are stripped from the end; the
/// author's text is left byte-for-byte. The clauses for the current edits
/// are then appended.
fn annotate(text: &str, edits: &ImageEdits, field: EditField) -> String {
    let kinds: Vec<EditKind> = EditKind::ALL.into_iter().filter(|k| field_for(*k) == field).collect();
    let owned = |part: &str| kinds.iter().any(|k| is_edit_clause(*k, part.trim()));

    let mut base = text;
    loop {
        let (head, tail) = base.rsplit_once(',').unwrap_or(("", base));
        if !owned(tail) {
            break;
        }
        base = head.trim_end();
    }

    let clauses: Vec<String> = kinds.iter().filter_map(|k| edit_clause(*k, edits.get(*k))).collect();
    if clauses.is_empty() {
        base.to_owned()
    } else if base.trim().is_empty() {
        clauses.join(", ")
    } else {
        format!("{base}, {}", clauses.join(", "))
    }
}

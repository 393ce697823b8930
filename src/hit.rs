//! Hit-testing: which mask, if any, is under a display-space point.
//!
//! Candidates are visited most-specific first (smallest mask area, then
//! highest confidence), so a button nested inside a shirt wins over the shirt.
//! Each candidate's live transform is inverted to bring the point back into
//! the original mask's source space, where the decoded alpha raster is
//! sampled. Masks whose raster is still decoding, or failed to decode, are
//! tested against their bounding box instead.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::doc::{DocStore, MaskId};
use crate::geom::{ImageSize, Point, Viewport};
use crate::manipulation::TransformStore;
use crate::raster::RasterCache;

/// How a hit was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPrecision {
    /// The alpha raster was sampled.
    Raster,
    /// No raster was available; the bounding box stood in for the mask.
    BoundingBox,
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub mask_id: MaskId,
    pub precision: HitPrecision,
}

/// Everything a hit test reads. Borrowed from the engine for one query.
pub struct HitScene<'a> {
    pub doc: &'a DocStore,
    pub transforms: &'a TransformStore,
    pub rasters: &'a RasterCache,
    pub viewport: Viewport,
    pub image_size: Option<ImageSize>,
    /// A raster sample hits when its alpha is strictly greater than this.
    pub alpha_threshold: u8,
}

/// Test which visible mask is under `display_pt`, most specific first.
#[must_use]
pub fn hit_test(display_pt: Point, scene: &HitScene<'_>) -> Option<Hit> {
    let source_pt = scene.viewport.display_to_source(display_pt);

    for record in scene.doc.by_specificity() {
        let id = record.descriptor.mask_id.as_str();
        let Some(state) = scene.transforms.get(id) else {
            continue;
        };
        if state.is_hidden {
            continue;
        }

        let model = &state.model;
        let local = model.world_to_source(source_pt);
        let original = model.original_bounding_box;

        // Unrotated objects are rejected on the box before any raster read.
        if model.transform.rotation == 0.0 && !original.contains(local) {
            continue;
        }

        let precision = match scene.rasters.get(id) {
            Some(raster) => {
                if raster.sample(local, scene.image_size) <= scene.alpha_threshold {
                    continue;
                }
                HitPrecision::Raster
            }
            None => {
                if !original.contains(local) {
                    continue;
                }
                HitPrecision::BoundingBox
            }
        };

        return Some(Hit { mask_id: id.to_owned(), precision });
    }

    None
}

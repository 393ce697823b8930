//! Document model: the masks delivered by segmentation, their descriptive
//! metadata, and the in-memory record store.
//!
//! Masks arrive as a full set ([`SegmentationResult`]) and replace whatever was
//! loaded before; there are no incremental patches. Each [`MaskRecord`] keeps
//! the immutable descriptor next to the latest [`ObjectMetadata`], which is
//! written only by metadata synthesis and never read back into geometry.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geom::BoundingBox;

/// Opaque mask identifier, stable for the lifetime of a segmentation result.
pub type MaskId = String;

/// Human-readable descriptors for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectMetadata {
    pub description: String,
    pub location: String,
    pub relationship: String,
    pub relative_size: String,
    pub shape_and_color: String,
    pub texture: String,
    pub appearance_details: String,
    pub orientation: String,
}

/// One mask as delivered by the segmentation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskDescriptor {
    pub mask_id: MaskId,
    /// Logical object this mask belongs to, when the detector grouped masks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub area_pixels: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<(i64, i64)>,
    /// Reference to the alpha mask image.
    pub mask_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_metadata: Option<ObjectMetadata>,
}

impl MaskDescriptor {
    /// Mask area used for specificity ordering. Falls back to the box area
    /// when the detector did not report a pixel count.
    #[must_use]
    pub fn effective_area(&self) -> f64 {
        if self.area_pixels > 0 {
            #[allow(clippy::cast_precision_loss)]
            let area = self.area_pixels as f64;
            area
        } else {
            self.bounding_box.sanitized().area()
        }
    }

    /// Display name used in relationship phrases.
    #[must_use]
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() { &self.mask_id } else { self.label.trim() }
    }
}

/// A full segmentation result as delivered by the upload collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentationResult {
    #[serde(default)]
    pub result_id: String,
    #[serde(default)]
    pub original_image_url: String,
    #[serde(default)]
    pub masks: Vec<MaskDescriptor>,
}

/// A loaded mask plus its current metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskRecord {
    pub descriptor: MaskDescriptor,
    pub metadata: ObjectMetadata,
}

impl MaskRecord {
    /// Seed a record from its descriptor. Structured metadata from the
    /// segmentation input wins; otherwise the label becomes the description.
    #[must_use]
    pub fn from_descriptor(descriptor: MaskDescriptor) -> Self {
        let metadata = descriptor
            .object_metadata
            .clone()
            .unwrap_or_else(|| ObjectMetadata { description: descriptor.label.clone(), ..Default::default() });
        Self { descriptor, metadata }
    }
}

/// Compare two masks by hit-test priority: smaller area first, then higher
/// confidence, then id for a stable order.
#[must_use]
pub fn specificity_cmp(a: &MaskDescriptor, b: &MaskDescriptor) -> Ordering {
    a.effective_area()
        .total_cmp(&b.effective_area())
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.mask_id.cmp(&b.mask_id))
}

/// In-memory store of mask records.
pub struct DocStore {
    records: HashMap<MaskId, MaskRecord>,
    /// Ids in hit-test priority order. Rebuilt on every snapshot load.
    order: Vec<MaskId>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { records: HashMap::new(), order: Vec::new() }
    }

    /// Replace all records with a full set. A repeated id keeps the last descriptor.
    pub fn load_snapshot(&mut self, masks: Vec<MaskDescriptor>) {
        self.records.clear();
        for mask in masks {
            self.records.insert(mask.mask_id.clone(), MaskRecord::from_descriptor(mask));
        }
        let mut sorted: Vec<&MaskRecord> = self.records.values().collect();
        sorted.sort_by(|a, b| specificity_cmp(&a.descriptor, &b.descriptor));
        self.order = sorted.into_iter().map(|r| r.descriptor.mask_id.clone()).collect();
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MaskRecord> {
        self.records.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Overwrite the metadata of an existing record. Returns false if the id is unknown.
    pub fn set_metadata(&mut self, id: &str, metadata: ObjectMetadata) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        record.metadata = metadata;
        true
    }

    /// All records in hit-test priority order (most specific first).
    #[must_use]
    pub fn by_specificity(&self) -> impl DoubleEndedIterator<Item = &MaskRecord> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Iterate over all records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &MaskRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}

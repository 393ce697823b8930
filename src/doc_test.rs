#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn descriptor(id: &str, area: u64, confidence: f64) -> MaskDescriptor {
    MaskDescriptor {
        mask_id: id.to_owned(),
        object_id: None,
        label: format!("label-{id}"),
        confidence,
        bounding_box: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        area_pixels: area,
        area_percentage: None,
        centroid: None,
        mask_url: format!("/outputs/r/{id}.png"),
        object_metadata: None,
    }
}

// =============================================================
// MaskDescriptor
// =============================================================

#[test]
fn descriptor_parses_segmentation_json() {
    let value = json!({
        "mask_id": "mask_0",
        "object_id": "obj_1",
        "label": "red mug",
        "confidence": 0.93,
        "bounding_box": { "x1": 10.0, "y1": 20.0, "x2": 110.0, "y2": 220.0 },
        "area_pixels": 15000,
        "area_percentage": 3.2,
        "centroid": [60, 120],
        "mask_url": "/outputs/abc/mask_0.png",
        "prompt_tier": "CORE",
        "object_metadata": {
            "description": "a red mug",
            "location": "center",
            "relative_size": "small",
            "shape_and_color": "cylindrical, red",
            "orientation": "upright"
        }
    });
    let d: MaskDescriptor = serde_json::from_value(value).unwrap();
    assert_eq!(d.mask_id, "mask_0");
    assert_eq!(d.object_id.as_deref(), Some("obj_1"));
    assert_eq!(d.centroid, Some((60, 120)));
    assert_eq!(d.bounding_box.x2, 110.0);
    let meta = d.object_metadata.unwrap();
    assert_eq!(meta.orientation, "upright");
    assert_eq!(meta.texture, "");
}

#[test]
fn descriptor_minimal_json_uses_defaults() {
    let value = json!({
        "mask_id": "m",
        "bounding_box": { "x1": 0.0, "y1": 0.0, "x2": 4.0, "y2": 5.0 },
        "mask_url": "m.png"
    });
    let d: MaskDescriptor = serde_json::from_value(value).unwrap();
    assert_eq!(d.confidence, 0.0);
    assert_eq!(d.area_pixels, 0);
    assert_eq!(d.effective_area(), 20.0);
}

#[test]
fn display_label_falls_back_to_id() {
    let mut d = descriptor("m1", 10, 0.5);
    d.label = "  ".into();
    assert_eq!(d.display_label(), "m1");
}

// =============================================================
// Specificity
// =============================================================

#[test]
fn specificity_orders_smaller_area_first() {
    let small = descriptor("a", 100, 0.1);
    let large = descriptor("b", 5000, 0.99);
    assert_eq!(specificity_cmp(&small, &large), Ordering::Less);
}

#[test]
fn specificity_breaks_ties_by_confidence() {
    let sure = descriptor("z", 100, 0.9);
    let unsure = descriptor("a", 100, 0.4);
    assert_eq!(specificity_cmp(&sure, &unsure), Ordering::Less);
}

// =============================================================
// MaskRecord
// =============================================================

#[test]
fn record_uses_structured_metadata_when_present() {
    let mut d = descriptor("m", 10, 0.5);
    d.object_metadata = Some(ObjectMetadata { appearance_details: "clean surface".into(), ..Default::default() });
    let r = MaskRecord::from_descriptor(d);
    assert_eq!(r.metadata.appearance_details, "clean surface");
}

#[test]
fn record_without_metadata_describes_with_label() {
    let r = MaskRecord::from_descriptor(descriptor("m", 10, 0.5));
    assert_eq!(r.metadata.description, "label-m");
}

// =============================================================
// DocStore
// =============================================================

#[test]
fn store_starts_empty() {
    let store = DocStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
}

#[test]
fn load_snapshot_replaces_everything() {
    let mut store = DocStore::new();
    store.load_snapshot(vec![descriptor("a", 1, 0.5), descriptor("b", 2, 0.5)]);
    store.load_snapshot(vec![descriptor("c", 3, 0.5)]);
    assert_eq!(store.len(), 1);
    assert!(store.contains("c"));
    assert!(!store.contains("a"));
}

#[test]
fn load_snapshot_duplicate_id_keeps_last() {
    let mut store = DocStore::new();
    let mut second = descriptor("a", 99, 0.5);
    second.label = "second".into();
    store.load_snapshot(vec![descriptor("a", 1, 0.5), second]);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("a").map(|r| r.descriptor.label.as_str()), Some("second"));
}

#[test]
fn set_metadata_unknown_id_returns_false() {
    let mut store = DocStore::new();
    assert!(!store.set_metadata("ghost", ObjectMetadata::default()));
}

#[test]
fn set_metadata_overwrites() {
    let mut store = DocStore::new();
    store.load_snapshot(vec![descriptor("a", 1, 0.5)]);
    let meta = ObjectMetadata { location: "top-left".into(), ..Default::default() };
    assert!(store.set_metadata("a", meta.clone()));
    assert_eq!(store.get("a").map(|r| &r.metadata), Some(&meta));
}

#[test]
fn by_specificity_sorts_records() {
    let mut store = DocStore::new();
    store.load_snapshot(vec![descriptor("big", 900, 0.9), descriptor("tiny", 5, 0.1), descriptor("mid", 50, 0.5)]);
    let ids: Vec<&str> = store.by_specificity().map(|r| r.descriptor.mask_id.as_str()).collect();
    assert_eq!(ids, vec!["tiny", "mid", "big"]);
}

#[test]
fn specificity_order_follows_each_snapshot() {
    let mut store = DocStore::new();
    store.load_snapshot(vec![descriptor("a", 10, 0.5), descriptor("b", 20, 0.5)]);
    store.load_snapshot(vec![descriptor("b", 5, 0.5), descriptor("c", 1, 0.5)]);
    let ids: Vec<&str> = store.by_specificity().map(|r| r.descriptor.mask_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b"]);
    let reversed: Vec<&str> = store.by_specificity().rev().map(|r| r.descriptor.mask_id.as_str()).collect();
    assert_eq!(reversed, vec!["b", "c"]);
}

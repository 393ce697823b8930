use super::*;
use crate::transform::PartialImageEdits;

fn image(w: u32, h: u32) -> ImageSize {
    ImageSize::new(w, h)
}

fn square_at(cx: f64, cy: f64, side: f64) -> BoundingBox {
    BoundingBox::new(cx - side / 2.0, cy - side / 2.0, cx + side / 2.0, cy + side / 2.0)
}

fn neighbor(label: &str, bbox: BoundingBox) -> Neighbor {
    Neighbor { label: label.to_owned(), bbox }
}

fn edits(kind: EditKind, value: f64) -> ImageEdits {
    ImageEdits::default().merged(&PartialImageEdits::single(kind, value))
}

fn input<'a>(prior: &'a ObjectMetadata, neighbors: &'a [Neighbor], edits: ImageEdits) -> SynthesisInput<'a> {
    SynthesisInput {
        current_box: square_at(500.0, 500.0, 100.0),
        image_size: Some(image(1000, 1000)),
        neighbors,
        rotation: 0.0,
        edits,
        prior,
        orientation: OrientationPolicy::KeepPrior,
        neighbor_fraction: 0.25,
    }
}

// =============================================================
// Location
// =============================================================

#[test]
fn location_buckets_into_three_by_three() {
    let img = image(300, 300);
    assert_eq!(location_label(&square_at(50.0, 50.0, 10.0), img), "top-left");
    assert_eq!(location_label(&square_at(150.0, 50.0, 10.0), img), "top-center");
    assert_eq!(location_label(&square_at(150.0, 150.0, 10.0), img), "center");
    assert_eq!(location_label(&square_at(250.0, 150.0, 10.0), img), "middle-right");
    assert_eq!(location_label(&square_at(50.0, 150.0, 10.0), img), "middle-left");
    assert_eq!(location_label(&square_at(150.0, 250.0, 10.0), img), "bottom-center");
    assert_eq!(location_label(&square_at(250.0, 250.0, 10.0), img), "bottom-right");
}

#[test]
fn location_off_image_clamps_to_edge_cell() {
    let img = image(300, 300);
    assert_eq!(location_label(&square_at(-80.0, -80.0, 10.0), img), "top-left");
    assert_eq!(location_label(&square_at(900.0, 900.0, 10.0), img), "bottom-right");
}

// =============================================================
// Relative size
// =============================================================

#[test]
fn size_bands_by_area_fraction() {
    let img = image(100, 100);
    assert_eq!(size_label(&square_at(50.0, 50.0, 9.0), img), "very small");
    assert_eq!(size_label(&square_at(50.0, 50.0, 20.0), img), "small");
    assert_eq!(size_label(&square_at(50.0, 50.0, 30.0), img), "medium");
    assert_eq!(size_label(&square_at(50.0, 50.0, 50.0), img), "large");
    assert_eq!(size_label(&square_at(50.0, 50.0, 70.0), img), "very large");
}

#[test]
fn size_band_boundary_belongs_to_upper_band() {
    // 10x10 on 100x100 is exactly 1%.
    let img = image(100, 100);
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(size_label(&bbox, img), "small");
    assert_eq!(size_label(&BoundingBox::new(0.0, 0.0, 9.99, 10.0), img), "very small");
}

#[test]
fn size_label_is_idempotent() {
    let img = image(640, 480);
    let bbox = BoundingBox::new(12.0, 40.0, 212.0, 190.0);
    let first = size_label(&bbox, img);
    for _ in 0..5 {
        assert_eq!(size_label(&bbox, img), first);
    }
}

// =============================================================
// Relationship
// =============================================================

#[test]
fn relationship_without_neighbors_is_isolated() {
    assert_eq!(relationship_label(&square_at(100.0, 100.0, 20.0), image(1000, 1000), &[], 0.25), "isolated");
}

#[test]
fn relationship_names_nearest_neighbor() {
    let me = square_at(100.0, 100.0, 20.0);
    let others = [neighbor("lamp", square_at(300.0, 100.0, 20.0)), neighbor("cup", square_at(160.0, 100.0, 20.0))];
    assert_eq!(relationship_label(&me, image(1000, 1000), &others, 0.25), "near cup");
}

#[test]
fn relationship_reports_overlap() {
    let me = square_at(100.0, 100.0, 40.0);
    let others = [neighbor("table", square_at(110.0, 110.0, 40.0))];
    assert_eq!(relationship_label(&me, image(1000, 1000), &others, 0.25), "overlapping table");
}

#[test]
fn relationship_overlap_beats_a_closer_center() {
    // The shelf's center is farther than the cup's, but only the shelf touches.
    let me = square_at(100.0, 100.0, 40.0);
    let others = [neighbor("cup", square_at(100.0, 150.0, 20.0)), neighbor("shelf", BoundingBox::new(115.0, 0.0, 400.0, 90.0))];
    assert_eq!(relationship_label(&me, image(1000, 1000), &others, 0.25), "overlapping shelf");
}

#[test]
fn relationship_far_neighbor_is_isolated() {
    // Threshold is a quarter of the ~1414px diagonal.
    let me = square_at(50.0, 50.0, 20.0);
    let others = [neighbor("door", square_at(950.0, 950.0, 20.0))];
    assert_eq!(relationship_label(&me, image(1000, 1000), &others, 0.25), "isolated");
}

// =============================================================
// Orientation
// =============================================================

#[test]
fn zero_rotation_is_centered_regardless_of_prior() {
    assert_eq!(orientation_label(0.0, Some("facing right")), "centered");
    assert_eq!(orientation_label(0.0, None), "centered");
}

#[test]
fn rotation_buckets_into_compass_sectors() {
    assert_eq!(orientation_label(45.0, None), "facing northeast");
    assert_eq!(orientation_label(90.0, None), "facing east");
    assert_eq!(orientation_label(-90.0, None), "facing west");
    assert_eq!(orientation_label(180.0, None), "upside down");
    assert_eq!(orientation_label(-135.0, None), "facing southwest");
}

#[test]
fn small_rotation_reports_direction() {
    assert_eq!(orientation_label(10.0, None), "slightly tilted clockwise");
    assert_eq!(orientation_label(-10.0, None), "slightly tilted counter-clockwise");
}

#[test]
fn prior_label_survives_non_zero_rotation() {
    assert_eq!(orientation_label(30.0, Some("standing upright")), "standing upright");
    assert_eq!(orientation_label(90.0, Some("   ")), "facing east");
}

// =============================================================
// Edit clauses
// =============================================================

#[test]
fn clause_formats() {
    assert_eq!(edit_clause(EditKind::Brightness, 20.0).as_deref(), Some("brightness +20%"));
    assert_eq!(edit_clause(EditKind::Contrast, -15.0).as_deref(), Some("contrast -15%"));
    assert_eq!(edit_clause(EditKind::Hue, 45.0).as_deref(), Some("hue shift 45°"));
    assert_eq!(edit_clause(EditKind::Blur, 5.0).as_deref(), Some("blurred 5px"));
    assert_eq!(edit_clause(EditKind::Exposure, 12.34).as_deref(), Some("exposure +12.3%"));
    assert_eq!(edit_clause(EditKind::Vibrance, 0.0), None);
    assert_eq!(edit_clause(EditKind::Saturation, 0.01), None);
}

#[test]
fn clause_pattern_is_strict() {
    assert!(is_edit_clause(EditKind::Brightness, "brightness +20%"));
    assert!(is_edit_clause(EditKind::Brightness, "brightness -7.5%"));
    assert!(!is_edit_clause(EditKind::Brightness, "brightness 20%"));
    assert!(!is_edit_clause(EditKind::Brightness, "brightness is high"));
    assert!(!is_edit_clause(EditKind::Contrast, "brightness +20%"));
    assert!(is_edit_clause(EditKind::Blur, "blurred 12px"));
    assert!(!is_edit_clause(EditKind::Blur, "blurred background"));
    assert!(is_edit_clause(EditKind::Hue, "hue shift -30°"));
    assert!(!is_edit_clause(EditKind::Hue, "warm hue"));
}

#[test]
fn brightness_appends_to_existing_appearance() {
    let prior = ObjectMetadata { appearance_details: "clean surface".into(), ..Default::default() };
    let out = synthesize(&input(&prior, &[], edits(EditKind::Brightness, 20.0)));
    assert!(out.appearance_details.contains("clean surface"));
    assert!(out.appearance_details.contains("brightness +20%"));
}

#[test]
fn repeated_blur_replaces_clause() {
    let prior = ObjectMetadata { texture: "smooth".into(), ..Default::default() };
    let first = synthesize(&input(&prior, &[], edits(EditKind::Blur, 5.0)));
    assert_eq!(first.texture, "smooth, blurred 5px");
    let second = synthesize(&input(&first, &[], edits(EditKind::Blur, 8.0)));
    assert_eq!(second.texture, "smooth, blurred 8px");
}

#[test]
fn zeroed_edit_strips_its_clause() {
    let prior = ObjectMetadata { appearance_details: "matte, brightness +20%".into(), ..Default::default() };
    let out = synthesize(&input(&prior, &[], ImageEdits::default()));
    assert_eq!(out.appearance_details, "matte");
}

#[test]
fn author_text_is_kept_verbatim() {
    let prior = ObjectMetadata {
        appearance_details: "1,200 threads,tightly woven ".into(),
        texture: "soft".into(),
        ..Default::default()
    };
    let untouched = synthesize(&input(&prior, &[], ImageEdits::default()));
    assert_eq!(untouched.appearance_details, "1,200 threads,tightly woven ");

    let edited = synthesize(&input(&prior, &[], edits(EditKind::Brightness, 20.0)));
    assert_eq!(edited.appearance_details, "1,200 threads,tightly woven , brightness +20%");
    let reverted = synthesize(&input(&edited, &[], ImageEdits::default()));
    assert_eq!(reverted.appearance_details, "1,200 threads,tightly woven");
    assert_eq!(reverted.texture, "soft");
}

#[test]
fn clause_alone_is_stripped_to_empty() {
    let prior = ObjectMetadata { texture: "blurred 4px".into(), ..Default::default() };
    assert_eq!(synthesize(&input(&prior, &[], ImageEdits::default())).texture, "");
}

#[test]
fn edits_route_to_their_fields() {
    let prior = ObjectMetadata::default();
    let mut e = edits(EditKind::Hue, 45.0);
    e.contrast = 10.0;
    let out = synthesize(&input(&prior, &[], e));
    assert_eq!(out.shape_and_color, "hue shift 45°");
    assert_eq!(out.appearance_details, "contrast +10%");
    assert!(out.texture.is_empty());
}

// =============================================================
// Synthesis
// =============================================================

#[test]
fn synthesis_fills_geometry_fields() {
    let prior = ObjectMetadata { description: "a red mug".into(), ..Default::default() };
    let others = [neighbor("saucer", square_at(600.0, 500.0, 50.0))];
    let out = synthesize(&input(&prior, &others, ImageEdits::default()));
    assert_eq!(out.description, "a red mug");
    assert_eq!(out.location, "center");
    assert_eq!(out.relative_size, "small");
    assert_eq!(out.relationship, "near saucer");
    assert_eq!(out.orientation, "centered");
}

#[test]
fn missing_image_size_keeps_prior_geometry_fields() {
    let prior = ObjectMetadata {
        location: "top-left".into(),
        relative_size: "large".into(),
        relationship: "near door".into(),
        ..Default::default()
    };
    let mut inp = input(&prior, &[], ImageEdits::default());
    inp.image_size = None;
    let out = synthesize(&inp);
    assert_eq!(out.location, "top-left");
    assert_eq!(out.relative_size, "large");
    assert_eq!(out.relationship, "near door");
}

#[test]
fn rotate_policy_derives_label() {
    let prior = ObjectMetadata { orientation: "standing upright".into(), ..Default::default() };
    let mut inp = input(&prior, &[], ImageEdits::default());
    inp.rotation = 90.0;
    assert_eq!(synthesize(&inp).orientation, "standing upright");
    inp.orientation = OrientationPolicy::FromRotation;
    assert_eq!(synthesize(&inp).orientation, "facing east");
}

#[test]
fn synthesis_is_deterministic() {
    let prior = ObjectMetadata { appearance_details: "glossy".into(), ..Default::default() };
    let e = edits(EditKind::Exposure, -30.0);
    let a = synthesize(&input(&prior, &[], e));
    let b = synthesize(&input(&prior, &[], e));
    assert_eq!(a, b);
}

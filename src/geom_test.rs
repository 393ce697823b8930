#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

// =============================================================
// Point
// =============================================================

#[test]
fn point_distance() {
    assert_eq!(Point::new(0.0, 0.0).distance_to(Point::new(3.0, 4.0)), 5.0);
}

#[test]
fn point_rotate_quarter_turn_clockwise_on_y_down_grid() {
    let p = Point::new(10.0, 0.0).rotated_about(Point::new(0.0, 0.0), 90.0);
    assert!(point_approx_eq(p, Point::new(0.0, 10.0)));
}

#[test]
fn point_rotate_and_back_is_identity() {
    let c = Point::new(50.0, 40.0);
    let p = Point::new(73.0, 12.0);
    let back = p.rotated_about(c, 37.0).rotated_about(c, -37.0);
    assert!(point_approx_eq(p, back));
}

#[test]
fn point_angle_from_center() {
    let c = Point::new(0.0, 0.0);
    assert!(approx_eq(Point::new(0.0, 5.0).angle_from(c), 90.0));
    assert!(approx_eq(Point::new(5.0, 0.0).angle_from(c), 0.0));
}

// =============================================================
// BoundingBox
// =============================================================

#[test]
fn box_dimensions_and_center() {
    let b = BoundingBox::new(100.0, 50.0, 200.0, 150.0);
    assert_eq!(b.width(), 100.0);
    assert_eq!(b.height(), 100.0);
    assert_eq!(b.area(), 10_000.0);
    assert_eq!(b.center(), Point::new(150.0, 100.0));
}

#[test]
fn box_contains_is_inclusive() {
    let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(b.contains(Point::new(0.0, 0.0)));
    assert!(b.contains(Point::new(10.0, 10.0)));
    assert!(!b.contains(Point::new(11.0, 5.0)));
    assert!(!b.contains(Point::new(5.0, -1.0)));
}

#[test]
fn box_intersects_requires_shared_area() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(a.intersects(&BoundingBox::new(5.0, 5.0, 15.0, 15.0)));
    assert!(!a.intersects(&BoundingBox::new(10.0, 0.0, 20.0, 10.0)));
}

#[test]
fn box_sanitized_reorders_and_floors() {
    let b = BoundingBox::new(20.0, 30.0, 10.0, 30.0).sanitized();
    assert_eq!(b.x1, 10.0);
    assert_eq!(b.x2, 20.0);
    assert_eq!(b.y1, 30.0);
    assert_eq!(b.y2, 31.0);
}

#[test]
fn box_sanitized_replaces_non_finite() {
    let b = BoundingBox::new(f64::NAN, 0.0, 10.0, f64::INFINITY).sanitized();
    assert_eq!(b.x1, 0.0);
    assert_eq!(b.y2, 1.0);
}

#[test]
fn box_translated() {
    let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0).translated(5.0, -2.0);
    assert_eq!(b, BoundingBox::new(5.0, -2.0, 15.0, 8.0));
}

// =============================================================
// ImageSize
// =============================================================

#[test]
fn image_size_empty_and_metrics() {
    assert!(ImageSize::new(0, 10).is_empty());
    let s = ImageSize::new(300, 400);
    assert!(!s.is_empty());
    assert_eq!(s.area(), 120_000.0);
    assert_eq!(s.diagonal(), 500.0);
}

// =============================================================
// Viewport
// =============================================================

#[test]
fn viewport_default_is_identity() {
    let v = Viewport::default();
    let p = Point::new(12.5, 7.0);
    assert_eq!(v.display_to_source(p), p);
    assert_eq!(v.source_to_display(p), p);
}

#[test]
fn viewport_fit_scales_each_axis() {
    let v = Viewport::fit(ImageSize::new(1000, 500), 500.0, 250.0);
    assert!(approx_eq(v.scale_x, 0.5));
    assert!(approx_eq(v.scale_y, 0.5));
    assert!(point_approx_eq(v.display_to_source(Point::new(100.0, 100.0)), Point::new(200.0, 200.0)));
}

#[test]
fn viewport_fit_degenerate_falls_back_to_identity() {
    let v = Viewport::fit(ImageSize::new(0, 500), 0.0, 250.0);
    assert_eq!(v.scale_x, 1.0);
    assert!(approx_eq(v.scale_y, 0.5));
}

#[test]
fn viewport_roundtrip_with_offset() {
    let v = Viewport { offset_x: 20.0, offset_y: 10.0, scale_x: 2.0, scale_y: 0.5 };
    let s = Point::new(33.0, 44.0);
    assert!(point_approx_eq(v.display_to_source(v.source_to_display(s)), s));
}

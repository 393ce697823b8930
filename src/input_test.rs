#![allow(clippy::float_cmp)]

use super::*;

fn bbox() -> BoundingBox {
    BoundingBox::new(100.0, 100.0, 200.0, 200.0)
}

// =============================================================
// Modifiers / InputState
// =============================================================

#[test]
fn modifiers_default_all_false() {
    let m = Modifiers::default();
    assert!(!m.shift && !m.ctrl && !m.alt && !m.meta);
}

#[test]
fn input_state_default_is_idle() {
    let s = InputState::default();
    assert!(s.is_idle());
    assert_eq!(s.target(), None);
}

#[test]
fn input_state_target() {
    let s = InputState::Rotating { id: "m".into(), center: Point::new(0.0, 0.0), start_angle: 0.0, start_rotation: 0.0 };
    assert_eq!(s.target(), Some("m"));
    assert!(!s.is_idle());
}

// =============================================================
// Resize
// =============================================================

#[test]
fn anchor_is_opposite_corner() {
    assert_eq!(anchor_corner(ResizeHandle::Se, &bbox()), Point::new(100.0, 100.0));
    assert_eq!(anchor_corner(ResizeHandle::Nw, &bbox()), Point::new(200.0, 200.0));
    assert_eq!(anchor_corner(ResizeHandle::Ne, &bbox()), Point::new(100.0, 200.0));
    assert_eq!(anchor_corner(ResizeHandle::Sw, &bbox()), Point::new(200.0, 100.0));
}

#[test]
fn se_handle_grows_box() {
    let anchor = anchor_corner(ResizeHandle::Se, &bbox());
    let b = box_from_handle(ResizeHandle::Se, anchor, Point::new(300.0, 300.0));
    assert_eq!(b, BoundingBox::new(100.0, 100.0, 300.0, 300.0));
}

#[test]
fn nw_handle_keeps_bottom_right() {
    let anchor = anchor_corner(ResizeHandle::Nw, &bbox());
    let b = box_from_handle(ResizeHandle::Nw, anchor, Point::new(50.0, 150.0));
    assert_eq!(b, BoundingBox::new(50.0, 150.0, 200.0, 200.0));
}

#[test]
fn crossing_anchor_clamps_to_one_pixel() {
    let anchor = anchor_corner(ResizeHandle::Se, &bbox());
    let b = box_from_handle(ResizeHandle::Se, anchor, Point::new(20.0, 20.0));
    assert_eq!(b, BoundingBox::new(100.0, 100.0, 101.0, 101.0));

    let anchor = anchor_corner(ResizeHandle::Ne, &bbox());
    let b = box_from_handle(ResizeHandle::Ne, anchor, Point::new(50.0, 250.0));
    assert_eq!(b, BoundingBox::new(100.0, 199.0, 101.0, 200.0));
}

// =============================================================
// Rotate
// =============================================================

#[test]
fn rotation_adds_sweep() {
    let r = rotation_from_sweep(10.0, 0.0, 30.0, Modifiers::default());
    assert_eq!(r, 40.0);
}

#[test]
fn rotation_wraps_into_range() {
    let r = rotation_from_sweep(170.0, 0.0, 20.0, Modifiers::default());
    assert_eq!(r, -170.0);
}

#[test]
fn shift_snaps_rotation() {
    let shift = Modifiers { shift: true, ..Modifiers::default() };
    assert_eq!(rotation_from_sweep(0.0, 0.0, 37.0, shift), 30.0);
    assert_eq!(rotation_from_sweep(0.0, 0.0, 38.0, shift), 45.0);
    assert_eq!(rotation_from_sweep(0.0, 0.0, -8.0, shift), -15.0);
}

// =============================================================
// Hover
// =============================================================

#[test]
fn hover_keeps_only_latest_position() {
    let mut h = HoverThrottle::new();
    h.pointer_moved(Point::new(1.0, 1.0));
    h.pointer_moved(Point::new(2.0, 2.0));
    h.pointer_moved(Point::new(3.0, 3.0));
    assert_eq!(h.take(), Some(PendingHover::At(Point::new(3.0, 3.0))));
    assert_eq!(h.take(), None);
}

#[test]
fn pointer_left_supersedes_move() {
    let mut h = HoverThrottle::new();
    h.pointer_moved(Point::new(1.0, 1.0));
    h.pointer_left();
    assert_eq!(h.take(), Some(PendingHover::Left));
}

#[test]
fn set_current_reports_changes_only() {
    let mut h = HoverThrottle::new();
    assert_eq!(h.set_current(Some("a".into())), Some(None));
    assert_eq!(h.set_current(Some("a".into())), None);
    assert_eq!(h.set_current(None), Some(Some("a".into())));
    assert_eq!(h.current(), None);
}

#[test]
fn clear_drops_pending_and_current() {
    let mut h = HoverThrottle::new();
    h.set_current(Some("a".into()));
    h.pointer_moved(Point::new(1.0, 1.0));
    h.clear();
    assert!(!h.has_pending());
    assert_eq!(h.current(), None);
}

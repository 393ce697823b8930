//! Shared numeric constants for the editing engine.

// ── Geometry ────────────────────────────────────────────────────

/// Smallest width/height a resized box may collapse to, in source pixels.
pub const MIN_DIMENSION_PX: f64 = 1.0;

/// Rotation snap step applied while the shift modifier is held, in degrees.
pub const ROTATION_SNAP_DEG: f64 = 15.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// A raster sample counts as inside the mask when its alpha exceeds this value.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 8;

// ── Timing ──────────────────────────────────────────────────────

/// Quiet period after the last change before metadata is synthesized.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Hover hit-tests run at most once per frame of this length.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

// ── Metadata ────────────────────────────────────────────────────

/// Upper bounds (exclusive, as a fraction of image area) of the relative
/// size bands, in ascending order. Anything above the last bound is the
/// final band.
pub const SIZE_BAND_BOUNDS: [f64; 4] = [0.01, 0.05, 0.15, 0.40];

/// Labels for the relative size bands; one more than [`SIZE_BAND_BOUNDS`].
pub const SIZE_BAND_LABELS: [&str; 5] = ["very small", "small", "medium", "large", "very large"];

/// Neighbours farther than this fraction of the image diagonal are ignored.
pub const DEFAULT_NEIGHBOR_FRACTION: f64 = 0.25;

/// Orientation label for an unrotated object.
pub const CENTERED_ORIENTATION: &str = "centered";

/// Width of one orientation sector, in degrees of rotation.
pub const ORIENTATION_SECTOR_DEG: f64 = 45.0;

/// Orientation labels by sector, clockwise from upright. Sector 0 is only
/// used for small non-zero rotations and gets a direction suffix.
pub const ORIENTATION_SECTOR_LABELS: [&str; 8] = [
    "slightly tilted",
    "facing northeast",
    "facing east",
    "facing southeast",
    "upside down",
    "facing southwest",
    "facing west",
    "facing northwest",
];

// ── Image edit ranges ───────────────────────────────────────────

/// Range shared by brightness, contrast, saturation, exposure and vibrance.
pub const EDIT_PERCENT_RANGE: (f64, f64) = (-100.0, 100.0);

/// Hue rotation range in degrees.
pub const EDIT_HUE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Blur radius range in pixels.
pub const EDIT_BLUR_RANGE: (f64, f64) = (0.0, 100.0);


//! Alpha rasters for hit-testing: decoding, sampling and the per-mask cache.
//!
//! DESIGN
//! ======
//! Mask images are full-frame RGBA PNGs whose alpha channel marks the object.
//! Only the alpha channel is retained. The cache is keyed by mask id and
//! remembers the URL each entry was decoded from, so a URL change invalidates
//! the entry and a late decode for a stale URL is dropped.
//!
//! ERROR HANDLING
//! ==============
//! A failed decode is recorded, logged once, and never retried for the same
//! URL. Hit-testing treats anything but a ready raster as "use the bounding
//! box", so a broken mask degrades precision rather than failing.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::doc::MaskId;
use crate::geom::{ImageSize, Point};

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("mask not found: {0}")]
    NotFound(String),
    #[error("mask url escapes the mask root: {0}")]
    InvalidUrl(String),
    #[error("mask image has no pixels")]
    Empty,
    #[error("alpha buffer length {actual} does not match {width}x{height}")]
    SizeMismatch { width: u32, height: u32, actual: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),
}

// =============================================================================
// MASK RASTER
// =============================================================================

/// Decoded alpha channel of one mask image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRaster {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl MaskRaster {
    /// Wrap a row-major alpha buffer.
    ///
    /// # Errors
    ///
    /// Returns `Empty` for a zero-sized raster and `SizeMismatch` when the
    /// buffer length is not `width * height`.
    pub fn new(width: u32, height: u32, alpha: Vec<u8>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty);
        }
        let expected = (width as usize) * (height as usize);
        if alpha.len() != expected {
            return Err(RasterError::SizeMismatch { width, height, actual: alpha.len() });
        }
        Ok(Self { width, height, alpha })
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel.
    ///
    /// # Errors
    ///
    /// Returns `Empty` for a zero-sized raster.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Result<Self, RasterError>
    where
        F: Fn(u32, u32) -> u8,
    {
        let alpha = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::new(width, height, alpha)
    }

    /// Decode an encoded image (PNG) and keep its alpha channel. Images
    /// without alpha use their luminance instead.
    ///
    /// # Errors
    ///
    /// Returns `Decode` when the bytes are not a supported image.
    pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
        let img = image::load_from_memory(bytes)?;
        let (width, height) = (img.width(), img.height());
        let alpha = if img.color().has_alpha() {
            img.to_rgba8().pixels().map(|p| p.0[3]).collect()
        } else {
            img.to_luma8().into_raw()
        };
        Self::new(width, height, alpha)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Alpha at integer raster coordinates; zero outside the raster.
    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.alpha[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Nearest-pixel alpha for a source-space point. The raster covers the
    /// whole base image, so source coordinates are scaled proportionally into
    /// raster coordinates; without a known image size the raster is assumed to
    /// be at source resolution. Points outside the raster read as transparent.
    #[must_use]
    pub fn sample(&self, source: Point, image: Option<ImageSize>) -> u8 {
        let (sx, sy) = match image {
            Some(size) if !size.is_empty() => (
                f64::from(self.width) / f64::from(size.width),
                f64::from(self.height) / f64::from(size.height),
            ),
            _ => (1.0, 1.0),
        };
        let rx = (source.x * sx).floor();
        let ry = (source.y * sy).floor();
        if !rx.is_finite() || !ry.is_finite() || rx < 0.0 || ry < 0.0 {
            return 0;
        }
        if rx >= f64::from(self.width) || ry >= f64::from(self.height) {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (rx as u32, ry as u32);
        self.alpha_at(x, y)
    }

    /// Number of pixels whose alpha exceeds `threshold`.
    #[must_use]
    pub fn opaque_count(&self, threshold: u8) -> usize {
        self.alpha.iter().filter(|a| **a > threshold).count()
    }
}

// =============================================================================
// MASK SOURCE
// =============================================================================

/// Where mask image bytes come from. Implementations are called from a
/// blocking worker thread.
pub trait MaskSource: Send + Sync + 'static {
    /// Fetch the encoded image behind `url`.
    ///
    /// # Errors
    ///
    /// Any failure; the mask then falls back to bounding-box hit-testing.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError>;
}

/// Resolves mask URLs such as `/outputs/<result>/mask_0.png` under a root directory.
#[derive(Debug, Clone)]
pub struct DirMaskSource {
    root: PathBuf,
}

impl DirMaskSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a URL to a path under the root, rejecting anything that climbs out.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` for parent-directory or absolute components.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, RasterError> {
        let trimmed = url.split(['?', '#']).next().unwrap_or_default().trim_start_matches('/');
        let relative = Path::new(trimmed);
        if trimmed.is_empty() || relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(RasterError::InvalidUrl(url.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

impl MaskSource for DirMaskSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError> {
        let path = self.resolve(url)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RasterError::NotFound(url.to_owned())),
            Err(e) => Err(RasterError::Io(e)),
        }
    }
}

/// In-memory source keyed by URL, for hosts that already hold mask bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryMaskSource {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryMaskSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(url.into(), bytes);
    }
}

impl MaskSource for MemoryMaskSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RasterError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| RasterError::NotFound(url.to_owned()))
    }
}

// =============================================================================
// DECODE REQUESTS
// =============================================================================

/// A mask whose raster needs decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub mask_id: MaskId,
    pub url: String,
}

/// The result of running a [`DecodeRequest`].
#[derive(Debug)]
pub struct DecodeOutcome {
    pub mask_id: MaskId,
    pub url: String,
    pub result: Result<MaskRaster, RasterError>,
}

/// Fetch and decode one mask. Blocking; run it off the interaction path.
#[must_use]
pub fn run_decode(source: &dyn MaskSource, request: DecodeRequest) -> DecodeOutcome {
    let result = source.fetch(&request.url).and_then(|bytes| MaskRaster::decode(&bytes));
    DecodeOutcome { mask_id: request.mask_id, url: request.url, result }
}

// =============================================================================
// RASTER CACHE
// =============================================================================

/// Observable state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterStatus {
    Missing,
    Pending,
    Ready,
    Failed,
}

#[derive(Debug)]
enum Slot {
    Pending { url: String },
    Ready { url: String, raster: Arc<MaskRaster> },
    Failed { url: String },
}

impl Slot {
    fn url(&self) -> &str {
        match self {
            Self::Pending { url } | Self::Ready { url, .. } | Self::Failed { url } => url,
        }
    }
}

/// Decoded rasters keyed by mask id.
#[derive(Debug, Default)]
pub struct RasterCache {
    slots: HashMap<MaskId, Slot>,
}

impl RasterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the current mask set. Entries for absent ids are
    /// evicted; new ids and ids whose URL changed become pending and are
    /// returned as decode requests. Unchanged entries are kept as they are.
    pub fn sync<I>(&mut self, masks: I) -> Vec<DecodeRequest>
    where
        I: IntoIterator<Item = (MaskId, String)>,
    {
        let masks: Vec<(MaskId, String)> = masks.into_iter().collect();
        let live: HashSet<&str> = masks.iter().map(|(id, _)| id.as_str()).collect();
        let before = self.slots.len();
        self.slots.retain(|id, _| live.contains(id.as_str()));
        let evicted = before - self.slots.len();
        if evicted > 0 {
            debug!(evicted, "evicted rasters for removed masks");
        }

        let mut requests = Vec::new();
        for (id, url) in masks {
            if self.slots.get(&id).is_some_and(|slot| slot.url() == url) {
                continue;
            }
            self.slots.insert(id.clone(), Slot::Pending { url: url.clone() });
            requests.push(DecodeRequest { mask_id: id, url });
        }
        requests
    }

    /// Store a decode outcome. Dropped (returns false) when the id was evicted,
    /// its URL changed meanwhile, or the entry is no longer pending.
    pub fn complete(&mut self, outcome: DecodeOutcome) -> bool {
        let Some(slot) = self.slots.get_mut(&outcome.mask_id) else {
            debug!(mask_id = %outcome.mask_id, "dropping decode for removed mask");
            return false;
        };
        if !matches!(slot, Slot::Pending { url } if *url == outcome.url) {
            debug!(mask_id = %outcome.mask_id, url = %outcome.url, "dropping stale decode");
            return false;
        }
        *slot = match outcome.result {
            Ok(raster) => Slot::Ready { url: outcome.url, raster: Arc::new(raster) },
            Err(e) => {
                warn!(mask_id = %outcome.mask_id, url = %outcome.url, error = %e, "mask decode failed; using bounding box");
                Slot::Failed { url: outcome.url }
            }
        };
        true
    }

    /// Insert an already decoded raster, replacing any entry for `id`.
    pub fn insert(&mut self, id: impl Into<MaskId>, url: impl Into<String>, raster: MaskRaster) {
        self.slots.insert(id.into(), Slot::Ready { url: url.into(), raster: Arc::new(raster) });
    }

    /// The decoded raster for `id`, if ready.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MaskRaster> {
        match self.slots.get(id) {
            Some(Slot::Ready { raster, .. }) => Some(raster.as_ref()),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self, id: &str) -> RasterStatus {
        match self.slots.get(id) {
            None => RasterStatus::Missing,
            Some(Slot::Pending { .. }) => RasterStatus::Pending,
            Some(Slot::Ready { .. }) => RasterStatus::Ready,
            Some(Slot::Failed { .. }) => RasterStatus::Failed,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

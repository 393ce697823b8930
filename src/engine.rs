//! Session controller: the single owner of all editing state.
//!
//! DESIGN
//! ======
//! `EngineCore` is synchronous and clock-free. Every entry point mutates state
//! and returns the [`Action`]s the host should process; anything time-based
//! takes `now` explicitly. The runtime actor supplies the clock, the frame
//! tick and raster decodes. Tests drive the core directly.
//!
//! Geometry flows one way. Gestures and direct operations mutate the
//! [`TransformStore`]; metadata synthesis runs later, from a snapshot, and only
//! writes into the [`DocStore`]. Synthesis is debounced per object, cancelled
//! when the object starts a new gesture, and committed only if the object
//! still exists at the transform version the job captured.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here fails. Unknown ids are no-ops, degenerate geometry is
//! clamped, and rasters that are missing or broken degrade hit-testing to
//! bounding boxes.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashSet;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::debounce::Debouncer;
use crate::doc::{DocStore, MaskDescriptor, MaskId, ObjectMetadata, SegmentationResult};
use crate::geom::{BoundingBox, ImageSize, Point, Viewport};
use crate::hit::{Hit, HitScene, hit_test};
use crate::input::{
    HoverThrottle, InputState, Modifiers, PendingHover, anchor_corner, box_from_handle, handle_corner,
    rotation_from_sweep,
};
use crate::manipulation::{GestureKind, ManipulationState, ResizeHandle, TransformStore};
use crate::metadata::{Neighbor, OrientationPolicy, SynthesisInput, synthesize};
use crate::raster::{DecodeOutcome, DecodeRequest, RasterCache};
use crate::transform::{FlipAxis, PartialImageEdits, Transform};

/// Actions returned from engine entry points for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Fresh descriptors for one object.
    MetadataUpdated { id: MaskId, metadata: ObjectMetadata },
    /// The hovered object changed.
    HoverChanged { from: Option<MaskId>, to: Option<MaskId> },
    /// A mask raster should be fetched and decoded off the interaction path.
    DecodeRequested(DecodeRequest),
    /// Geometry or visibility changed; redraw.
    RenderNeeded,
}

/// What the renderer needs for one visible object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderItem {
    pub mask_id: MaskId,
    pub mask_url: String,
    pub original_bounding_box: BoundingBox,
    pub current_bounding_box: BoundingBox,
    pub transform: Transform,
    pub is_rotation_mode: bool,
}

/// Payload of a pending synthesis job.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SynthesisJob {
    version: u64,
    orientation: OrientationPolicy,
}

/// Core engine state.
pub struct EngineCore {
    pub doc: DocStore,
    pub transforms: TransformStore,
    pub rasters: RasterCache,
    pub input: InputState,
    pub hover: HoverThrottle,
    pub viewport: Viewport,
    pub image_size: Option<ImageSize>,
    pub config: EngineConfig,
    synthesis: Debouncer<MaskId, SynthesisJob>,
    /// Objects rotated since their last committed synthesis whose job was
    /// cancelled by a new gesture. Their next synthesis derives orientation.
    rotation_dirty: HashSet<MaskId>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            doc: DocStore::new(),
            transforms: TransformStore::new(),
            rasters: RasterCache::new(),
            input: InputState::default(),
            hover: HoverThrottle::new(),
            viewport: Viewport::default(),
            image_size: None,
            config,
            synthesis: Debouncer::new(config.debounce()),
            rotation_dirty: HashSet::new(),
        }
    }

    // --- Data inputs ---

    /// Replace the whole object set. Manipulation state, pending synthesis,
    /// the active gesture and hover are all discarded; rasters for masks
    /// whose URL is unchanged are kept.
    pub fn load_masks(&mut self, masks: Vec<MaskDescriptor>) -> Vec<Action> {
        let cancelled = self.synthesis.cancel_all();
        self.rotation_dirty.clear();
        self.doc.load_snapshot(masks);
        self.transforms
            .rebuild(self.doc.iter().map(|r| (r.descriptor.mask_id.clone(), r.descriptor.bounding_box)));
        self.input = InputState::Idle;

        let mut actions = Vec::new();
        if let Some(from) = self.hover.set_current(None) {
            actions.push(Action::HoverChanged { from, to: None });
        }
        self.hover.clear();

        let requests = self
            .rasters
            .sync(self.doc.iter().map(|r| (r.descriptor.mask_id.clone(), r.descriptor.mask_url.clone())));
        info!(count = self.doc.len(), decodes = requests.len(), cancelled, "loaded mask set");
        actions.extend(requests.into_iter().map(Action::DecodeRequested));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Replace the object set from a full segmentation result.
    pub fn load_result(&mut self, result: SegmentationResult) -> Vec<Action> {
        self.load_masks(result.masks)
    }

    /// Natural pixel size of the base image. `None` (or an empty size)
    /// disables size-dependent descriptors.
    pub fn set_image_size(&mut self, size: Option<ImageSize>) {
        self.image_size = size.filter(|s| !s.is_empty());
    }

    /// Update the display <-> source mapping.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Store a finished raster decode. Later hit-tests use it; the current
    /// hover result is left alone.
    pub fn complete_decode(&mut self, outcome: DecodeOutcome) -> bool {
        self.rasters.complete(outcome)
    }

    // --- Gestures ---

    /// Begin dragging `id` from the display-space point `at`.
    pub fn start_drag(&mut self, id: &str, at: Point) -> Vec<Action> {
        if !self.begin(id, GestureKind::Drag) {
            return Vec::new();
        }
        self.input = InputState::Dragging { id: id.to_owned(), last_source: self.to_source(at) };
        vec![Action::RenderNeeded]
    }

    pub fn update_drag(&mut self, at: Point) -> Vec<Action> {
        let InputState::Dragging { id, last_source } = &mut self.input else {
            return Vec::new();
        };
        let source = self.viewport.display_to_source(at);
        let (dx, dy) = (source.x - last_source.x, source.y - last_source.y);
        *last_source = source;
        let id = id.clone();
        let applied = self.transforms.move_by(&id, dx, dy).is_some();
        render_if(applied)
    }

    pub fn end_drag(&mut self, now: Instant) -> Vec<Action> {
        if !matches!(self.input, InputState::Dragging { .. }) {
            return Vec::new();
        }
        self.finish(OrientationPolicy::KeepPrior, now)
    }

    /// Begin resizing `id` by its `handle` corner, grabbed at `at`.
    pub fn start_resize(&mut self, id: &str, handle: ResizeHandle, at: Point) -> Vec<Action> {
        let Some(current) = self.transforms.get(id).map(|s| s.model.current_bounding_box) else {
            return Vec::new();
        };
        if !self.begin(id, GestureKind::Resize(handle)) {
            return Vec::new();
        }
        let pointer = self.to_source(at);
        let corner = handle_corner(handle, &current);
        self.input = InputState::Resizing {
            id: id.to_owned(),
            handle,
            anchor: anchor_corner(handle, &current),
            grab_offset: Point::new(corner.x - pointer.x, corner.y - pointer.y),
        };
        vec![Action::RenderNeeded]
    }

    pub fn update_resize(&mut self, at: Point) -> Vec<Action> {
        let InputState::Resizing { id, handle, anchor, grab_offset } = &self.input else {
            return Vec::new();
        };
        let pointer = self.viewport.display_to_source(at);
        let corner = Point::new(pointer.x + grab_offset.x, pointer.y + grab_offset.y);
        let requested = box_from_handle(*handle, *anchor, corner);
        let id = id.clone();
        let applied = self.transforms.resize_to(&id, requested).is_some();
        render_if(applied)
    }

    pub fn end_resize(&mut self, now: Instant) -> Vec<Action> {
        if !matches!(self.input, InputState::Resizing { .. }) {
            return Vec::new();
        }
        self.finish(OrientationPolicy::KeepPrior, now)
    }

    /// Begin rotating `id` with the pointer at `at`.
    pub fn start_rotate(&mut self, id: &str, at: Point) -> Vec<Action> {
        let Some((center, start_rotation)) =
            self.transforms.get(id).map(|s| (s.model.current_bounding_box.center(), s.model.transform.rotation))
        else {
            return Vec::new();
        };
        if !self.begin(id, GestureKind::Rotate) {
            return Vec::new();
        }
        let start_angle = self.to_source(at).angle_from(center);
        self.input = InputState::Rotating { id: id.to_owned(), center, start_angle, start_rotation };
        vec![Action::RenderNeeded]
    }

    pub fn update_rotate(&mut self, at: Point, modifiers: Modifiers) -> Vec<Action> {
        let InputState::Rotating { id, center, start_angle, start_rotation } = &self.input else {
            return Vec::new();
        };
        let angle = self.viewport.display_to_source(at).angle_from(*center);
        let rotation = rotation_from_sweep(*start_rotation, *start_angle, angle, modifiers);
        let id = id.clone();
        let applied = self.transforms.rotate_to(&id, rotation).is_some();
        render_if(applied)
    }

    pub fn end_rotate(&mut self, now: Instant) -> Vec<Action> {
        if !matches!(self.input, InputState::Rotating { .. }) {
            return Vec::new();
        }
        self.finish(OrientationPolicy::FromRotation, now)
    }

    /// Abandon the active gesture without scheduling synthesis.
    pub fn cancel_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input).target() {
            Some(id) => {
                let applied = self.transforms.end_gesture(id).is_some();
                render_if(applied)
            }
            None => Vec::new(),
        }
    }

    /// Mark `id` as owned by `gesture`. Any gesture in progress is ended
    /// first (override), and pending synthesis for `id` is dropped.
    fn begin(&mut self, id: &str, gesture: GestureKind) -> bool {
        if self.transforms.get(id).is_none() {
            debug!(mask_id = %id, ?gesture, "ignoring gesture on unknown mask");
            return false;
        }
        if let Some(previous) = std::mem::take(&mut self.input).target() {
            self.transforms.end_gesture(previous);
        }
        let key = id.to_owned();
        if self.synthesis.payload(&key).is_some_and(|job| job.orientation == OrientationPolicy::FromRotation) {
            self.rotation_dirty.insert(key.clone());
        }
        if self.synthesis.cancel(&key) {
            debug!(mask_id = %id, "new gesture cancelled pending synthesis");
        }
        self.transforms.begin_gesture(id, gesture).is_some()
    }

    /// End the active gesture and schedule synthesis for its object.
    fn finish(&mut self, orientation: OrientationPolicy, now: Instant) -> Vec<Action> {
        let Some(id) = std::mem::take(&mut self.input).target().map(str::to_owned) else {
            return Vec::new();
        };
        if self.transforms.end_gesture(&id).is_none() {
            return Vec::new();
        }
        self.schedule_synthesis(&id, orientation, now);
        vec![Action::RenderNeeded]
    }

    fn to_source(&self, display: Point) -> Point {
        self.viewport.display_to_source(display)
    }

    // --- Direct operations ---

    /// Translate `id` by `(dx, dy)` source pixels.
    pub fn move_by(&mut self, id: &str, dx: f64, dy: f64, now: Instant) -> Vec<Action> {
        let applied = self.transforms.move_by(id, dx, dy).is_some();
        self.after_direct(id, applied, OrientationPolicy::KeepPrior, now)
    }

    /// Fit `id` into `requested` (source space).
    pub fn resize_to(&mut self, id: &str, requested: BoundingBox, now: Instant) -> Vec<Action> {
        let applied = self.transforms.resize_to(id, requested).is_some();
        self.after_direct(id, applied, OrientationPolicy::KeepPrior, now)
    }

    /// Set the absolute rotation of `id` in degrees.
    pub fn rotate_to(&mut self, id: &str, degrees: f64, now: Instant) -> Vec<Action> {
        let applied = self.transforms.rotate_to(id, degrees).is_some();
        self.after_direct(id, applied, OrientationPolicy::FromRotation, now)
    }

    pub fn flip(&mut self, id: &str, axis: FlipAxis, now: Instant) -> Vec<Action> {
        let applied = self.transforms.flip(id, axis).is_some();
        self.after_direct(id, applied, OrientationPolicy::KeepPrior, now)
    }

    /// Merge the present keys of `partial` into the image edits of `id`.
    pub fn apply_edit(&mut self, id: &str, partial: &PartialImageEdits, now: Instant) -> Vec<Action> {
        let applied = self.transforms.apply_edit(id, partial).is_some();
        self.after_direct(id, applied, OrientationPolicy::KeepPrior, now)
    }

    fn after_direct(&mut self, id: &str, applied: bool, orientation: OrientationPolicy, now: Instant) -> Vec<Action> {
        if !applied {
            return Vec::new();
        }
        self.schedule_synthesis(id, orientation, now);
        vec![Action::RenderNeeded]
    }

    /// Restore `id` to its original geometry with no edits. Metadata is
    /// synthesized immediately, so orientation reads "centered" on return.
    pub fn reset(&mut self, id: &str) -> Vec<Action> {
        if self.transforms.reset(id).is_none() {
            return Vec::new();
        }
        if self.input.target() == Some(id) {
            self.input = InputState::Idle;
        }
        self.synthesis.cancel(&id.to_owned());

        let mut actions = vec![Action::RenderNeeded];
        if let Some(metadata) = self.commit_synthesis(id, OrientationPolicy::FromRotation) {
            actions.push(Action::MetadataUpdated { id: id.to_owned(), metadata });
        }
        actions
    }

    /// Hide or show `id`. Hidden objects keep their state but are skipped by
    /// hit-testing and rendering.
    pub fn set_hidden(&mut self, id: &str, hidden: bool) -> Vec<Action> {
        if self.transforms.set_hidden(id, hidden).is_none() {
            return Vec::new();
        }
        let mut actions = vec![Action::RenderNeeded];
        if hidden && self.hover.current() == Some(id) {
            if let Some(from) = self.hover.set_current(None) {
                actions.push(Action::HoverChanged { from, to: None });
            }
        }
        actions
    }

    pub fn set_rotation_mode(&mut self, id: &str, on: bool) -> Vec<Action> {
        let applied = self.transforms.set_rotation_mode(id, on).is_some();
        render_if(applied)
    }

    // --- Hover / hit-testing ---

    /// Which visible object is under the display-space point.
    #[must_use]
    pub fn hit_test(&self, at: Point) -> Option<Hit> {
        let scene = HitScene {
            doc: &self.doc,
            transforms: &self.transforms,
            rasters: &self.rasters,
            viewport: self.viewport,
            image_size: self.image_size,
            alpha_threshold: self.config.alpha_threshold,
        };
        hit_test(at, &scene)
    }

    /// Record pointer movement. Resolved on the next [`EngineCore::on_frame`].
    pub fn pointer_moved(&mut self, at: Point) {
        self.hover.pointer_moved(at);
    }

    pub fn pointer_left(&mut self) {
        self.hover.pointer_left();
    }

    /// Run at most one hover hit-test for the latest pointer position.
    pub fn on_frame(&mut self) -> Vec<Action> {
        let next = match self.hover.take() {
            None => return Vec::new(),
            Some(PendingHover::Left) => None,
            Some(PendingHover::At(at)) => self.hit_test(at).map(|h| h.mask_id),
        };
        match self.hover.set_current(next.clone()) {
            Some(from) => vec![Action::HoverChanged { from, to: next }],
            None => Vec::new(),
        }
    }

    // --- Metadata synthesis ---

    /// When the next debounced synthesis falls due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.synthesis.next_deadline()
    }

    /// Run every synthesis job due at `now`. Jobs whose object vanished or
    /// changed since scheduling are discarded whole.
    pub fn tick(&mut self, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();
        for job in self.synthesis.take_due(now) {
            let current = self.transforms.get(&job.key).map(|s| s.version);
            if current != Some(job.payload.version) {
                debug!(mask_id = %job.key, generation = job.generation, "discarding stale synthesis");
                continue;
            }
            if let Some(metadata) = self.commit_synthesis(&job.key, job.payload.orientation) {
                actions.push(Action::MetadataUpdated { id: job.key, metadata });
            }
        }
        actions
    }

    fn schedule_synthesis(&mut self, id: &str, orientation: OrientationPolicy, now: Instant) {
        let Some(version) = self.transforms.get(id).map(|s| s.version) else {
            return;
        };
        let key = id.to_owned();
        // A rotation not yet synthesized keeps deriving orientation.
        let rotated = self.rotation_dirty.contains(&key)
            || self.synthesis.payload(&key).is_some_and(|job| job.orientation == OrientationPolicy::FromRotation);
        let orientation = if rotated { OrientationPolicy::FromRotation } else { orientation };
        let generation = self.synthesis.schedule(key, SynthesisJob { version, orientation }, now);
        debug!(mask_id = %id, version, generation, "synthesis scheduled");
    }

    /// Synthesize and store metadata for `id` from its current state.
    fn commit_synthesis(&mut self, id: &str, orientation: OrientationPolicy) -> Option<ObjectMetadata> {
        let metadata = self.synthesize_for(id, orientation)?;
        self.rotation_dirty.remove(id);
        self.doc.set_metadata(id, metadata.clone()).then_some(metadata)
    }

    fn synthesize_for(&self, id: &str, orientation: OrientationPolicy) -> Option<ObjectMetadata> {
        let record = self.doc.get(id)?;
        let state = self.transforms.get(id)?;
        let neighbors: Vec<Neighbor> = self
            .transforms
            .iter()
            .filter(|s| s.mask_id != id && !s.is_hidden)
            .filter_map(|s| {
                let other = self.doc.get(&s.mask_id)?;
                Some(Neighbor {
                    label: other.descriptor.display_label().to_owned(),
                    bbox: s.model.current_bounding_box,
                })
            })
            .collect();

        let input = SynthesisInput {
            current_box: state.model.current_bounding_box,
            image_size: self.image_size,
            neighbors: &neighbors,
            rotation: state.model.transform.rotation,
            edits: state.model.transform.image_edits,
            prior: &record.metadata,
            orientation,
            neighbor_fraction: self.config.neighbor_fraction,
        };
        Some(synthesize(&input))
    }

    // --- Queries ---

    /// Visible objects in draw order: largest first, so nested masks end up on top.
    #[must_use]
    pub fn render_snapshot(&self) -> Vec<RenderItem> {
        self.doc
            .by_specificity()
            .rev()
            .filter_map(|record| {
                let state = self.transforms.get(&record.descriptor.mask_id)?;
                if state.is_hidden {
                    return None;
                }
                Some(RenderItem {
                    mask_id: state.mask_id.clone(),
                    mask_url: record.descriptor.mask_url.clone(),
                    original_bounding_box: state.model.original_bounding_box,
                    current_bounding_box: state.model.current_bounding_box,
                    transform: state.model.transform,
                    is_rotation_mode: state.is_rotation_mode,
                })
            })
            .collect()
    }

    /// Latest metadata for `id`.
    #[must_use]
    pub fn metadata(&self, id: &str) -> Option<&ObjectMetadata> {
        self.doc.get(id).map(|r| &r.metadata)
    }

    /// Manipulation state for `id`.
    #[must_use]
    pub fn state(&self, id: &str) -> Option<&ManipulationState> {
        self.transforms.get(id)
    }

    /// The currently hovered object.
    #[must_use]
    pub fn hovered(&self) -> Option<&str> {
        self.hover.current()
    }

    /// Whether synthesis is waiting to run for `id`.
    #[must_use]
    pub fn synthesis_pending(&self, id: &str) -> bool {
        self.synthesis.is_pending(&id.to_owned())
    }
}

fn render_if(applied: bool) -> Vec<Action> {
    if applied { vec![Action::RenderNeeded] } else { Vec::new() }
}

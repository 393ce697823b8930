//! Interactive mask-overlay editing engine.
//!
//! This crate owns the manipulation state of every object mask laid over a
//! base image: drag, resize, rotate, flip, visibility and per-object image
//! adjustments. It answers "which mask is under the pointer" against each
//! mask's live transform and alpha raster, and it derives short textual
//! descriptors (location, size, orientation, neighbours, edit annotations)
//! from the live geometry. Rendering, uploads and the segmentation service are
//! the host's job; the host feeds events in and consumes [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Session controller and single owner of all state ([`engine::EngineCore`]) |
//! | [`runtime`] | tokio actor driving frames, debounce deadlines and raster decodes |
//! | [`transform`] | Per-object transform model and its composition rules |
//! | [`manipulation`] | Manipulation state per mask and the transform store |
//! | [`doc`] | Mask descriptors, object metadata and per-object records |
//! | [`raster`] | Alpha rasters, decoding and the raster cache |
//! | [`hit`] | Pixel-accurate hit-testing under transforms |
//! | [`metadata`] | Descriptor synthesis from live geometry |
//! | [`debounce`] | Trailing-edge, generation-checked debouncer |
//! | [`input`] | Gesture state machine and hover coalescing |
//! | [`geom`] | Points, boxes, image size and display mapping |
//! | [`config`] | Environment-driven tuning knobs |
//! | [`consts`] | Shared numeric constants |

pub mod config;
pub mod consts;
pub mod debounce;
pub mod doc;
pub mod engine;
pub mod geom;
pub mod hit;
pub mod input;
pub mod manipulation;
pub mod metadata;
pub mod raster;
pub mod runtime;
pub mod transform;

//! Async driver for [`EngineCore`].
//!
//! DESIGN
//! ======
//! One tokio task owns the engine. It loops on `select!` over:
//!
//! - the command channel (host events and queries)
//! - a frame ticker that resolves coalesced hover at most once per frame
//! - a sleep until the next debounced synthesis deadline
//! - finished raster decodes, which run on the blocking pool
//!
//! Every engine [`Action`] except decode requests is forwarded on the event
//! channel. That channel is unbounded so a slow listener never stalls the
//! loop. Decode requests are consumed here. The task exits once every
//! [`EngineHandle`] is dropped.
//!
//! ERROR HANDLING
//! ==============
//! The only failure a caller can see is [`RuntimeError::Closed`]: the task is
//! gone. A closed event channel is logged once and otherwise ignored.

#[cfg(test)]
#[path = "runtime_test.rs"]
mod runtime_test;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::doc::{MaskDescriptor, MaskId, ObjectMetadata};
use crate::engine::{Action, EngineCore, RenderItem};
use crate::geom::{BoundingBox, ImageSize, Point, Viewport};
use crate::hit::Hit;
use crate::input::Modifiers;
use crate::manipulation::ResizeHandle;
use crate::raster::{DecodeOutcome, DecodeRequest, MaskSource, run_decode};
use crate::transform::{FlipAxis, PartialImageEdits};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("engine runtime has shut down")]
    Closed,
}

/// Messages accepted by the runtime task. Points are display space unless
/// the variant says otherwise.
#[derive(Debug)]
pub enum Command {
    LoadMasks(Vec<MaskDescriptor>),
    SetImageSize(Option<ImageSize>),
    SetViewport(Viewport),

    StartDrag { id: MaskId, at: Point },
    UpdateDrag { at: Point },
    EndDrag,
    StartResize { id: MaskId, handle: ResizeHandle, at: Point },
    UpdateResize { at: Point },
    EndResize,
    StartRotate { id: MaskId, at: Point },
    UpdateRotate { at: Point, modifiers: Modifiers },
    EndRotate,
    CancelGesture,

    /// Source-space translation.
    MoveBy { id: MaskId, dx: f64, dy: f64 },
    /// Source-space target box.
    ResizeTo { id: MaskId, bbox: BoundingBox },
    RotateTo { id: MaskId, degrees: f64 },
    Flip { id: MaskId, axis: FlipAxis },
    ApplyEdit { id: MaskId, edits: PartialImageEdits },
    Reset { id: MaskId },
    SetHidden { id: MaskId, hidden: bool },
    SetRotationMode { id: MaskId, on: bool },

    PointerMoved(Point),
    PointerLeft,

    HitTest { at: Point, reply: oneshot::Sender<Option<Hit>> },
    Metadata { id: MaskId, reply: oneshot::Sender<Option<ObjectMetadata>> },
    RenderSnapshot { reply: oneshot::Sender<Vec<RenderItem>> },
    /// Replies once no synthesis is pending and no decode is in flight.
    Settle { reply: oneshot::Sender<()> },
}

/// Cloneable sender side of a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Queue a command.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Closed`] if the runtime task has exited.
    pub async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.tx.send(command).await.map_err(|_| RuntimeError::Closed)
    }

    async fn ask<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    /// Which object is under a display-space point, against the latest state.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Closed`] if the runtime task has exited.
    pub async fn hit_test(&self, at: Point) -> Result<Option<Hit>, RuntimeError> {
        self.ask(|reply| Command::HitTest { at, reply }).await
    }

    /// # Errors
    ///
    /// [`RuntimeError::Closed`] if the runtime task has exited.
    pub async fn metadata(&self, id: impl Into<MaskId>) -> Result<Option<ObjectMetadata>, RuntimeError> {
        let id = id.into();
        self.ask(|reply| Command::Metadata { id, reply }).await
    }

    /// # Errors
    ///
    /// [`RuntimeError::Closed`] if the runtime task has exited.
    pub async fn render_snapshot(&self) -> Result<Vec<RenderItem>, RuntimeError> {
        self.ask(|reply| Command::RenderSnapshot { reply }).await
    }

    /// Wait until pending synthesis has run and in-flight decodes have landed.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Closed`] if the runtime task has exited.
    pub async fn settle(&self) -> Result<(), RuntimeError> {
        self.ask(|reply| Command::Settle { reply }).await
    }
}

/// Spawn the runtime task. Returns the command handle and the event stream.
#[must_use]
pub fn spawn_engine(
    config: EngineConfig,
    source: Arc<dyn MaskSource>,
) -> (EngineHandle, mpsc::UnboundedReceiver<Action>) {
    let (tx, rx) = mpsc::channel::<Command>(config.command_queue);
    let (events_tx, events_rx) = mpsc::unbounded_channel::<Action>();

    info!(
        debounce_ms = config.debounce_ms,
        frame_interval_ms = config.frame_interval_ms,
        alpha_threshold = config.alpha_threshold,
        command_queue = config.command_queue,
        "engine runtime configured"
    );

    let runtime = Runtime::new(config, source, events_tx);
    tokio::spawn(runtime.run(rx));
    (EngineHandle { tx }, events_rx)
}

struct Runtime {
    engine: EngineCore,
    source: Arc<dyn MaskSource>,
    events: mpsc::UnboundedSender<Action>,
    events_open: bool,
    decode_tx: mpsc::UnboundedSender<DecodeOutcome>,
    decode_rx: mpsc::UnboundedReceiver<DecodeOutcome>,
    in_flight: usize,
    settling: Vec<oneshot::Sender<()>>,
}

impl Runtime {
    fn new(config: EngineConfig, source: Arc<dyn MaskSource>, events: mpsc::UnboundedSender<Action>) -> Self {
        let (decode_tx, decode_rx) = mpsc::unbounded_channel();
        Self {
            engine: EngineCore::new(config),
            source,
            events,
            events_open: true,
            decode_tx,
            decode_rx,
            in_flight: 0,
            settling: Vec::new(),
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut frames = tokio::time::interval(self.engine.config.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("engine runtime started");

        loop {
            let deadline = self.engine.next_deadline();
            tokio::select! {
                maybe_command = commands.recv() => {
                    let Some(command) = maybe_command else {
                        break;
                    };
                    self.handle(command);
                }
                Some(outcome) = self.decode_rx.recv() => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    let accepted = self.engine.complete_decode(outcome);
                    debug!(accepted, in_flight = self.in_flight, "mask decode finished");
                }
                _ = frames.tick() => {
                    let actions = self.engine.on_frame();
                    self.dispatch(actions);
                }
                () = sleep_until_opt(deadline) => {
                    let actions = self.engine.tick(Instant::now());
                    self.dispatch(actions);
                }
            }
            self.release_settled();
        }

        info!(masks = self.engine.doc.len(), in_flight = self.in_flight, "engine runtime stopped");
    }

    fn handle(&mut self, command: Command) {
        let now = Instant::now();
        let e = &mut self.engine;
        let actions = match command {
            Command::LoadMasks(masks) => e.load_masks(masks),
            Command::SetImageSize(size) => {
                e.set_image_size(size);
                Vec::new()
            }
            Command::SetViewport(viewport) => {
                e.set_viewport(viewport);
                Vec::new()
            }

            Command::StartDrag { id, at } => e.start_drag(&id, at),
            Command::UpdateDrag { at } => e.update_drag(at),
            Command::EndDrag => e.end_drag(now),
            Command::StartResize { id, handle, at } => e.start_resize(&id, handle, at),
            Command::UpdateResize { at } => e.update_resize(at),
            Command::EndResize => e.end_resize(now),
            Command::StartRotate { id, at } => e.start_rotate(&id, at),
            Command::UpdateRotate { at, modifiers } => e.update_rotate(at, modifiers),
            Command::EndRotate => e.end_rotate(now),
            Command::CancelGesture => e.cancel_gesture(),

            Command::MoveBy { id, dx, dy } => e.move_by(&id, dx, dy, now),
            Command::ResizeTo { id, bbox } => e.resize_to(&id, bbox, now),
            Command::RotateTo { id, degrees } => e.rotate_to(&id, degrees, now),
            Command::Flip { id, axis } => e.flip(&id, axis, now),
            Command::ApplyEdit { id, edits } => e.apply_edit(&id, &edits, now),
            Command::Reset { id } => e.reset(&id),
            Command::SetHidden { id, hidden } => e.set_hidden(&id, hidden),
            Command::SetRotationMode { id, on } => e.set_rotation_mode(&id, on),

            Command::PointerMoved(at) => {
                e.pointer_moved(at);
                Vec::new()
            }
            Command::PointerLeft => {
                e.pointer_left();
                Vec::new()
            }

            Command::HitTest { at, reply } => {
                reply_or_log(reply, e.hit_test(at), "hit_test");
                Vec::new()
            }
            Command::Metadata { id, reply } => {
                reply_or_log(reply, e.metadata(&id).cloned(), "metadata");
                Vec::new()
            }
            Command::RenderSnapshot { reply } => {
                reply_or_log(reply, e.render_snapshot(), "render_snapshot");
                Vec::new()
            }
            Command::Settle { reply } => {
                self.settling.push(reply);
                Vec::new()
            }
        };
        self.dispatch(actions);
    }

    /// Start decodes and forward everything else to the host.
    fn dispatch(&mut self, actions: Vec<Action>) {
        for action in actions {
            if let Action::DecodeRequested(request) = action {
                self.spawn_decode(request);
                continue;
            }
            if self.events_open && self.events.send(action).is_err() {
                debug!("event receiver dropped; further actions are discarded");
                self.events_open = false;
            }
        }
    }

    fn spawn_decode(&mut self, request: DecodeRequest) {
        let source = Arc::clone(&self.source);
        let tx = self.decode_tx.clone();
        self.in_flight += 1;
        debug!(mask_id = %request.mask_id, url = %request.url, "mask decode queued");
        tokio::task::spawn_blocking(move || {
            let outcome = run_decode(source.as_ref(), request);
            if tx.send(outcome).is_err() {
                debug!("runtime gone before decode finished");
            }
        });
    }

    fn release_settled(&mut self) {
        if self.settling.is_empty() || self.in_flight > 0 || self.engine.next_deadline().is_some() {
            return;
        }
        for reply in self.settling.drain(..) {
            reply_or_log(reply, (), "settle");
        }
    }
}

fn reply_or_log<T>(reply: oneshot::Sender<T>, value: T, query: &'static str) {
    if reply.send(value).is_err() {
        warn!(query, "query caller went away before the reply");
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use maskedit::config::EngineConfig;
use maskedit::doc::{MaskId, ObjectMetadata, SegmentationResult};
use maskedit::engine::RenderItem;
use maskedit::geom::{BoundingBox, ImageSize, Point, Viewport};
use maskedit::input::Modifiers;
use maskedit::manipulation::ResizeHandle;
use maskedit::raster::DirMaskSource;
use maskedit::runtime::{Command as EngineCommand, EngineHandle, RuntimeError, spawn_engine};
use maskedit::transform::{FlipAxis, PartialImageEdits};

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Parser, Debug)]
#[command(name = "maskedit", about = "Mask overlay editing engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted editing session against a segmentation result.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Segmentation result JSON (`masks` array of descriptors).
    #[arg(long)]
    masks: PathBuf,

    /// Script JSON: an array of steps.
    #[arg(long)]
    script: PathBuf,

    /// Directory that mask URLs resolve under.
    #[arg(long, env = "MASKEDIT_MASK_ROOT", default_value = ".")]
    mask_root: PathBuf,
}

/// One scripted step. Pointer positions are display space.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    ImageSize { width: u32, height: u32 },
    Viewport { offset_x: f64, offset_y: f64, scale_x: f64, scale_y: f64 },
    Drag { id: MaskId, from: Point, to: Point },
    Resize { id: MaskId, handle: ResizeHandle, from: Point, to: Point },
    Rotate {
        id: MaskId,
        from: Point,
        to: Point,
        #[serde(default)]
        shift: bool,
    },
    Move { id: MaskId, dx: f64, dy: f64 },
    ResizeTo { id: MaskId, bbox: BoundingBox },
    RotateTo { id: MaskId, degrees: f64 },
    Flip { id: MaskId, axis: FlipAxis },
    Edit { id: MaskId, edits: PartialImageEdits },
    Reset { id: MaskId },
    Hide { id: MaskId },
    Show { id: MaskId },
    Hover { at: Point },
    Leave,
    Wait { ms: u64 },
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    metadata: BTreeMap<MaskId, ObjectMetadata>,
    render: Vec<RenderItem>,
}

#[tokio::main]
async fn main() -> Result<(), ReplayError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Replay(args) => run_replay(args).await,
    }
}

async fn run_replay(args: ReplayArgs) -> Result<(), ReplayError> {
    let result: SegmentationResult = read_json(&args.masks)?;
    let steps: Vec<Step> = read_json(&args.script)?;
    let ids: Vec<MaskId> = result.masks.iter().map(|m| m.mask_id.clone()).collect();
    info!(result_id = %result.result_id, masks = ids.len(), steps = steps.len(), "replaying session");

    let source = Arc::new(DirMaskSource::new(args.mask_root));
    let (handle, mut events) = spawn_engine(EngineConfig::from_env(), source);
    tokio::spawn(async move {
        while let Some(action) = events.recv().await {
            debug!(?action, "engine event");
        }
    });

    handle.send(EngineCommand::LoadMasks(result.masks)).await?;
    for step in steps {
        run_step(&handle, step).await?;
    }
    handle.settle().await?;

    let mut metadata = BTreeMap::new();
    for id in ids {
        if let Some(md) = handle.metadata(id.clone()).await? {
            metadata.insert(id, md);
        }
    }
    let output = ReplayOutput { metadata, render: handle.render_snapshot().await? };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_step(handle: &EngineHandle, step: Step) -> Result<(), RuntimeError> {
    match step {
        Step::ImageSize { width, height } => {
            handle.send(EngineCommand::SetImageSize(Some(ImageSize::new(width, height)))).await
        }
        Step::Viewport { offset_x, offset_y, scale_x, scale_y } => {
            handle.send(EngineCommand::SetViewport(Viewport { offset_x, offset_y, scale_x, scale_y })).await
        }
        Step::Drag { id, from, to } => {
            handle.send(EngineCommand::StartDrag { id, at: from }).await?;
            handle.send(EngineCommand::UpdateDrag { at: to }).await?;
            handle.send(EngineCommand::EndDrag).await
        }
        Step::Resize { id, handle: corner, from, to } => {
            handle.send(EngineCommand::StartResize { id, handle: corner, at: from }).await?;
            handle.send(EngineCommand::UpdateResize { at: to }).await?;
            handle.send(EngineCommand::EndResize).await
        }
        Step::Rotate { id, from, to, shift } => {
            let modifiers = Modifiers { shift, ..Modifiers::default() };
            handle.send(EngineCommand::StartRotate { id, at: from }).await?;
            handle.send(EngineCommand::UpdateRotate { at: to, modifiers }).await?;
            handle.send(EngineCommand::EndRotate).await
        }
        Step::Move { id, dx, dy } => handle.send(EngineCommand::MoveBy { id, dx, dy }).await,
        Step::ResizeTo { id, bbox } => handle.send(EngineCommand::ResizeTo { id, bbox }).await,
        Step::RotateTo { id, degrees } => handle.send(EngineCommand::RotateTo { id, degrees }).await,
        Step::Flip { id, axis } => handle.send(EngineCommand::Flip { id, axis }).await,
        Step::Edit { id, edits } => handle.send(EngineCommand::ApplyEdit { id, edits }).await,
        Step::Reset { id } => handle.send(EngineCommand::Reset { id }).await,
        Step::Hide { id } => handle.send(EngineCommand::SetHidden { id, hidden: true }).await,
        Step::Show { id } => handle.send(EngineCommand::SetHidden { id, hidden: false }).await,
        Step::Hover { at } => handle.send(EngineCommand::PointerMoved(at)).await,
        Step::Leave => handle.send(EngineCommand::PointerLeft).await,
        Step::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReplayError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ReplayError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw).map_err(|source| ReplayError::Json { path: path.to_path_buf(), source })
}

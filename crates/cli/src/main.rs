use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collaboration::InMemoryBackend;
use frame_preview::{FrameCache, FrameScheduler, SyntheticSource};
use image::RgbaImage;
use serde_json::json;
use timeline::{
    format_timecode, ruler_ticks, thumbnail_tiles, Actor, Frame, TimelineViewport, UserId,
    ZoomController,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod replay;

use config::ReviewConfig;
use replay::{Replay, Step};

#[derive(Parser)]
#[command(name = "review-cli")]
#[command(about = "Review timeline CLI - headless layout, gesture replay and preview capture")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with interaction, preview and thumbnail settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Args, Clone, Copy)]
struct ViewportArgs {
    /// Video duration in seconds
    #[arg(long)]
    duration: f64,

    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Timeline container width in pixels
    #[arg(long, default_value_t = 1000.0)]
    width: f64,

    #[arg(long)]
    zoom: Option<f64>,

    /// Fit the whole duration into the container
    #[arg(long)]
    fit: bool,

    #[arg(long, default_value_t = 0.0)]
    scroll: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the viewport, ruler ticks and thumbnail tiles as JSON
    Layout {
        #[command(flatten)]
        viewport: ViewportArgs,
    },

    /// Replay a scripted gesture sequence against an in-memory bookmark backend
    Replay {
        #[command(flatten)]
        viewport: ViewportArgs,

        /// JSON array of bookmarks to start from
        #[arg(long)]
        bookmarks: Option<PathBuf>,

        /// JSON array of steps
        script: PathBuf,

        #[arg(long, default_value = "local")]
        user: String,

        #[arg(long, default_value = "Local reviewer")]
        name: String,

        /// Edit through other people's locks
        #[arg(long)]
        privileged: bool,
    },

    /// Run one frame-capture pass against a synthetic video source
    Preview {
        #[command(flatten)]
        viewport: ViewportArgs,

        /// Seconds at which seeking never completes
        #[arg(long)]
        stall: Vec<f64>,

        /// The source never reports ready
        #[arg(long)]
        never_ready: bool,

        /// Frames already in the cache
        #[arg(long)]
        cached: Vec<Frame>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ReviewConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Layout { viewport } => layout_command(&config, viewport),
        Commands::Replay {
            viewport,
            bookmarks,
            script,
            user,
            name,
            privileged,
        } => {
            let mut actor = Actor::new(UserId::new(user), name);
            if privileged {
                actor = actor.privileged();
            }
            replay_command(&config, viewport, bookmarks, script, actor).await
        }
        Commands::Preview {
            viewport,
            stall,
            never_ready,
            cached,
        } => preview_command(&config, viewport, stall, never_ready, cached).await,
    }
}

fn build_viewport(config: &ReviewConfig, args: ViewportArgs) -> TimelineViewport {
    let zoom = ZoomController::new(config.interaction);
    let mut viewport = TimelineViewport::new(args.duration, args.fps, args.width)
        .with_config(&config.interaction);
    if args.fit {
        viewport = zoom.fit_to_window(viewport);
    } else if let Some(level) = args.zoom {
        viewport = zoom.set_zoom(viewport, level);
    }
    zoom.set_scroll(viewport, args.scroll)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn layout_command(config: &ReviewConfig, args: ViewportArgs) -> Result<()> {
    let viewport = build_viewport(config, args);
    let bounds = ZoomController::new(config.interaction).bounds(&viewport);
    let (start, end) = viewport.visible_time_range();
    let tiles = thumbnail_tiles(
        &viewport,
        &FrameCache::new(),
        config.thumbnails.as_ref(),
    );

    print_json(&json!({
        "viewport": viewport,
        "zoom_bounds": { "min": bounds.min, "max": bounds.max },
        "visible": {
            "start_sec": start,
            "end_sec": end,
            "start": format_timecode(start),
            "end": format_timecode(end),
        },
        "ruler_ticks": ruler_ticks(&viewport),
        "thumbnail_tiles": tiles,
    }))
}

async fn replay_command(
    config: &ReviewConfig,
    args: ViewportArgs,
    bookmarks: Option<PathBuf>,
    script: PathBuf,
    actor: Actor,
) -> Result<()> {
    let backend = match bookmarks {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("read bookmarks {}", path.display()))?;
            InMemoryBackend::from_json(&text)
                .with_context(|| format!("parse bookmarks {}", path.display()))?
        }
        None => InMemoryBackend::new(),
    };
    let text = std::fs::read_to_string(&script)
        .with_context(|| format!("read script {}", script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&text)
        .with_context(|| format!("parse script {}", script.display()))?;

    info!(steps = steps.len(), actor = %actor.id, "replaying gestures");
    let viewport = build_viewport(config, args);
    let mut replay = Replay::new(Arc::new(backend), actor, viewport, config.interaction).await?;
    for record in replay.run(&steps).await? {
        println!("{}", serde_json::to_string(&record)?);
    }

    print_json(&json!({
        "playhead_sec": replay.playhead_sec(),
        "viewport": replay.viewport(),
        "bookmarks": replay.store().bookmarks().as_slice(),
        "last_error": replay.store().last_error(),
    }))
}

async fn preview_command(
    config: &ReviewConfig,
    args: ViewportArgs,
    stall: Vec<f64>,
    never_ready: bool,
    cached: Vec<Frame>,
) -> Result<()> {
    let viewport = build_viewport(config, args);
    let source = Arc::new(SyntheticSource::new(args.duration));
    source.set_ready(!never_ready);
    for second in stall {
        source.stall_at(second);
    }

    let cache = FrameCache::shared();
    {
        let mut cache = cache.lock();
        for frame in cached {
            cache.insert(
                frame,
                RgbaImage::new(config.preview.still_width, config.preview.still_height),
            );
        }
    }

    let scheduler = FrameScheduler::new(source, cache.clone(), config.preview);
    let report = scheduler.run(&viewport, &AtomicBool::new(false)).await;
    let tiles = thumbnail_tiles(&viewport, &*cache.lock(), config.thumbnails.as_ref());

    print_json(&json!({
        "report": report,
        "thumbnail_tiles": tiles,
    }))
}

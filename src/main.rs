use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use backdrop::config::{EngineConfig, Mode};
use backdrop::engine::{Engine, FrameOutcome};
use backdrop::host::{HeadlessHost, Viewport};

#[derive(Parser, Debug)]
#[command(version, about = "Ambient particle backdrop")]
struct Args {
    /// Simulation to run; overrides the config file.
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tick rate cap.
    #[arg(long)]
    fps: Option<f32>,

    /// Seed for reproducible particles.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run headless and write the last frame as a PNG.
    Snapshot {
        /// Ticks to run before capturing.
        #[arg(short, long, default_value_t = 120)]
        frames: u32,

        #[arg(short, long, default_value = "backdrop.png")]
        output: PathBuf,

        #[arg(long, default_value_t = 1280)]
        width: u32,

        #[arg(long, default_value_t = 720)]
        height: u32,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(mode) = args.mode {
        config = config.with_mode(mode);
    }
    if let Some(fps) = args.fps {
        config = config.with_target_fps(fps);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config.validate()?;

    match args.command {
        Some(Command::Snapshot {
            frames,
            output,
            width,
            height,
        }) => snapshot(config, frames, &output, Viewport::new(width, height)),
        None => backdrop::window::run(config).context("event loop failed"),
    }
}

/// Drive the engine on a virtual clock until `frames` ticks have been drawn.
fn snapshot(config: EngineConfig, frames: u32, output: &Path, viewport: Viewport) -> Result<()> {
    if viewport.is_empty() {
        bail!("snapshot viewport {} has no area", viewport);
    }
    let interval = config.frame_interval_ms();
    let mode = config.mode;
    let mut engine = Engine::new(HeadlessHost::with_canvas(viewport), config);
    engine.mount(mode)?;

    let mut now = 0.0;
    let mut ticked = 0;
    // Every other callback lands inside the frame interval and is throttled
    let max_callbacks = frames as u64 * 4 + 4;
    for _ in 0..max_callbacks {
        if ticked >= frames {
            break;
        }
        now += interval / 2.0 + 0.01;
        if engine.on_frame(now) == FrameOutcome::Ticked {
            ticked += 1;
        }
    }

    let canvas = engine.surface().context("engine has no surface")?;
    canvas
        .save_png(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Wrote {} after {} ticks", output.display(), ticked);
    Ok(())
}

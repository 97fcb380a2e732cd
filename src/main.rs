use anyhow::{Context, Result};
use clap::Parser;

mod cli;

use retrovid::config::VideoConfig;
use retrovid::renderer::{select_backend, FrameSync};
use retrovid::video::{BitDepth, VideoSubsystem, TILEMAP_HEIGHT, TILEMAP_WIDTH, TILE_SIZE};

const MAP_WIDTH: u32 = (TILEMAP_WIDTH * TILE_SIZE) as u32;
const MAP_HEIGHT: u32 = (TILEMAP_HEIGHT * TILE_SIZE) as u32;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    println!("retrovid version {}\n", env!("CARGO_PKG_VERSION"));

    let config = VideoConfig::resolve(&args.config)?;
    let depth = match args.bpp {
        Some(bits) => BitDepth::try_from(bits)?,
        None => config.bit_depth()?,
    };
    let window = (
        args.width.unwrap_or(config.window.width),
        args.height.unwrap_or(config.window.height),
    );
    let frames = args.frames.unwrap_or(config.frames);

    eprintln!("Using video config '{}'", config.name);

    let mut video = VideoSubsystem::new();
    video.apply_config(&config);

    let report = video
        .load_file(&args.input, depth)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    eprintln!(
        "Loaded {}x{} image: {} pixels, {} colors at {}",
        report.width, report.height, report.pixels, report.colors, report.depth
    );

    if !args.no_layout {
        if let Err(e) = video.layout_tilemap(report.width, report.height) {
            eprintln!("⚠️  Tilemap left as configured: {}", e);
        }
    }

    let mut backend = select_backend(config.prefer_gpu && !args.cpu);
    let mut sync = FrameSync::new();

    for frame in 0..frames {
        match sync.sync(video.memory(), backend.as_mut(), window) {
            Ok(()) => {
                if args.verbose {
                    let (x, y) = video.memory().scroll;
                    eprintln!("frame {}: presented on {} (scroll {},{})", frame, backend.name(), x, y);
                }
            }
            Err(e) => eprintln!("⚠️  Frame {} dropped: {}", frame, e),
        }

        let memory = video.memory_mut();
        memory.scroll.0 = memory.scroll.0.wrapping_add_signed(config.scroll_step.x) % MAP_WIDTH;
        memory.scroll.1 = memory.scroll.1.wrapping_add_signed(config.scroll_step.y) % MAP_HEIGHT;
    }

    eprintln!(
        "Rendered {} frames on {} ({} dropped)",
        sync.presented(),
        backend.name(),
        sync.dropped()
    );

    if let Some(output) = &args.output {
        let image = backend
            .frame()
            .and_then(|canvas| canvas.to_image())
            .context("No frame was presented")?;
        image
            .save(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    }

    Ok(())
}

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "retrovid")]
#[command(version)]
#[command(about = "Pack an indexed image into retro console video memory and render it", long_about = None)]
pub struct Args {
    /// Indexed GIF or palette PNG to load into video memory
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the last presented frame to this PNG file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Video config name or path
    #[arg(short, long, default_value = "default")]
    pub config: String,

    /// Bits per pixel (1, 2, 4, 8, 16 or 32); overrides the config
    #[arg(short, long)]
    pub bpp: Option<u32>,

    /// Window width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of frames to synchronize
    #[arg(short = 'n', long)]
    pub frames: Option<u32>,

    /// Render on the CPU even when a GPU is available
    #[arg(long)]
    pub cpu: bool,

    /// Leave the tilemap zeroed instead of laying out the image
    #[arg(long)]
    pub no_layout: bool,

    /// Report every frame
    #[arg(short, long)]
    pub verbose: bool,
}

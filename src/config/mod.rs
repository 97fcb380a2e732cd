use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::video::{BitDepth, VideoError, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Video settings read from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_name")]
    pub name: String,

    /// Initial output window size in pixels
    #[serde(default = "default_window")]
    pub window: Size,

    #[serde(default = "default_bits_per_pixel")]
    pub bits_per_pixel: u32,

    /// Backdrop color as RGBA bytes
    #[serde(default = "default_background")]
    pub background: [u8; 4],

    #[serde(default)]
    pub scroll: Scroll,

    /// Scroll added after every frame, wrapping around the tilemap
    #[serde(default)]
    pub scroll_step: ScrollStep,

    /// Visible part of the native screen
    #[serde(default = "default_viewport")]
    pub viewport: Size,

    #[serde(default = "default_frames")]
    pub frames: u32,

    #[serde(default = "default_prefer_gpu")]
    pub prefer_gpu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scroll {
    #[serde(default)]
    pub x: u32,

    #[serde(default)]
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScrollStep {
    #[serde(default)]
    pub x: i32,

    #[serde(default)]
    pub y: i32,
}

fn default_name() -> String {
    "custom".to_string()
}

fn default_window() -> Size {
    Size { width: 800, height: 600 }
}

fn default_bits_per_pixel() -> u32 {
    4
}

fn default_background() -> [u8; 4] {
    [0, 0, 0, 255]
}

fn default_viewport() -> Size {
    Size { width: SCREEN_WIDTH, height: SCREEN_HEIGHT }
}

fn default_frames() -> u32 {
    60
}

fn default_prefer_gpu() -> bool {
    true
}

impl VideoConfig {
    /// Load configuration from filesystem path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read video config: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse video config: {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: VideoConfig = serde_yaml::from_str(yaml)?;
        config.bit_depth()?;
        Ok(config)
    }

    /// Load configuration by name, embedded configs first, then filesystem
    pub fn load_by_name(name: &str) -> Result<Self> {
        if let Ok(config) = Self::load_builtin(name) {
            return Ok(config);
        }

        for base_path in Self::search_paths() {
            let config_path = base_path.join(format!("{}.yaml", name));
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        anyhow::bail!("Video config '{}' not found in embedded configs or filesystem", name)
    }

    /// A path to an existing file, otherwise a config name
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        let path = Path::new(name_or_path);
        if path.is_file() {
            Self::load(path)
        } else {
            Self::load_by_name(name_or_path)
        }
    }

    /// Config search paths in order of priority
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Current directory (for development)
        paths.push(PathBuf::from("config"));

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "retrovid") {
            paths.push(proj_dirs.config_dir().to_path_buf());
            paths.push(proj_dirs.data_dir().join("config"));
        }

        #[cfg(not(windows))]
        {
            paths.push(PathBuf::from("/usr/share/retrovid/config"));
            paths.push(PathBuf::from("/usr/local/share/retrovid/config"));
        }

        paths
    }

    pub fn load_builtin(name: &str) -> Result<Self> {
        let yaml = match name {
            "default" => include_str!("../../config/default.yaml"),
            "widescreen" => include_str!("../../config/widescreen.yaml"),
            "mono" => include_str!("../../config/mono.yaml"),
            _ => anyhow::bail!("Unknown builtin config: {}. Available configs: default, widescreen, mono", name),
        };

        Self::from_yaml(yaml).with_context(|| format!("Failed to parse embedded config: {}", name))
    }

    pub fn bit_depth(&self) -> Result<BitDepth, VideoError> {
        BitDepth::try_from(self.bits_per_pixel)
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        VideoConfig {
            name: "default".to_string(),
            window: default_window(),
            bits_per_pixel: default_bits_per_pixel(),
            background: default_background(),
            scroll: Scroll::default(),
            scroll_step: ScrollStep::default(),
            viewport: default_viewport(),
            frames: default_frames(),
            prefer_gpu: default_prefer_gpu(),
        }
    }
}

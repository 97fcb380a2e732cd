mod color;
mod error;
mod memory;
mod packer;
mod palette;

pub use color::Color;
pub use error::VideoError;
pub use memory::VideoMemory;
pub use packer::{pack, read_pixel, tile_position, word_address, BitDepth};
pub use palette::{load_palette, load_palette_rgb, Palette};

use std::path::Path;

use crate::config::VideoConfig;
use crate::input::IndexedImage;

/// Width and height of a tile in pixels
pub const TILE_SIZE: usize = 8;
pub const TILE_PIXELS: usize = TILE_SIZE * TILE_SIZE;

/// The bitmap page is 64 tiles across and 8 tiles down
pub const BITMAP_TILES_WIDE: usize = 64;
pub const BITMAP_TILES_HIGH: usize = 8;
pub const BITMAP_TILES: usize = BITMAP_TILES_WIDE * BITMAP_TILES_HIGH;
pub const BITMAP_PIXELS: usize = BITMAP_TILES * TILE_PIXELS;

/// One word per pixel, enough for the whole page even at 32 bpp
pub const BITMAP_WORDS: usize = BITMAP_PIXELS;

pub const TILEMAP_WIDTH: usize = 32;
pub const TILEMAP_HEIGHT: usize = 32;
pub const TILEMAP_WORDS: usize = TILEMAP_WIDTH * TILEMAP_HEIGHT;

pub const PALETTE_SIZE: usize = 256;

/// Native console resolution
pub const SCREEN_WIDTH: u32 = 240;
pub const SCREEN_HEIGHT: u32 = 160;

/// What a successful load wrote into video memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub width: usize,
    pub height: usize,
    pub pixels: usize,
    pub colors: usize,
    pub depth: BitDepth,
}

/// Owner of the one `VideoMemory` instance.
///
/// Everything that reads or writes video memory borrows it from here, so a
/// load can never overlap a sync.
#[derive(Debug, Default)]
pub struct VideoSubsystem {
    memory: VideoMemory,
}

impl VideoSubsystem {
    pub fn new() -> Self {
        Self {
            memory: VideoMemory::new(),
        }
    }

    pub fn memory(&self) -> &VideoMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut VideoMemory {
        &mut self.memory
    }

    pub fn reset(&mut self) {
        self.memory.reset();
    }

    /// Replace the bitmap and palette with an indexed image.
    ///
    /// The image is checked before anything is written: on error, video
    /// memory is exactly as it was. The bitmap is cleared before packing.
    /// Palette entries beyond the image's color count are left alone.
    pub fn load_image(&mut self, image: &IndexedImage, depth: BitDepth) -> Result<LoadReport, VideoError> {
        let colors = image.palette.as_deref().ok_or_else(|| {
            VideoError::UnsupportedFormat("image has no indexed color table".to_string())
        })?;

        self.memory.bitmap.fill(0);
        let pixels = pack(&mut self.memory.bitmap[..], &image.pixels, image.width, image.height, depth);
        let colors = load_palette(&mut self.memory.palette, colors);
        self.memory.bits_per_pixel = depth.bits();

        Ok(LoadReport {
            width: image.width,
            height: image.height,
            pixels,
            colors,
            depth,
        })
    }

    /// Decode an indexed image file and load it
    pub fn load_file(&mut self, path: &Path, depth: BitDepth) -> Result<LoadReport, VideoError> {
        let image = IndexedImage::open(path)?;
        self.load_image(&image, depth)
    }

    /// Point the tilemap at the tiles of a `width` x `height` image packed
    /// from index 0, so it shows at the top left of the map.
    ///
    /// Cells outside the image keep their current tile. The width must be a
    /// multiple of 8; otherwise strips share tiles and no cell shows one
    /// image tile, so the tilemap is left alone.
    pub fn layout_tilemap(&mut self, width: usize, height: usize) -> Result<(), VideoError> {
        if width % TILE_SIZE != 0 {
            return Err(VideoError::UnsupportedFormat(format!(
                "tilemap layout needs a width that is a multiple of {}, got {}",
                TILE_SIZE, width
            )));
        }

        let tiles_wide = width / TILE_SIZE;
        let cols = tiles_wide.min(TILEMAP_WIDTH);
        let rows = (height / TILE_SIZE).min(TILEMAP_HEIGHT);

        for row in 0..rows {
            for col in 0..cols {
                self.memory.set_tile(col, row, (row * tiles_wide + col) as u32);
            }
        }
        Ok(())
    }

    pub fn apply_config(&mut self, config: &VideoConfig) {
        self.memory.scroll = (config.scroll.x, config.scroll.y);
        self.memory.viewport = (config.viewport.width, config.viewport.height);
        self.memory.bg_color = Color::from(config.background);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(width: usize, height: usize) -> IndexedImage {
        let pixels = (0..width * height).map(|i| (i % 4) as u8).collect();
        let palette = vec![[0, 0, 0, 255], [255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
        IndexedImage::new(width, height, pixels, Some(palette))
    }

    #[test]
    fn load_packs_and_records_depth() {
        let mut video = VideoSubsystem::new();
        let report = video.load_image(&striped(16, 8), BitDepth::Two).unwrap();

        assert_eq!(report.pixels, 128);
        assert_eq!(report.colors, 4);
        assert_eq!(video.memory().bits_per_pixel, 2);
        assert_eq!(video.memory().palette[1], Color::from_bytes(255, 0, 0, 255));
        // pixel (1, 0) holds index 1
        assert_eq!(read_pixel(&video.memory().bitmap[..], 1, BitDepth::Two), 1);
    }

    #[test]
    fn load_clears_stale_bitmap() {
        let mut video = VideoSubsystem::new();
        video.memory_mut().bitmap.fill(u32::MAX);
        video.load_image(&striped(8, 8), BitDepth::Eight).unwrap();

        assert_eq!(video.memory().bitmap[0], 0x0302_0100);
        assert!(video.memory().bitmap[16..].iter().all(|&w| w == 0));
    }

    #[test]
    fn missing_color_table_leaves_memory_untouched() {
        let mut video = VideoSubsystem::new();
        video.load_image(&striped(8, 8), BitDepth::Four).unwrap();
        let before = video.memory().clone();

        let image = IndexedImage::new(8, 8, vec![1; 64], None);
        let err = video.load_image(&image, BitDepth::Eight).unwrap_err();

        assert!(matches!(err, VideoError::UnsupportedFormat(_)));
        assert_eq!(video.memory(), &before);
    }

    #[test]
    fn unreadable_file_leaves_memory_untouched() {
        let mut video = VideoSubsystem::new();
        video.memory_mut().bitmap[7] = 42;
        let before = video.memory().clone();

        let err = video
            .load_file(Path::new("/nonexistent/retrovid/tiles.gif"), BitDepth::Four)
            .unwrap_err();

        assert!(matches!(err, VideoError::SourceUnavailable { .. }));
        assert_eq!(video.memory(), &before);
    }

    #[test]
    fn layout_maps_image_tiles_in_order() {
        let mut video = VideoSubsystem::new();
        video.memory_mut().set_tile(5, 5, 99);
        video.layout_tilemap(24, 16).unwrap();

        let memory = video.memory();
        assert_eq!([memory.tile_at(0, 0), memory.tile_at(1, 0), memory.tile_at(2, 0)], [0, 1, 2]);
        assert_eq!([memory.tile_at(0, 1), memory.tile_at(1, 1), memory.tile_at(2, 1)], [3, 4, 5]);
        assert_eq!(memory.tile_at(3, 0), 0);
        assert_eq!(memory.tile_at(5, 5), 99);
    }

    #[test]
    fn layout_agrees_with_packer() {
        // Pixel (x, y) of the image lives in the tile the layout puts at
        // cell (x / 8, y / 8)
        for width in [8, 24, 40, 256] {
            let mut video = VideoSubsystem::new();
            video.layout_tilemap(width, 16).unwrap();

            for (x, y) in [(0, 0), (7, 3), (width - 1, 8), (width / 2, 12), (width - 1, 15)] {
                let tile = video.memory().tile_at(x / TILE_SIZE, y / TILE_SIZE) as usize;
                let pos = tile_position(y * width + x, width);
                assert_eq!(pos / TILE_PIXELS, tile, "{width}: ({x},{y})");
                assert_eq!(pos % TILE_PIXELS, (y % TILE_SIZE) * TILE_SIZE + x % TILE_SIZE);
            }
        }
    }

    #[test]
    fn layout_rejects_widths_that_split_tiles() {
        // With width 12 the second strip starts halfway through tile 1
        assert_eq!(tile_position(8 * 12, 12) / TILE_PIXELS, 1);

        let mut video = VideoSubsystem::new();
        video.memory_mut().set_tile(1, 1, 77);
        let before = video.memory().clone();

        let err = video.layout_tilemap(12, 16).unwrap_err();
        assert!(matches!(err, VideoError::UnsupportedFormat(_)));
        assert_eq!(video.memory(), &before);
    }

    #[test]
    fn apply_config_sets_display_fields() {
        let mut config = VideoConfig::default();
        config.scroll.x = 4;
        config.scroll.y = 12;
        config.background = [0, 0, 128, 255];

        let mut video = VideoSubsystem::new();
        video.apply_config(&config);

        let memory = video.memory();
        assert_eq!(memory.scroll, (4, 12));
        assert_eq!(memory.viewport, (config.viewport.width, config.viewport.height));
        assert_eq!(memory.bg_color, Color::from_bytes(0, 0, 128, 255));
    }
}

use super::{BitDepth, Color, Palette, BITMAP_WORDS, TILEMAP_HEIGHT, TILEMAP_WIDTH, TILEMAP_WORDS};

/// Complete video state: what the synchronizer uploads every frame.
///
/// Fields are public and unchecked. The packer and palette loader are
/// responsible for keeping them consistent.
#[derive(Clone, PartialEq)]
pub struct VideoMemory {
    /// Tile-ordered packed pixel words
    pub bitmap: Box<[u32; BITMAP_WORDS]>,
    pub palette: Palette,
    /// Row-major 32x32 grid of tile indices. Not range checked.
    pub tilemap: [u32; TILEMAP_WORDS],
    pub scroll: (u32, u32),
    pub viewport: (u32, u32),
    pub bg_color: Color,
    pub bits_per_pixel: u32,
}

impl VideoMemory {
    pub fn new() -> Self {
        Self {
            bitmap: Box::new([0; BITMAP_WORDS]),
            palette: Palette::new(),
            tilemap: [0; TILEMAP_WORDS],
            scroll: (0, 0),
            viewport: (0, 0),
            bg_color: Color::TRANSPARENT,
            bits_per_pixel: 0,
        }
    }

    /// Zero every field. Calling it again changes nothing.
    pub fn reset(&mut self) {
        self.bitmap.fill(0);
        self.palette.clear();
        self.tilemap.fill(0);
        self.scroll = (0, 0);
        self.viewport = (0, 0);
        self.bg_color = Color::TRANSPARENT;
        self.bits_per_pixel = 0;
    }

    /// The current depth, or `None` while `bits_per_pixel` is unset or invalid
    pub fn bit_depth(&self) -> Option<BitDepth> {
        BitDepth::try_from(self.bits_per_pixel).ok()
    }

    /// Tile index at cell `(col, row)`; coordinates wrap around the map
    pub fn tile_at(&self, col: usize, row: usize) -> u32 {
        self.tilemap[Self::cell(col, row)]
    }

    pub fn set_tile(&mut self, col: usize, row: usize, tile: u32) {
        self.tilemap[Self::cell(col, row)] = tile;
    }

    fn cell(col: usize, row: usize) -> usize {
        (row % TILEMAP_HEIGHT) * TILEMAP_WIDTH + col % TILEMAP_WIDTH
    }
}

impl Default for VideoMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VideoMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoMemory")
            .field("bitmap_words_set", &self.bitmap.iter().filter(|&&w| w != 0).count())
            .field("palette", &self.palette)
            .field("scroll", &self.scroll)
            .field("viewport", &self.viewport)
            .field("bg_color", &self.bg_color)
            .field("bits_per_pixel", &self.bits_per_pixel)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let memory = VideoMemory::new();
        assert!(memory.bitmap.iter().all(|&w| w == 0));
        assert!(memory.tilemap.iter().all(|&t| t == 0));
        assert_eq!(memory.bits_per_pixel, 0);
        assert_eq!(memory.bit_depth(), None);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut memory = VideoMemory::new();
        memory.bitmap[100] = 0xDEAD;
        memory.palette.set(3, Color::from_bytes(1, 2, 3, 4));
        memory.set_tile(4, 5, 77);
        memory.scroll = (8, 16);
        memory.viewport = (240, 160);
        memory.bg_color = Color::from_bytes(9, 9, 9, 9);
        memory.bits_per_pixel = 4;

        memory.reset();
        assert_eq!(memory, VideoMemory::new());
        memory.reset();
        assert_eq!(memory, VideoMemory::new());
    }

    #[test]
    fn tile_cells_wrap() {
        let mut memory = VideoMemory::new();
        memory.set_tile(33, 0, 5);
        assert_eq!(memory.tile_at(1, 0), 5);
        assert_eq!(memory.tilemap[1], 5);

        memory.set_tile(2, 3, 9);
        assert_eq!(memory.tilemap[3 * TILEMAP_WIDTH + 2], 9);
    }

    #[test]
    fn tilemap_accepts_out_of_range_tiles() {
        let mut memory = VideoMemory::new();
        memory.set_tile(0, 0, u32::MAX);
        assert_eq!(memory.tile_at(0, 0), u32::MAX);
    }
}

// Tile bit-packer: row-major indexed pixels into 8x8 tiles of packed words

use std::fmt;

use super::{VideoError, BITMAP_PIXELS, TILE_PIXELS, TILE_SIZE};

/// Bits stored per pixel index in the packed bitmap. Always divides 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    #[default]
    Four = 4,
    Eight = 8,
    Sixteen = 16,
    ThirtyTwo = 32,
}

impl BitDepth {
    pub const ALL: [BitDepth; 6] = [
        BitDepth::One,
        BitDepth::Two,
        BitDepth::Four,
        BitDepth::Eight,
        BitDepth::Sixteen,
        BitDepth::ThirtyTwo,
    ];

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn pixels_per_word(self) -> usize {
        (32 / self.bits()) as usize
    }

    /// `(1 << bits) - 1`, computed without overflowing at 32 bits
    pub fn mask(self) -> u32 {
        u32::MAX >> (32 - self.bits())
    }
}

impl TryFrom<u32> for BitDepth {
    type Error = VideoError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        BitDepth::ALL
            .into_iter()
            .find(|depth| depth.bits() == bits)
            .ok_or(VideoError::InvalidBitDepth(bits))
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bpp", self.bits())
    }
}

/// Map a linear source index to its position in tile order.
///
/// The source is cut into 8-pixel-tall strips laid end to end, then each
/// strip is linearized tile by tile so every run of 64 positions is one tile.
pub fn tile_position(index: usize, width: usize) -> usize {
    let x = index % width;
    let y = index / width;

    let strip_x = x + (y / TILE_SIZE) * width;
    let strip_y = y % TILE_SIZE;

    (strip_x % TILE_SIZE) + strip_y * TILE_SIZE + (strip_x / TILE_SIZE) * TILE_PIXELS
}

/// Word index and bit shift holding tile-order position `pos`
pub fn word_address(pos: usize, depth: BitDepth) -> (usize, u32) {
    let per_word = depth.pixels_per_word();
    let shift = (pos % per_word) as u32 * depth.bits();
    (pos / per_word, shift)
}

/// OR `source` into `bitmap` at the given depth.
///
/// Only the low `depth` bits of each source byte are kept. The bitmap is not
/// cleared first, so packing twice ORs both results together. At most
/// `BITMAP_PIXELS` source pixels are read, and any whose tile position falls
/// outside the page are dropped. Returns the number of pixels stored.
pub fn pack(bitmap: &mut [u32], source: &[u8], width: usize, height: usize, depth: BitDepth) -> usize {
    if width == 0 {
        return 0;
    }

    let count = (width * height).min(BITMAP_PIXELS).min(source.len());
    let mask = depth.mask();
    let mut stored = 0;

    for (index, &value) in source[..count].iter().enumerate() {
        // A source that ends partway through a strip still lays out whole
        // strips, so its tail can land past the page
        let pos = tile_position(index, width);
        if pos >= BITMAP_PIXELS {
            continue;
        }

        let (word, shift) = word_address(pos, depth);
        if let Some(slot) = bitmap.get_mut(word) {
            *slot |= (value as u32 & mask) << shift;
            stored += 1;
        }
    }

    stored
}

/// Read back the pixel at tile-order position `pos`
pub fn read_pixel(bitmap: &[u32], pos: usize, depth: BitDepth) -> u32 {
    let (word, shift) = word_address(pos, depth);
    bitmap
        .get(word)
        .map_or(0, |packed| (packed >> shift) & depth.mask())
}

use std::ops::Index;

use super::{Color, PALETTE_SIZE};

/// Exactly 256 colors; a `u8` index can never fall outside it
#[derive(Clone, PartialEq)]
pub struct Palette {
    colors: [Color; PALETTE_SIZE],
}

impl Palette {
    pub fn new() -> Self {
        Self {
            colors: [Color::TRANSPARENT; PALETTE_SIZE],
        }
    }

    pub fn get(&self, index: u8) -> Color {
        self.colors[index as usize]
    }

    pub fn set(&mut self, index: u8, color: Color) {
        self.colors[index as usize] = color;
    }

    pub fn colors(&self) -> &[Color; PALETTE_SIZE] {
        &self.colors
    }

    pub fn clear(&mut self) {
        self.colors = [Color::TRANSPARENT; PALETTE_SIZE];
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<u8> for Palette {
    type Output = Color;

    fn index(&self, index: u8) -> &Color {
        &self.colors[index as usize]
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.colors.iter().filter(|c| **c != Color::TRANSPARENT).count();
        f.debug_struct("Palette").field("non_zero", &used).finish()
    }
}

/// Load RGBA entries into the palette starting at index 0.
///
/// At most 256 entries are read. Entries past the end of `entries` keep
/// whatever value they had; clear the palette first for a clean load.
/// Returns the number of entries written.
pub fn load_palette(palette: &mut Palette, entries: &[[u8; 4]]) -> usize {
    let count = entries.len().min(PALETTE_SIZE);
    for (slot, &rgba) in palette.colors.iter_mut().zip(&entries[..count]) {
        *slot = Color::from(rgba);
    }
    count
}

/// Same as [`load_palette`] for RGB triples, loaded fully opaque
pub fn load_palette_rgb(palette: &mut Palette, entries: &[[u8; 3]]) -> usize {
    let rgba: Vec<[u8; 4]> = entries
        .iter()
        .take(PALETTE_SIZE)
        .map(|&[r, g, b]| [r, g, b, 255])
        .collect();
    load_palette(palette, &rgba)
}

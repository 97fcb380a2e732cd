// CPU fallback backend: decodes tilemap, bitmap and palette per output pixel
// exactly as the GPU fragment shader does

use rayon::prelude::*;

use super::{BackendError, Canvas, DisplayParams, RenderBackend};
use crate::video::{
    read_pixel, BitDepth, Color, BITMAP_TILES, BITMAP_WORDS, PALETTE_SIZE, TILEMAP_WIDTH,
    TILEMAP_WORDS, TILE_PIXELS, TILE_SIZE,
};

/// Width and height of the tilemap in pixels; scrolling wraps at this size
const MAP_PIXELS: u32 = (TILEMAP_WIDTH * TILE_SIZE) as u32;

pub struct Rasterizer {
    viewport: (u32, u32),
    window_size: [f32; 2],
    palette: Vec<Color>,
    bitmap: Vec<u32>,
    tilemap: Vec<u32>,
    bits_per_pixel: u32,
    display: DisplayParams,
    pending: Option<Canvas>,
    frame: Option<Canvas>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            viewport: (0, 0),
            window_size: [0.0; 2],
            palette: vec![Color::TRANSPARENT; PALETTE_SIZE],
            bitmap: vec![0; BITMAP_WORDS],
            tilemap: vec![0; TILEMAP_WORDS],
            bits_per_pixel: 0,
            display: bytemuck::Zeroable::zeroed(),
            pending: None,
            frame: None,
        }
    }

    /// Color of output pixel `(ox, oy)`
    fn shade(&self, depth: Option<BitDepth>, ox: u32, oy: u32) -> Color {
        let params = &self.display;
        let Some(depth) = depth else {
            return params.bg_color;
        };

        let win_w = (self.window_size[0] as u32).max(1);
        let win_h = (self.window_size[1] as u32).max(1);
        let sx = ox * params.screen_size[0] as u32 / win_w;
        let sy = oy * params.screen_size[1] as u32 / win_h;

        if sx >= params.viewport[0] || sy >= params.viewport[1] {
            return params.bg_color;
        }

        let wx = sx.wrapping_add(params.scroll[0]) % MAP_PIXELS;
        let wy = sy.wrapping_add(params.scroll[1]) % MAP_PIXELS;
        let (wx, wy) = (wx as usize, wy as usize);

        let tile = self.tilemap[(wy / TILE_SIZE) * TILEMAP_WIDTH + wx / TILE_SIZE] as usize;
        // Tiles past the bitmap page show the backdrop
        if tile >= BITMAP_TILES {
            return params.bg_color;
        }

        let pos = tile * TILE_PIXELS + (wy % TILE_SIZE) * TILE_SIZE + wx % TILE_SIZE;
        match read_pixel(&self.bitmap, pos, depth) & 0xFF {
            0 => params.bg_color,
            index => self.palette[index as usize],
        }
    }

    fn render(&self) -> Canvas {
        let (width, height) = (self.viewport.0 as usize, self.viewport.1 as usize);
        let mut canvas = Canvas::new(width, height);
        let depth = BitDepth::try_from(self.bits_per_pixel).ok();

        canvas
            .data_mut()
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(oy, row)| {
                for (ox, pixel) in row.chunks_exact_mut(4).enumerate() {
                    let color = self.shade(depth, ox as u32, oy as u32);
                    pixel.copy_from_slice(&color.to_rgba8());
                }
            });

        canvas
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

fn check_len(what: &str, got: usize, want: usize) -> Result<(), BackendError> {
    if got == want {
        Ok(())
    } else {
        Err(BackendError::new(format!("{} has {} entries, expected {}", what, got, want)))
    }
}

impl RenderBackend for Rasterizer {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::new(format!("surface {}x{} has no area", width, height)));
        }
        self.viewport = (width, height);
        Ok(())
    }

    fn upload_window_size(&mut self, size: [f32; 2]) -> Result<(), BackendError> {
        self.window_size = size;
        Ok(())
    }

    fn upload_palette(&mut self, palette: &[Color]) -> Result<(), BackendError> {
        check_len("palette", palette.len(), PALETTE_SIZE)?;
        self.palette.copy_from_slice(palette);
        Ok(())
    }

    fn upload_bitmap(&mut self, words: &[u32]) -> Result<(), BackendError> {
        check_len("bitmap", words.len(), BITMAP_WORDS)?;
        self.bitmap.copy_from_slice(words);
        Ok(())
    }

    fn upload_tilemap(&mut self, words: &[u32]) -> Result<(), BackendError> {
        check_len("tilemap", words.len(), TILEMAP_WORDS)?;
        self.tilemap.copy_from_slice(words);
        Ok(())
    }

    fn upload_bits_per_pixel(&mut self, bits: u32) -> Result<(), BackendError> {
        self.bits_per_pixel = bits;
        Ok(())
    }

    fn upload_display(&mut self, params: &DisplayParams) -> Result<(), BackendError> {
        self.display = *params;
        Ok(())
    }

    fn draw_quad(&mut self) -> Result<(), BackendError> {
        if self.viewport.0 == 0 || self.viewport.1 == 0 {
            return Err(BackendError::new("no viewport set"));
        }
        self.pending = Some(self.render());
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        let canvas = self
            .pending
            .take()
            .ok_or_else(|| BackendError::new("nothing drawn since the last present"))?;
        self.frame = Some(canvas);
        Ok(())
    }

    fn frame(&self) -> Option<&Canvas> {
        self.frame.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::FrameSync;
    use crate::video::{pack, VideoMemory, SCREEN_HEIGHT, SCREEN_WIDTH};

    const RED: [u8; 4] = [254, 0, 0, 254];
    const GREEN: [u8; 4] = [0, 254, 0, 254];
    const BLUE: [u8; 4] = [0, 0, 254, 254];

    /// 16x8 image of index 1 with a single index 2 at (9, 3), laid out as
    /// tiles 0 and 1 in the top-left cells
    fn two_tile_memory() -> VideoMemory {
        let mut source = vec![1u8; 16 * 8];
        source[3 * 16 + 9] = 2;

        let mut memory = VideoMemory::new();
        pack(&mut memory.bitmap[..], &source, 16, 8, BitDepth::Four);
        memory.palette.set(1, Color::from_bytes(255, 0, 0, 255));
        memory.palette.set(2, Color::from_bytes(0, 255, 0, 255));
        memory.set_tile(1, 0, 1);
        memory.bits_per_pixel = 4;
        memory.viewport = (SCREEN_WIDTH, SCREEN_HEIGHT);
        memory.bg_color = Color::from_bytes(0, 0, 255, 255);
        memory
    }

    fn render(memory: &VideoMemory, window: (u32, u32)) -> Canvas {
        let mut backend = Rasterizer::new();
        FrameSync::new().sync(memory, &mut backend, window).unwrap();
        backend.frame().cloned().unwrap()
    }

    #[test]
    fn decodes_tiles_at_native_size() {
        let canvas = render(&two_tile_memory(), (SCREEN_WIDTH, SCREEN_HEIGHT));

        assert_eq!((canvas.width(), canvas.height()), (240, 160));
        assert_eq!(canvas.get_pixel(0, 0), Some(RED));
        assert_eq!(canvas.get_pixel(9, 3), Some(GREEN));
        // Untouched cells still name tile 0
        assert_eq!(canvas.get_pixel(20, 3), Some(RED));
    }

    #[test]
    fn scales_to_the_window() {
        let canvas = render(&two_tile_memory(), (SCREEN_WIDTH * 2, SCREEN_HEIGHT * 2));
        assert_eq!(canvas.get_pixel(18, 6), Some(GREEN));
        assert_eq!(canvas.get_pixel(19, 7), Some(GREEN));
        assert_eq!(canvas.get_pixel(20, 6), Some(RED));
    }

    #[test]
    fn scroll_shifts_the_map() {
        let mut memory = two_tile_memory();
        memory.scroll = (8, 0);
        let canvas = render(&memory, (SCREEN_WIDTH, SCREEN_HEIGHT));
        assert_eq!(canvas.get_pixel(1, 3), Some(GREEN));
    }

    #[test]
    fn outside_viewport_is_backdrop() {
        let mut memory = two_tile_memory();
        memory.viewport = (100, 100);
        let canvas = render(&memory, (SCREEN_WIDTH, SCREEN_HEIGHT));
        assert_eq!(canvas.get_pixel(150, 10), Some(BLUE));
        assert_eq!(canvas.get_pixel(10, 120), Some(BLUE));
        assert_eq!(canvas.get_pixel(0, 0), Some(RED));
    }

    #[test]
    fn index_zero_and_out_of_range_tiles_are_backdrop() {
        let mut memory = two_tile_memory();
        memory.set_tile(2, 0, BITMAP_TILES as u32);
        memory.bitmap.fill(0);
        memory.bitmap[0] = 0x0000_0010; // pixel (1, 0) = 1, pixel (0, 0) = 0

        let canvas = render(&memory, (SCREEN_WIDTH, SCREEN_HEIGHT));
        assert_eq!(canvas.get_pixel(0, 0), Some(BLUE));
        assert_eq!(canvas.get_pixel(1, 0), Some(RED));
        assert_eq!(canvas.get_pixel(17, 0), Some(BLUE));
    }

    #[test]
    fn unset_bit_depth_draws_only_backdrop() {
        let mut memory = two_tile_memory();
        memory.bits_per_pixel = 3;
        let canvas = render(&memory, (64, 64));
        assert!(canvas.data().chunks_exact(4).all(|px| px == BLUE));
    }

    #[test]
    fn zero_sized_window_is_rejected() {
        let mut backend = Rasterizer::new();
        let err = FrameSync::new()
            .sync(&two_tile_memory(), &mut backend, (0, 600))
            .unwrap_err();
        assert!(matches!(err, crate::video::VideoError::BackendRejected { .. }));
        assert!(backend.frame().is_none());
    }

    #[test]
    fn wrong_sized_uploads_are_rejected() {
        let mut backend = Rasterizer::new();
        assert!(backend.upload_bitmap(&[0; 8]).is_err());
        assert!(backend.upload_palette(&[Color::TRANSPARENT; 3]).is_err());
        assert!(backend.upload_tilemap(&[0; TILEMAP_WORDS]).is_ok());
    }
}

use super::{DisplayParams, RenderBackend, SyncStage};
use crate::video::{VideoError, VideoMemory};

/// Pushes video memory to a backend once per frame.
///
/// Every call uploads the whole state; nothing is diffed. A rejected upload
/// abandons the frame before anything is drawn. Video memory is only read.
#[derive(Debug, Default)]
pub struct FrameSync {
    presented: u64,
    dropped: u64,
}

impl FrameSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync<B>(&mut self, memory: &VideoMemory, backend: &mut B, window: (u32, u32)) -> Result<(), VideoError>
    where
        B: RenderBackend + ?Sized,
    {
        match Self::submit(memory, backend, window) {
            Ok(()) => {
                self.presented += 1;
                Ok(())
            }
            Err(e) => {
                self.dropped += 1;
                Err(e)
            }
        }
    }

    fn submit<B>(memory: &VideoMemory, backend: &mut B, (width, height): (u32, u32)) -> Result<(), VideoError>
    where
        B: RenderBackend + ?Sized,
    {
        backend
            .set_viewport(width, height)
            .map_err(|e| e.at(SyncStage::Viewport))?;

        backend
            .upload_window_size([width as f32, height as f32])
            .map_err(|e| e.at(SyncStage::WindowSize))?;
        backend
            .upload_palette(memory.palette.colors())
            .map_err(|e| e.at(SyncStage::Palette))?;
        backend
            .upload_bitmap(&memory.bitmap[..])
            .map_err(|e| e.at(SyncStage::Bitmap))?;
        backend
            .upload_tilemap(&memory.tilemap)
            .map_err(|e| e.at(SyncStage::Tilemap))?;
        backend
            .upload_bits_per_pixel(memory.bits_per_pixel)
            .map_err(|e| e.at(SyncStage::BitDepth))?;
        backend
            .upload_display(&DisplayParams::from_memory(memory))
            .map_err(|e| e.at(SyncStage::Display))?;

        backend.draw_quad().map_err(|e| e.at(SyncStage::Draw))?;
        backend.present().map_err(|e| e.at(SyncStage::Present))
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

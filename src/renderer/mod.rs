mod canvas;
mod rasterizer;
mod recording;
mod sync;
#[cfg(feature = "gpu")]
mod gpu_renderer;

pub use canvas::Canvas;
pub use rasterizer::Rasterizer;
pub use recording::{BackendCall, RecordingBackend};
pub use sync::FrameSync;
#[cfg(feature = "gpu")]
pub use gpu_renderer::GpuBackend;

use bytemuck::{Pod, Zeroable};
use std::fmt;
use thiserror::Error;

use crate::video::{Color, VideoError, VideoMemory, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Steps of one frame synchronization, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    Viewport,
    WindowSize,
    Palette,
    Bitmap,
    Tilemap,
    BitDepth,
    Display,
    Draw,
    Present,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Viewport => "viewport",
            SyncStage::WindowSize => "window size upload",
            SyncStage::Palette => "palette upload",
            SyncStage::Bitmap => "bitmap upload",
            SyncStage::Tilemap => "tilemap upload",
            SyncStage::BitDepth => "bit depth upload",
            SyncStage::Display => "display parameter upload",
            SyncStage::Draw => "draw",
            SyncStage::Present => "present",
        };
        f.write_str(name)
    }
}

/// Failure reported by a render backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Attach the stage that failed
    pub fn at(self, stage: SyncStage) -> VideoError {
        VideoError::BackendRejected { stage, reason: self.0 }
    }
}

/// Scroll, viewport and backdrop, laid out as the shader reads them
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DisplayParams {
    pub screen_size: [f32; 2],
    pub scroll: [u32; 2],
    pub viewport: [u32; 2],
    pub bg_color: Color,
}

impl DisplayParams {
    pub fn from_memory(memory: &VideoMemory) -> Self {
        Self {
            screen_size: [SCREEN_WIDTH as f32, SCREEN_HEIGHT as f32],
            scroll: [memory.scroll.0, memory.scroll.1],
            viewport: [memory.viewport.0, memory.viewport.1],
            bg_color: memory.bg_color,
        }
    }
}

/// Destination of a frame synchronization.
///
/// A backend keeps its own copy of whatever it was last sent. Every method
/// may refuse; the synchronizer then abandons the frame.
pub trait RenderBackend {
    fn name(&self) -> &'static str;

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), BackendError>;
    fn upload_window_size(&mut self, size: [f32; 2]) -> Result<(), BackendError>;
    fn upload_palette(&mut self, palette: &[Color]) -> Result<(), BackendError>;
    fn upload_bitmap(&mut self, words: &[u32]) -> Result<(), BackendError>;
    fn upload_tilemap(&mut self, words: &[u32]) -> Result<(), BackendError>;
    fn upload_bits_per_pixel(&mut self, bits: u32) -> Result<(), BackendError>;
    fn upload_display(&mut self, params: &DisplayParams) -> Result<(), BackendError>;

    /// Draw the full-screen quad with the uploaded state
    fn draw_quad(&mut self) -> Result<(), BackendError>;
    fn present(&mut self) -> Result<(), BackendError>;

    /// Last presented frame, for backends that can read one back
    fn frame(&self) -> Option<&Canvas> {
        None
    }
}

/// Pick the GPU backend when asked for and available, else the CPU rasterizer
pub fn select_backend(prefer_gpu: bool) -> Box<dyn RenderBackend> {
    #[cfg(feature = "gpu")]
    {
        if prefer_gpu {
            match GpuBackend::new() {
                Ok(backend) => {
                    eprintln!("✅ GPU acceleration enabled (wgpu)");
                    return Box::new(backend);
                }
                Err(e) => {
                    eprintln!("⚠️  GPU initialization failed: {}", e);
                    eprintln!("   Falling back to CPU rendering");
                }
            }
        }
    }

    #[cfg(not(feature = "gpu"))]
    {
        if prefer_gpu {
            eprintln!("⚠️  Built without GPU support, using CPU rendering");
        }
    }

    Box::new(Rasterizer::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_params_match_shader_layout() {
        // Uniform offsets 8..48 in the shader's Params block
        assert_eq!(std::mem::size_of::<DisplayParams>(), 40);
    }

    #[test]
    fn backend_error_carries_stage() {
        let err = BackendError::new("context lost").at(SyncStage::Bitmap);
        assert_eq!(err.to_string(), "render backend rejected bitmap upload: context lost");
    }
}

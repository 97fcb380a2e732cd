use super::{BackendError, DisplayParams, RenderBackend, SyncStage};
use crate::video::Color;

/// One call received by a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    SetViewport(u32, u32),
    Upload { stage: SyncStage, bytes: Vec<u8> },
    Draw,
    Present,
}

impl BackendCall {
    pub fn stage(&self) -> SyncStage {
        match self {
            BackendCall::SetViewport(..) => SyncStage::Viewport,
            BackendCall::Upload { stage, .. } => *stage,
            BackendCall::Draw => SyncStage::Draw,
            BackendCall::Present => SyncStage::Present,
        }
    }
}

/// Backend that keeps the raw bytes of every upload instead of drawing.
///
/// It can be told to refuse one stage, standing in for a lost context.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    reject: Option<SyncStage>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(stage: SyncStage) -> Self {
        Self {
            calls: Vec::new(),
            reject: Some(stage),
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Bytes of the first upload for `stage`
    pub fn payload(&self, stage: SyncStage) -> Option<&[u8]> {
        self.calls.iter().find_map(|call| match call {
            BackendCall::Upload { stage: s, bytes } if *s == stage => Some(bytes.as_slice()),
            _ => None,
        })
    }

    fn record(&mut self, call: BackendCall) -> Result<(), BackendError> {
        if self.reject == Some(call.stage()) {
            return Err(BackendError::new(format!("{} refused", call.stage())));
        }
        self.calls.push(call);
        Ok(())
    }

    fn upload(&mut self, stage: SyncStage, bytes: &[u8]) -> Result<(), BackendError> {
        self.record(BackendCall::Upload {
            stage,
            bytes: bytes.to_vec(),
        })
    }
}

impl RenderBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.record(BackendCall::SetViewport(width, height))
    }

    fn upload_window_size(&mut self, size: [f32; 2]) -> Result<(), BackendError> {
        self.upload(SyncStage::WindowSize, bytemuck::cast_slice(&size[..]))
    }

    fn upload_palette(&mut self, palette: &[Color]) -> Result<(), BackendError> {
        self.upload(SyncStage::Palette, bytemuck::cast_slice(palette))
    }

    fn upload_bitmap(&mut self, words: &[u32]) -> Result<(), BackendError> {
        self.upload(SyncStage::Bitmap, bytemuck::cast_slice(words))
    }

    fn upload_tilemap(&mut self, words: &[u32]) -> Result<(), BackendError> {
        self.upload(SyncStage::Tilemap, bytemuck::cast_slice(words))
    }

    fn upload_bits_per_pixel(&mut self, bits: u32) -> Result<(), BackendError> {
        self.upload(SyncStage::BitDepth, bytemuck::bytes_of(&bits))
    }

    fn upload_display(&mut self, params: &DisplayParams) -> Result<(), BackendError> {
        self.upload(SyncStage::Display, bytemuck::bytes_of(params))
    }

    fn draw_quad(&mut self) -> Result<(), BackendError> {
        self.record(BackendCall::Draw)
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.record(BackendCall::Present)
    }
}

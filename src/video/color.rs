use bytemuck::{Pod, Zeroable};

/// RGBA color with four normalized channels.
///
/// Channels are derived from 8-bit values divided by 256, so the brightest
/// representable channel is `255 / 256`, never `1.0`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 256.0,
            g: g as f32 / 256.0,
            b: b as f32 / 256.0,
            a: a as f32 / 256.0,
        }
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn g(&self) -> f32 {
        self.g
    }

    pub fn b(&self) -> f32 {
        self.b
    }

    pub fn a(&self) -> f32 {
        self.a
    }

    pub fn channels(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Quantize to 8-bit channels the way a unorm render target stores them
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.channels().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl From<[u8; 4]> for Color {
    fn from(rgba: [u8; 4]) -> Self {
        Self::from_bytes(rgba[0], rgba[1], rgba[2], rgba[3])
    }
}

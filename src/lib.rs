//! Video subsystem of a small retro console.
//!
//! An indexed image is packed into tile-ordered video memory at a chosen bit
//! depth, then [`renderer::FrameSync`] uploads that memory to a
//! [`renderer::RenderBackend`] once per frame.

pub mod config;
pub mod input;
pub mod renderer;
pub mod video;

// GPU backend using wgpu
// Renders the full-screen quad into an offscreen target and reads it back on present

use anyhow::{Context, Result};

use super::{BackendError, Canvas, DisplayParams, RenderBackend};
use crate::video::{Color, BITMAP_WORDS, PALETTE_SIZE, TILEMAP_WORDS};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// Byte offsets inside the shader's Params uniform block
const PARAMS_SIZE: u64 = 64;
const WINDOW_SIZE_OFFSET: u64 = 0;
const DISPLAY_OFFSET: u64 = 8;
const BITS_OFFSET: u64 = 48;

/// Headless wgpu renderer
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    params: wgpu::Buffer,
    palette: wgpu::Buffer,
    bitmap: wgpu::Buffer,
    tilemap: wgpu::Buffer,
    target: Option<Target>,
    drawn: bool,
    frame: Option<Canvas>,
}

struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
}

impl GpuBackend {
    pub fn new() -> Result<Self> {
        // Request GPU adapter
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("Failed to find GPU adapter")?;

        // Create device and queue
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("retrovid GPU Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .context("Failed to create GPU device")?;

        // Shader and pipeline; compile errors surface through the error scope
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("retrovid Video Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/video.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("retrovid Video Pipeline"),
            layout: None,
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let params = create_buffer(&device, "retrovid Params", PARAMS_SIZE, wgpu::BufferUsages::UNIFORM);
        let palette = create_buffer(
            &device,
            "retrovid Palette",
            (PALETTE_SIZE * std::mem::size_of::<Color>()) as u64,
            wgpu::BufferUsages::STORAGE,
        );
        let bitmap = create_buffer(&device, "retrovid Bitmap", (BITMAP_WORDS * 4) as u64, wgpu::BufferUsages::STORAGE);
        let tilemap = create_buffer(&device, "retrovid Tilemap", (TILEMAP_WORDS * 4) as u64, wgpu::BufferUsages::STORAGE);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("retrovid Video Bindings"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: params.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: palette.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: bitmap.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: tilemap.as_entire_binding() },
            ],
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            anyhow::bail!("Failed to build video pipeline: {}", err);
        }

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group,
            params,
            palette,
            bitmap,
            tilemap,
            target: None,
            drawn: false,
            frame: None,
        })
    }

    /// Run `work` inside a validation error scope and report what it raised
    fn scoped(&self, work: impl FnOnce()) -> Result<(), BackendError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        work();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(BackendError::new(err.to_string())),
            None => Ok(()),
        }
    }

    fn write(&self, buffer: &wgpu::Buffer, offset: u64, bytes: &[u8]) -> Result<(), BackendError> {
        let end = offset + bytes.len() as u64;
        if end > buffer.size() {
            return Err(BackendError::new(format!(
                "{} bytes at offset {} overflow a {} byte buffer",
                bytes.len(),
                offset,
                buffer.size()
            )));
        }
        self.scoped(|| self.queue.write_buffer(buffer, offset, bytes))
    }

    fn create_target(&self, width: u32, height: u32) -> Target {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("retrovid Target"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = (width * 4 + align - 1) / align * align;
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("retrovid Readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Target { texture, view, readback, width, height, padded_row }
    }
}

fn create_buffer(device: &wgpu::Device, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl RenderBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::new(format!("surface {}x{} has no area", width, height)));
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(BackendError::new(format!("surface {}x{} exceeds {} pixels", width, height, max)));
        }

        let resize = match &self.target {
            Some(target) => target.width != width || target.height != height,
            None => true,
        };
        if resize {
            self.target = Some(self.create_target(width, height));
        }
        Ok(())
    }

    fn upload_window_size(&mut self, size: [f32; 2]) -> Result<(), BackendError> {
        self.write(&self.params, WINDOW_SIZE_OFFSET, bytemuck::cast_slice(&size[..]))
    }

    fn upload_palette(&mut self, palette: &[Color]) -> Result<(), BackendError> {
        self.write(&self.palette, 0, bytemuck::cast_slice(palette))
    }

    fn upload_bitmap(&mut self, words: &[u32]) -> Result<(), BackendError> {
        self.write(&self.bitmap, 0, bytemuck::cast_slice(words))
    }

    fn upload_tilemap(&mut self, words: &[u32]) -> Result<(), BackendError> {
        self.write(&self.tilemap, 0, bytemuck::cast_slice(words))
    }

    fn upload_bits_per_pixel(&mut self, bits: u32) -> Result<(), BackendError> {
        self.write(&self.params, BITS_OFFSET, bytemuck::bytes_of(&bits))
    }

    fn upload_display(&mut self, params: &DisplayParams) -> Result<(), BackendError> {
        self.write(&self.params, DISPLAY_OFFSET, bytemuck::bytes_of(params))
    }

    fn draw_quad(&mut self) -> Result<(), BackendError> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| BackendError::new("no viewport set"))?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retrovid Frame"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("retrovid Quad"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..4, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &target.readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(target.padded_row),
                    rows_per_image: Some(target.height),
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );

        let commands = encoder.finish();
        self.scoped(|| {
            self.queue.submit(Some(commands));
        })?;
        self.drawn = true;
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        if !std::mem::take(&mut self.drawn) {
            return Err(BackendError::new("nothing drawn since the last present"));
        }
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| BackendError::new("no viewport set"))?;

        let slice = target.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BackendError::new(format!("readback failed: {}", e))),
            Err(_) => return Err(BackendError::new("readback was never mapped")),
        }

        let width = target.width as usize;
        let mut canvas = Canvas::new(width, target.height as usize);
        {
            let data = slice.get_mapped_range();
            for (y, row) in data.chunks(target.padded_row as usize).enumerate().take(canvas.height()) {
                canvas.row_mut(y).copy_from_slice(&row[..width * 4]);
            }
        }
        target.readback.unmap();

        self.frame = Some(canvas);
        Ok(())
    }

    fn frame(&self) -> Option<&Canvas> {
        self.frame.as_ref()
    }
}

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::SurfaceError;
use winit::{dpi::PhysicalSize, window::Window};

use crate::engine::frame::{DrawItem, DrawShape, Frame};
use crate::engine::resources::ImageResource;

const OVAL_SEGMENTS: usize = 48;
/// Textures not drawn for this many frames are released.
const TEXTURE_IDLE_FRAMES: u64 = 600;

struct CachedTexture {
    bind_group: wgpu::BindGroup,
    last_used: u64,
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    scale_factor: f64,
    sprite_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: wgpu::BindGroup,
    textures: HashMap<u64, CachedTexture>,
    frame_count: u64,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let scale_factor = window.scale_factor();
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .context("failed to create surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("No suitable GPU adapters found"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("frice-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to request GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no texture formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::CompositeAlphaMode::Opaque)
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("frice-sprite-shader"),
            source: wgpu::ShaderSource::Wgsl(SPRITE_SHADER.into()),
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frice-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("frice-sprite-pipeline-layout"),
            bind_group_layouts: &[&texture_layout],
            push_constant_ranges: &[],
        });

        let sprite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("frice-sprite-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[SpriteVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("frice-sprite-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = upload_texture(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            "frice-white-texture",
            1,
            1,
            &[255, 255, 255, 255],
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            scale_factor,
            sprite_pipeline,
            texture_layout,
            sampler,
            white,
            textures: HashMap::new(),
            frame_count: 0,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn render(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        self.frame_count += 1;
        for item in &frame.items {
            if let Some(image) = item.image.as_ref() {
                self.ensure_texture(image);
            }
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let logical = (
            self.size.width as f64 / self.scale_factor,
            self.size.height as f64 / self.scale_factor,
        );
        let (vertices, batches) = build_vertices(&frame.items, logical);
        let vertex_buffer = if !vertices.is_empty() {
            Some(
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("frice-sprite-vertex-buffer"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
            )
        } else {
            None
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frice-render-encoder"),
            });

        let [r, g, b, a] = frame.background.to_linear();
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frice-render-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(buffer) = vertex_buffer.as_ref() {
                render_pass.set_pipeline(&self.sprite_pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                for batch in &batches {
                    let bind_group = batch
                        .texture
                        .and_then(|id| self.textures.get(&id))
                        .map_or(&self.white, |cached| &cached.bind_group);
                    render_pass.set_bind_group(0, bind_group, &[]);
                    render_pass.draw(batch.vertices.clone(), 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.evict_idle_textures();
        Ok(())
    }

    fn ensure_texture(&mut self, image: &ImageResource) {
        let frame_count = self.frame_count;
        if let Some(cached) = self.textures.get_mut(&image.id()) {
            cached.last_used = frame_count;
            return;
        }
        tracing::debug!(id = image.id(), width = image.width(), height = image.height(), "uploading texture");
        let bind_group = upload_texture(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            "frice-image-texture",
            image.width(),
            image.height(),
            image.pixels(),
        );
        self.textures.insert(
            image.id(),
            CachedTexture {
                bind_group,
                last_used: frame_count,
            },
        );
    }

    fn evict_idle_textures(&mut self) {
        let frame_count = self.frame_count;
        self.textures
            .retain(|_, cached| frame_count - cached.last_used < TEXTURE_IDLE_FRAMES);
    }
}

#[allow(clippy::too_many_arguments)]
fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    if width > 0 && height > 0 {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
    }
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Consecutive vertices drawn with the same texture; `None` is solid fill.
#[derive(Debug, Clone, PartialEq)]
struct Batch {
    texture: Option<u64>,
    vertices: Range<u32>,
}

fn build_vertices(items: &[DrawItem], logical: (f64, f64)) -> (Vec<SpriteVertex>, Vec<Batch>) {
    let mut vertices = Vec::new();
    let mut batches: Vec<Batch> = Vec::new();
    if logical.0 <= 0.0 || logical.1 <= 0.0 {
        return (vertices, batches);
    }
    for item in items {
        let start = vertices.len() as u32;
        match item.shape {
            DrawShape::Rectangle => quad_vertices(item, logical, &mut vertices),
            DrawShape::Oval => oval_vertices(item, logical, &mut vertices),
        }
        let end = vertices.len() as u32;
        if start == end {
            continue;
        }
        let texture = item.image.as_ref().map(ImageResource::id);
        match batches.last_mut() {
            Some(last) if last.texture == texture && last.vertices.end == start => {
                last.vertices.end = end;
            }
            _ => batches.push(Batch {
                texture,
                vertices: start..end,
            }),
        }
    }
    (vertices, batches)
}

/// Maps a point given relative to the item centre, rotated, to NDC.
fn to_ndc(item: &DrawItem, logical: (f64, f64), dx: f64, dy: f64) -> [f32; 2] {
    let center = item.bounds.center();
    let (sin, cos) = item.rotate.sin_cos();
    let x = center.x + dx * cos - dy * sin;
    let y = center.y + dx * sin + dy * cos;
    [
        ((x / logical.0) * 2.0 - 1.0) as f32,
        (1.0 - (y / logical.1) * 2.0) as f32,
    ]
}

fn quad_vertices(item: &DrawItem, logical: (f64, f64), out: &mut Vec<SpriteVertex>) {
    let hw = item.bounds.width / 2.0;
    let hh = item.bounds.height / 2.0;
    let color = item.color.to_linear();
    let v0 = SpriteVertex::new(to_ndc(item, logical, -hw, -hh), [0.0, 0.0], color);
    let v1 = SpriteVertex::new(to_ndc(item, logical, hw, -hh), [1.0, 0.0], color);
    let v2 = SpriteVertex::new(to_ndc(item, logical, hw, hh), [1.0, 1.0], color);
    let v3 = SpriteVertex::new(to_ndc(item, logical, -hw, hh), [0.0, 1.0], color);

    out.extend_from_slice(&[v0, v2, v1, v0, v3, v2]);
}

fn oval_vertices(item: &DrawItem, logical: (f64, f64), out: &mut Vec<SpriteVertex>) {
    let rx = item.bounds.width / 2.0;
    let ry = item.bounds.height / 2.0;
    let color = item.color.to_linear();
    let point = |i: usize| {
        let angle = i as f64 / OVAL_SEGMENTS as f64 * std::f64::consts::TAU;
        let (sin, cos) = angle.sin_cos();
        SpriteVertex::new(
            to_ndc(item, logical, rx * cos, ry * sin),
            [0.5 + 0.5 * cos as f32, 0.5 + 0.5 * sin as f32],
            color,
        )
    };
    let center = SpriteVertex::new(to_ndc(item, logical, 0.0, 0.0), [0.5, 0.5], color);
    for i in 0..OVAL_SEGMENTS {
        out.extend_from_slice(&[center, point(i), point(i + 1)]);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SpriteVertex {
    position: [f32; 2],
    uv: [f32; 2],
    color: [f32; 4],
}

impl SpriteVertex {
    fn new(position: [f32; 2], uv: [f32; 2], color: [f32; 4]) -> Self {
        Self {
            position,
            uv,
            color,
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as u64,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as u64 * 2,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

const SPRITE_SHADER: &str = r#"
struct VsIn {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
};

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@group(0) @binding(0) var sprite_texture: texture_2d<f32>;
@group(0) @binding(1) var sprite_sampler: sampler;

@vertex
fn vs_main(input: VsIn) -> VsOut {
    var out: VsOut;
    out.position = vec4<f32>(input.position, 0.0, 1.0);
    out.uv = input.uv;
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    return textureSample(sprite_texture, sprite_sampler, input.uv) * input.color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::geom::Rect;

    fn item(shape: DrawShape, image: Option<ImageResource>) -> DrawItem {
        DrawItem {
            shape,
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
            rotate: 0.0,
            color: Color::WHITE,
            image,
        }
    }

    #[test]
    fn full_window_quad_spans_ndc() {
        let (vertices, batches) = build_vertices(&[item(DrawShape::Rectangle, None)], (100.0, 100.0));
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[0].position, [-1.0, 1.0]);
        assert_eq!(vertices[1].position, [1.0, -1.0]);
        assert_eq!(batches, [Batch { texture: None, vertices: 0..6 }]);
    }

    #[test]
    fn batches_split_on_texture_change() {
        let image = ImageResource::from_rgba(1, 1, vec![0; 4]).unwrap();
        let items = [
            item(DrawShape::Rectangle, None),
            item(DrawShape::Oval, None),
            item(DrawShape::Rectangle, Some(image.clone())),
            item(DrawShape::Rectangle, Some(image.clone())),
        ];
        let (vertices, batches) = build_vertices(&items, (200.0, 200.0));
        let oval = OVAL_SEGMENTS as u32 * 3;
        assert_eq!(vertices.len() as u32, 6 + oval + 12);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].vertices, 0..6 + oval);
        assert_eq!(batches[1].texture, Some(image.id()));
    }

    #[test]
    fn zero_sized_surface_draws_nothing() {
        let (vertices, batches) = build_vertices(&[item(DrawShape::Oval, None)], (0.0, 10.0));
        assert!(vertices.is_empty());
        assert!(batches.is_empty());
    }
}

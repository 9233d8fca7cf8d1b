use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::common::{premul_alpha_blend, QuadVertex, QUAD_INDICES, QUAD_VERTICES};
use super::ctx::{RenderCtx, RenderTarget};
use super::program::ProgramCell;
use crate::coords::Rect;
use crate::raster::Pixmap;

/// Flat uniform layout, resolution first, then the destination rect,
/// all in physical pixels.
///
///  offset  0  resolution  [f32; 4]  (res.x, res.y, 0, 0)
///  offset 16  dst         [f32; 4]  (origin.xy, size.xy)
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TexQuadUniform {
    resolution: [f32; 4],
    dst: [f32; 4],
}

struct Pipeline {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    ubo: wgpu::Buffer,
    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
}

/// Blits a CPU-rasterized premultiplied pixmap onto the target.
///
/// This is the bridge for everything the GPU has no dedicated program
/// for: text runs, CPU-filtered layers, oversize mask ops. One upload
/// per blit; callers keep blit regions as small as they can.
pub struct TexQuadProgram {
    cell: ProgramCell,
    parts: Option<Pipeline>,
}

impl Default for TexQuadProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl TexQuadProgram {
    pub fn new() -> Self {
        Self { cell: ProgramCell::new("texquad"), parts: None }
    }

    #[inline]
    pub fn cell(&self) -> &ProgramCell {
        &self.cell
    }

    pub fn load(&mut self, ctx: &RenderCtx<'_>) {
        if !self.cell.begin_load() {
            return;
        }
        let scope = ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let parts = build_pipeline(ctx);
        match pollster::block_on(scope.pop()) {
            None => {
                self.parts = Some(parts);
                self.cell.finish_load(true);
            }
            Some(err) => {
                log::warn!("texquad program validation: {err}");
                self.cell.finish_load(false);
            }
        }
    }

    /// Uploads `pixmap` and draws it into `dst` (logical px).
    pub fn paint(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        pixmap: &Pixmap,
        dst: Rect,
    ) -> bool {
        if !self.cell.is_ready() {
            return false;
        }
        let Some(parts) = self.parts.as_ref() else {
            return false;
        };
        if parts.format != ctx.surface_format {
            return false;
        }
        if pixmap.width() == 0 || pixmap.height() == 0 || dst.is_empty() {
            return true;
        }

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("vellum texquad upload"),
            size: wgpu::Extent3d {
                width: pixmap.width(),
                height: pixmap.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixmap.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * pixmap.width()),
                rows_per_image: Some(pixmap.height()),
            },
            wgpu::Extent3d {
                width: pixmap.width(),
                height: pixmap.height(),
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let scale = ctx.scale_factor.max(0.01);
        let uniform = TexQuadUniform {
            resolution: [
                (ctx.viewport.width * scale).max(1.0),
                (ctx.viewport.height * scale).max(1.0),
                0.0,
                0.0,
            ],
            dst: [
                dst.origin.x * scale,
                dst.origin.y * scale,
                dst.size.x * scale,
                dst.size.y * scale,
            ],
        };
        ctx.queue.write_buffer(&parts.ubo, 0, bytemuck::bytes_of(&uniform));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vellum texquad bind group"),
            layout: &parts.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: parts.ubo.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&parts.sampler),
                },
            ],
        });

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vellum texquad pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&parts.pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, parts.quad_vbo.slice(..));
        rpass.set_index_buffer(parts.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..1);
        true
    }
}

fn build_pipeline(ctx: &RenderCtx<'_>) -> Pipeline {
    let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vellum texquad shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/texquad.wgsl").into()),
    });

    let bind_group_layout =
        ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vellum texquad bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(
                            std::mem::size_of::<TexQuadUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

    let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vellum texquad pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vellum texquad pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[QuadVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: ctx.surface_format,
                blend: Some(premul_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("vellum texquad sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vellum texquad ubo"),
        size: std::mem::size_of::<TexQuadUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let quad_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum texquad quad vbo"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let quad_ibo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum texquad quad ibo"),
        contents: bytemuck::cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    Pipeline {
        format: ctx.surface_format,
        pipeline,
        bind_group_layout,
        sampler,
        ubo,
        quad_vbo,
        quad_ibo,
    }
}

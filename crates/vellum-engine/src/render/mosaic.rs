use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::common::{logical_clip_to_scissor, QuadVertex, QUAD_INDICES, QUAD_VERTICES};
use super::ctx::{RenderCtx, RenderTarget};
use super::program::ProgramCell;
use crate::coords::RotatedRect;

/// Flat uniform layout, resolution first, then mosaic parameters.
/// Everything is in physical pixels; the block grid is anchored at the
/// clip's AABB origin so block boundaries match the CPU downsample.
///
///  offset  0  header  [f32; 4]  (res.x, res.y, block, 0)
///  offset 16  clip    [f32; 4]  (origin.xy, size.xy, unrotated)
///  offset 32  params  [f32; 4]  (rotation, anchor.x, anchor.y, 0)
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MosaicUniform {
    header: [f32; 4],
    clip: [f32; 4],
    params: [f32; 4],
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

/// Pixelates the accumulated backdrop inside a rotated clip.
///
/// The caller copies the current target into a separate texture first
/// (a render pass cannot sample its own attachment); this pass then
/// rewrites the clipped pixels from quantized backdrop samples. Blending
/// is off: samples are already final pixel values.
pub struct MosaicProgram {
    cell: ProgramCell,
    parts: Option<Pipeline>,
}

impl Default for MosaicProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl MosaicProgram {
    pub fn new() -> Self {
        Self { cell: ProgramCell::new("mosaic"), parts: None }
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
                log::warn!("mosaic program validation: {err}");
                self.cell.finish_load(false);
            }
        }
    }

    /// Pixelates `clip` (logical px) with `block` physical pixels per
    /// cell, sampling from `backdrop`.
    pub fn paint(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        backdrop: &wgpu::TextureView,
        clip: RotatedRect,
        block: u32,
    ) -> bool {
        if !self.cell.is_ready() {
            return false;
        }
        let Some(parts) = self.parts.as_ref() else {
            return false;
        };
        if parts.format != ctx.surface_format || block == 0 || clip.is_empty() {
            return false;
        }

        let scale = ctx.scale_factor.max(0.01);
        let anchor = clip.aabb().origin;
        let uniform = MosaicUniform {
            header: [
                (ctx.viewport.width * scale).max(1.0),
                (ctx.viewport.height * scale).max(1.0),
                block as f32,
                0.0,
            ],
            clip: [
                clip.rect.origin.x * scale,
                clip.rect.origin.y * scale,
                clip.rect.size.x * scale,
                clip.rect.size.y * scale,
            ],
            params: [clip.rotation, anchor.x * scale, anchor.y * scale, 0.0],
        };
        ctx.queue.write_buffer(&parts.ubo, 0, bytemuck::bytes_of(&uniform));

        // Only fragments inside the clip AABB can change; the shader
        // still discards per fragment for rotated clips.
        let Some((sx, sy, sw, sh)) =
            logical_clip_to_scissor(Some(clip.aabb()), ctx.viewport, scale)
        else {
            return true;
        };

        // The backdrop view changes between calls, so the bind group is
        // rebuilt per paint.
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vellum mosaic bind group"),
            layout: &parts.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: parts.ubo.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(backdrop),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&parts.sampler),
                },
            ],
        });

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vellum mosaic pass"),
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
        rpass.set_scissor_rect(sx, sy, sw, sh);
        rpass.set_vertex_buffer(0, parts.quad_vbo.slice(..));
        rpass.set_index_buffer(parts.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..1);
        true
    }
}

fn build_pipeline(ctx: &RenderCtx<'_>) -> Pipeline {
    let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vellum mosaic shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mosaic.wgsl").into()),
    });

    let bind_group_layout =
        ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vellum mosaic bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(
                            std::mem::size_of::<MosaicUniform>() as u64,
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
        label: Some("vellum mosaic pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vellum mosaic pipeline"),
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
                blend: None,
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
        label: Some("vellum mosaic sampler"),
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vellum mosaic ubo"),
        size: std::mem::size_of::<MosaicUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let quad_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum mosaic quad vbo"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let quad_ibo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum mosaic quad ibo"),
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

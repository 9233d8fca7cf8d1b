use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::common::{color_array, premul_alpha_blend, QuadVertex, QUAD_INDICES, QUAD_VERTICES};
use super::ctx::{RenderCtx, RenderTarget};
use super::program::ProgramCell;
use crate::coords::RotatedRect;
use crate::dlist::MaskOp;
use vellum_model::HighlightRegion;

/// Uniform capacity for highlight holes. A mask op with more
/// viewport-intersecting holes than this falls back to the CPU route.
pub const MAX_MASK_REGIONS: usize = 16;

/// Flat uniform layout, resolution first, then the premultiplied tint,
/// then two vec4 per hole. Rects are in physical pixels.
///
///  offset  0  header  [f32; 4]  (res.x, res.y, hole_count, 0)
///  offset 16  tint    [f32; 4]
///  offset 32  holes   [[f32; 4]; 32]  pairs of
///                     (origin.xy, size.xy) and (kind, rotation, 0, 0)
///                     where kind 0 = rect, 1 = ellipse
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MaskUniform {
    header: [f32; 4],
    tint: [f32; 4],
    holes: [[f32; 4]; 2 * MAX_MASK_REGIONS],
}

struct Pipeline {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    ubo: wgpu::Buffer,
    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
}

/// Fullscreen tint with transparent cutouts, one fragment pass.
pub struct MaskProgram {
    cell: ProgramCell,
    parts: Option<Pipeline>,
}

impl Default for MaskProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskProgram {
    pub fn new() -> Self {
        Self { cell: ProgramCell::new("mask"), parts: None }
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
                log::warn!("mask program validation: {err}");
                self.cell.finish_load(false);
            }
        }
    }

    /// Paints the tint with holes cut out. Returns `false` (drawing
    /// nothing) when not ready or when the hole count exceeds the
    /// uniform capacity.
    pub fn paint(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        op: &MaskOp,
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

        // Offscreen holes cannot cut anything visible.
        let viewport_rect = ctx.viewport.rect();
        let visible: Vec<_> = op
            .holes
            .iter()
            .filter(|h| {
                RotatedRect::new(h.rect, h.rotation)
                    .aabb()
                    .intersect(viewport_rect)
                    .is_some()
            })
            .collect();
        if visible.len() > MAX_MASK_REGIONS {
            log::debug!(
                "mask op has {} visible holes (cap {}), using CPU route",
                visible.len(),
                MAX_MASK_REGIONS
            );
            return false;
        }

        let scale = ctx.scale_factor.max(0.01);
        let mut uniform = MaskUniform {
            header: [
                (ctx.viewport.width * scale).max(1.0),
                (ctx.viewport.height * scale).max(1.0),
                visible.len() as f32,
                0.0,
            ],
            tint: color_array(op.tint),
            holes: [[0.0; 4]; 2 * MAX_MASK_REGIONS],
        };
        for (i, hole) in visible.iter().enumerate() {
            let r = hole.rect;
            uniform.holes[2 * i] = [
                r.origin.x * scale,
                r.origin.y * scale,
                r.size.x * scale,
                r.size.y * scale,
            ];
            let kind = match hole.region {
                HighlightRegion::Rect => 0.0,
                HighlightRegion::Ellipse => 1.0,
            };
            uniform.holes[2 * i + 1] = [kind, hole.rotation, 0.0, 0.0];
        }
        ctx.queue.write_buffer(&parts.ubo, 0, bytemuck::bytes_of(&uniform));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vellum mask pass"),
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
        rpass.set_bind_group(0, &parts.bind_group, &[]);
        rpass.set_vertex_buffer(0, parts.quad_vbo.slice(..));
        rpass.set_index_buffer(parts.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..1);
        true
    }
}

fn build_pipeline(ctx: &RenderCtx<'_>) -> Pipeline {
    let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vellum mask shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mask.wgsl").into()),
    });

    let bind_group_layout =
        ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vellum mask bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<MaskUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

    let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vellum mask pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vellum mask pipeline"),
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

    let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vellum mask ubo"),
        size: std::mem::size_of::<MaskUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vellum mask bind group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() }],
    });

    let quad_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum mask quad vbo"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let quad_ibo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum mask quad ibo"),
        contents: bytemuck::cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    Pipeline { format: ctx.surface_format, pipeline, bind_group, ubo, quad_vbo, quad_ibo }
}

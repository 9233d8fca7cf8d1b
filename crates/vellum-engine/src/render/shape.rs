use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::common::{
    premul_alpha_blend, viewport_ubo_min_binding_size, QuadVertex, ViewportUniform, QUAD_INDICES,
    QUAD_VERTICES,
};
use super::ctx::{RenderCtx, RenderTarget};
use super::program::ProgramCell;

/// One rotated, optionally rounded rect with fill and/or stroke.
///
/// Instance data layout (64 bytes):
///
///  offset  0  origin  [f32; 2]   loc 1   (logical px)
///  offset  8  size    [f32; 2]   loc 2
///  offset 16  params  [f32; 4]   loc 3   (rotation, corner_radius, stroke_width, pad)
///  offset 32  fill    [f32; 4]   loc 4   (premultiplied)
///  offset 48  stroke  [f32; 4]   loc 5   (premultiplied)
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ShapeInstance {
    pub origin: [f32; 2],
    pub size: [f32; 2],
    pub params: [f32; 4],
    pub fill: [f32; 4],
    pub stroke: [f32; 4],
}

impl ShapeInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2, // origin
        2 => Float32x2, // size
        3 => Float32x4, // params
        4 => Float32x4, // fill
        5 => Float32x4  // stroke
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ShapeInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

struct Pipeline {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,
    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
}

/// Instanced SDF renderer for shape ops. Polylines ride on it too, as
/// oriented segment rects and joint discs.
pub struct ShapeProgram {
    cell: ProgramCell,
    parts: Option<Pipeline>,
    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl Default for ShapeProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeProgram {
    pub fn new() -> Self {
        Self {
            cell: ProgramCell::new("shape"),
            parts: None,
            instance_vbo: None,
            instance_capacity: 0,
        }
    }

    #[inline]
    pub fn cell(&self) -> &ProgramCell {
        &self.cell
    }

    /// Builds the pipeline once. Idempotent; safe to call every frame.
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
                log::warn!("shape program validation: {err}");
                self.cell.finish_load(false);
            }
        }
    }

    /// Draws `instances` in order. Returns `false` when the program is
    /// not ready (or built for another format) and nothing was drawn.
    pub fn paint(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        instances: &[ShapeInstance],
    ) -> bool {
        if !self.cell.is_ready() {
            return false;
        }
        match self.parts.as_ref() {
            Some(parts) if parts.format == ctx.surface_format => {}
            _ => return false,
        }
        if instances.is_empty() {
            return true;
        }

        // Grows the instance buffer before `parts` is borrowed for the draw.
        self.ensure_instance_capacity(ctx, instances.len());
        let Some(parts) = self.parts.as_ref() else {
            return false;
        };
        let Some(instance_vbo) = self.instance_vbo.as_ref() else {
            return false;
        };

        let w = ctx.viewport.width.max(1.0);
        let h = ctx.viewport.height.max(1.0);
        ctx.queue.write_buffer(
            &parts.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform { viewport: [w, h], _pad: [0.0; 2] }),
        );
        ctx.queue.write_buffer(instance_vbo, 0, bytemuck::cast_slice(instances));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vellum shape pass"),
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
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(parts.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..instances.len() as u32);
        true
    }

    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(64);
        let new_size = (new_cap * std::mem::size_of::<ShapeInstance>()) as u64;
        self.instance_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vellum shape instance vbo"),
            size: new_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

fn build_pipeline(ctx: &RenderCtx<'_>) -> Pipeline {
    let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vellum shape shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/shape.wgsl").into()),
    });

    let bind_group_layout =
        ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vellum shape bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(viewport_ubo_min_binding_size()),
                },
                count: None,
            }],
        });

    let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vellum shape pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vellum shape pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[QuadVertex::layout(), ShapeInstance::layout()],
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

    let viewport_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vellum shape viewport ubo"),
        size: std::mem::size_of::<ViewportUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vellum shape bind group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: viewport_ubo.as_entire_binding(),
        }],
    });

    let quad_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum shape quad vbo"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let quad_ibo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vellum shape quad ibo"),
        contents: bytemuck::cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    Pipeline {
        format: ctx.surface_format,
        pipeline,
        bind_group,
        viewport_ubo,
        quad_vbo,
        quad_ibo,
    }
}

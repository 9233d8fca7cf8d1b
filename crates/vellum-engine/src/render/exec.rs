//! Display-list execution on the GPU.
//!
//! Ops replay strictly in list order so z-order survives; consecutive
//! shape and polyline ops batch into one instanced draw (instances
//! blend in order within a draw call). Anything a program cannot take
//! this frame degrades per op: CPU rasterize, then blit.

use vellum_model::FilterKind;

use super::ctx::{RenderCtx, RenderTarget};
use super::registry::ShaderResourceRegistry;
use super::shape::ShapeInstance;
use crate::coords::{Rect, Vec2, Viewport};
use crate::dlist::{
    mosaic_block_size, DisplayList, DrawOp, FilteredLayerOp, GridOp, MaskOp, PolylineOp,
    ShapeOp, TextOp,
};
use crate::key::GpuCaps;
use crate::raster::{CpuRenderer, Pixmap};
use crate::text::FontSystem;

/// Executes display lists against the effect programs.
#[derive(Default)]
pub struct GpuRenderer {
    pub registry: ShaderResourceRegistry,
    backdrop: Option<Backdrop>,
}

struct Backdrop {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GpuRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire-and-forget program loads; call once a device exists.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>) {
        self.registry.load_all(ctx);
    }

    #[inline]
    pub fn capabilities(&self) -> GpuCaps {
        self.registry.capabilities()
    }

    /// Replays `list` onto the target in order.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        list: &DisplayList,
        fonts: &FontSystem,
    ) {
        let mut shapes: Vec<ShapeInstance> = Vec::new();
        for op in list.ops() {
            match op {
                DrawOp::Shape(op) => shapes.push(shape_instance(op)),
                DrawOp::Polyline(op) => push_polyline(&mut shapes, op),
                DrawOp::Text(op) => {
                    self.flush_shapes(ctx, target, &mut shapes);
                    self.blit_text(ctx, target, op, fonts);
                }
                DrawOp::Grid(op) => {
                    self.flush_shapes(ctx, target, &mut shapes);
                    if !self.registry.grid.paint(ctx, target, op) {
                        // Line-quad fallback through the shape program.
                        let mut lines = grid_instances(op, ctx.viewport);
                        self.flush_shapes(ctx, target, &mut lines);
                    }
                }
                DrawOp::Mask(op) => {
                    self.flush_shapes(ctx, target, &mut shapes);
                    if !self.registry.mask.paint(ctx, target, op) {
                        self.blit_cpu_mask(ctx, target, op, fonts);
                    }
                }
                DrawOp::FilteredLayer(op) => {
                    self.flush_shapes(ctx, target, &mut shapes);
                    self.filtered_layer(ctx, target, op, fonts);
                }
            }
        }
        self.flush_shapes(ctx, target, &mut shapes);
    }

    fn flush_shapes(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        shapes: &mut Vec<ShapeInstance>,
    ) {
        if shapes.is_empty() {
            return;
        }
        if !self.registry.shape.paint(ctx, target, shapes) {
            log::debug!("shape program not ready, dropping {} instances", shapes.len());
        }
        shapes.clear();
    }

    /// Text has no resident GPU path; runs rasterize on the CPU at
    /// physical scale and blit in.
    fn blit_text(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        op: &TextOp,
        fonts: &FontSystem,
    ) {
        let scale = ctx.scale_factor.max(0.01);
        let glyphs = fonts.rasterize_run(
            &op.content,
            fonts.primary(),
            op.font_size * scale,
            op.max_width.map(|w| w * scale),
        );
        if glyphs.is_empty() {
            return;
        }
        let mut w = 0.0f32;
        let mut h = 0.0f32;
        for g in &glyphs {
            w = w.max(g.x + g.width as f32);
            h = h.max(g.y + g.height as f32);
        }
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        let mut pm = Pixmap::new(w.ceil() as u32, h.ceil() as u32);
        for g in &glyphs {
            for (i, &cov) in g.coverage.iter().enumerate() {
                if cov == 0 {
                    continue;
                }
                let gx = (i % g.width) as i64;
                let gy = (i / g.width) as i64;
                pm.blend_pixel(
                    g.x as i64 + gx,
                    g.y as i64 + gy,
                    op.color.scaled_alpha(cov as f32 / 255.0),
                );
            }
        }
        let dst = Rect::from_origin_size(op.origin, Vec2::new(w / scale, h / scale));
        self.registry.texquad.paint(ctx, target, &pm, dst);
    }

    /// CPU route for masks the GPU cannot take (not ready, or more
    /// holes than the uniform holds).
    fn blit_cpu_mask(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        op: &MaskOp,
        fonts: &FontSystem,
    ) {
        let scale = ctx.scale_factor.max(0.01);
        let mut pm = Pixmap::new(
            (ctx.viewport.width * scale).ceil().max(1.0) as u32,
            (ctx.viewport.height * scale).ceil().max(1.0) as u32,
        );
        let mut sub = DisplayList::new();
        sub.push(DrawOp::Mask(op.clone()));
        CpuRenderer::new(fonts, scale).render(&sub, &mut pm);
        self.registry.texquad.paint(ctx, target, &pm, ctx.viewport.rect());
    }

    fn filtered_layer(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        op: &FilteredLayerOp,
        fonts: &FontSystem,
    ) {
        let gpu_mosaic = op.kind == FilterKind::Mosaic
            && self.registry.mosaic.cell().is_ready()
            && target.color_texture.is_some();
        if gpu_mosaic {
            // Content lands on the target first; the mosaic pass then
            // rewrites the clipped pixels from a copy of the target.
            self.render(ctx, target, &op.content, fonts);
            self.mosaic_backdrop_pass(ctx, target, op);
            return;
        }

        // Every other filter (and mosaic without a sampleable target)
        // rasterizes the whole layer on the CPU and blits the result.
        // The CPU renderer owns the filter fallback ladder.
        let scale = ctx.scale_factor.max(0.01);
        let mut pm = Pixmap::new(
            (ctx.viewport.width * scale).ceil().max(1.0) as u32,
            (ctx.viewport.height * scale).ceil().max(1.0) as u32,
        );
        let mut sub = DisplayList::new();
        sub.push(DrawOp::FilteredLayer(op.clone()));
        CpuRenderer::new(fonts, scale).render(&sub, &mut pm);
        self.registry.texquad.paint(ctx, target, &pm, ctx.viewport.rect());
    }

    fn mosaic_backdrop_pass(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        op: &FilteredLayerOp,
    ) {
        let Some(src) = target.color_texture else {
            return;
        };
        let width = src.width();
        let height = src.height();
        let stale = self
            .backdrop
            .as_ref()
            .is_none_or(|b| b.width != width || b.height != height);
        if stale {
            let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("vellum mosaic backdrop"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: src.format(),
                usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.backdrop = Some(Backdrop { texture, view, width, height });
        }
        let Some(backdrop) = self.backdrop.as_ref() else {
            return;
        };

        target.encoder.copy_texture_to_texture(
            src.as_image_copy(),
            backdrop.texture.as_image_copy(),
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );

        let scale = ctx.scale_factor.max(0.01);
        let shortest = op.clip.rect.size.x.min(op.clip.rect.size.y) * scale;
        let block = mosaic_block_size(op.strength, shortest);
        self.registry
            .mosaic
            .paint(ctx, target, &backdrop.view, op.clip, block);
    }
}

fn shape_instance(op: &ShapeOp) -> ShapeInstance {
    ShapeInstance {
        origin: [op.rect.origin.x, op.rect.origin.y],
        size: [op.rect.size.x, op.rect.size.y],
        params: [op.rotation, op.corner_radius, op.stroke_width, 0.0],
        fill: [op.fill.r, op.fill.g, op.fill.b, op.fill.a],
        stroke: [op.stroke.r, op.stroke.g, op.stroke.b, op.stroke.a],
    }
}

/// A polyline becomes oriented segment rects plus round joint discs,
/// all through the shape SDF.
fn push_polyline(out: &mut Vec<ShapeInstance>, op: &PolylineOp) {
    if op.width <= 0.0 || op.points.is_empty() {
        return;
    }
    let w = op.width;
    let color = [op.color.r, op.color.g, op.color.b, op.color.a];
    let disc = |c: Vec2| ShapeInstance {
        origin: [c.x - w * 0.5, c.y - w * 0.5],
        size: [w, w],
        params: [0.0, w * 0.5, 0.0, 0.0],
        fill: color,
        stroke: [0.0; 4],
    };

    out.push(disc(op.points[0]));
    for pair in op.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let d = b - a;
        let len = d.length();
        if len > f32::EPSILON {
            let center = (a + b) * 0.5;
            out.push(ShapeInstance {
                origin: [center.x - len * 0.5, center.y - w * 0.5],
                size: [len, w],
                params: [d.y.atan2(d.x), 0.0, 0.0, 0.0],
                fill: color,
                stroke: [0.0; 4],
            });
        }
        out.push(disc(b));
    }
}

/// Grid lines as thin shape quads, for when the grid program is not
/// ready.
fn grid_instances(op: &GridOp, viewport: Viewport) -> Vec<ShapeInstance> {
    let mut out = Vec::new();
    if op.spacing < 2.0 {
        return out;
    }
    let color = [op.color.r, op.color.g, op.color.b, op.color.a];
    let lw = op.line_width.max(0.5);
    let line = |rect: Rect| ShapeInstance {
        origin: [rect.origin.x, rect.origin.y],
        size: [rect.size.x, rect.size.y],
        params: [0.0; 4],
        fill: color,
        stroke: [0.0; 4],
    };

    let mut x = op.phase.x;
    while x < viewport.width {
        out.push(line(Rect::new(x - lw * 0.5, 0.0, lw, viewport.height)));
        x += op.spacing;
    }
    let mut y = op.phase.y;
    while y < viewport.height {
        out.push(line(Rect::new(0.0, y - lw * 0.5, viewport.width, lw)));
        y += op.spacing;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_model::Color;

    // ── instance packing ────────────────────────────────────────────

    #[test]
    fn shape_instance_packs_premul_colors() {
        let op = ShapeOp {
            rect: Rect::new(1.0, 2.0, 3.0, 4.0),
            rotation: 0.5,
            corner_radius: 2.0,
            fill: Color::from_straight(1.0, 0.0, 0.0, 0.5),
            stroke: Color::transparent(),
            stroke_width: 1.5,
        };
        let inst = shape_instance(&op);
        assert_eq!(inst.origin, [1.0, 2.0]);
        assert_eq!(inst.params, [0.5, 2.0, 1.5, 0.0]);
        // Premultiplied: r scaled by alpha.
        assert!((inst.fill[0] - 0.5).abs() < 1e-6);
        assert!((inst.fill[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn polyline_emits_segments_and_joints() {
        let op = PolylineOp {
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)],
            width: 2.0,
            color: Color::from_straight(0.0, 0.0, 0.0, 1.0),
        };
        let mut out = Vec::new();
        push_polyline(&mut out, &op);
        // 3 discs + 2 segments.
        assert_eq!(out.len(), 5);
        // Second segment is vertical: rotation ~ pi/2.
        let seg = &out[3];
        assert!((seg.params[0] - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn degenerate_polyline_emits_nothing() {
        let mut out = Vec::new();
        push_polyline(
            &mut out,
            &PolylineOp {
                points: vec![],
                width: 2.0,
                color: Color::transparent(),
            },
        );
        assert!(out.is_empty());
    }

    // ── grid fallback ───────────────────────────────────────────────

    #[test]
    fn grid_fallback_covers_viewport() {
        let op = GridOp {
            spacing: 50.0,
            phase: Vec2::new(10.0, 20.0),
            color: Color::from_straight(0.5, 0.5, 0.5, 0.2),
            line_width: 1.0,
        };
        let out = grid_instances(&op, Viewport::new(200.0, 100.0));
        // Columns at 10, 60, 110, 160; rows at 20, 70.
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn grid_fallback_skips_degenerate_spacing() {
        let op = GridOp {
            spacing: 0.5,
            phase: Vec2::zero(),
            color: Color::transparent(),
            line_width: 1.0,
        };
        assert!(grid_instances(&op, Viewport::new(100.0, 100.0)).is_empty());
    }
}

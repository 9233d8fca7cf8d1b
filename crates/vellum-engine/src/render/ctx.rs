use crate::coords::Viewport;

/// Renderer-facing context (device/queue + target format + viewport).
///
/// `viewport` is in logical pixels; `scale_factor` maps logical to
/// physical, matching the CPU rasterizer's convention.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub viewport: Viewport,
    pub scale_factor: f32,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
        scale_factor: f32,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            viewport,
            scale_factor,
        }
    }
}

/// Target for drawing (encoder + color view).
///
/// `color_texture` is the texture behind `color_view` when the caller
/// owns it. Backdrop-sampling effects need to copy out of the target;
/// without the texture (surface frames) those effects report not-ready
/// and the CPU route runs instead.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub color_texture: Option<&'a wgpu::Texture>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        color_texture: Option<&'a wgpu::Texture>,
    ) -> Self {
        Self { encoder, color_view, color_texture }
    }
}

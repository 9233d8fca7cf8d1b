//! Static pass: grid plus the committed element range below the layer
//! split.

use super::{FrameInput, Surface};
use crate::compose::{compose_grid, compose_scene, ComposeInput};
use crate::dlist::DisplayList;
use crate::key::{should_repaint, PreviewStamp, StaticPassKey};
use crate::split::compute_split;

#[derive(Default)]
pub struct StaticPass {
    last_key: Option<StaticPassKey>,
}

impl StaticPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paints the static layer if its key changed since the last paint.
    /// Returns whether anything was painted.
    pub fn paint(&mut self, input: &FrameInput<'_>, surface: &mut Surface<'_, '_>) -> bool {
        let split = compute_split(input.snapshot, input.selection, input.interaction);
        let key = StaticPassKey {
            doc_version: input.snapshot.version(),
            camera: input.camera,
            scale_factor: input.scale_factor,
            viewport: input.viewport,
            split,
            previews: PreviewStamp::of(input.overrides),
            style: input.style.clone(),
            locale: input.locale.map(str::to_owned),
            gpu_caps: input.gpu_caps,
        };
        if !should_repaint(self.last_key.as_ref(), &key) {
            return false;
        }

        let elements = input.snapshot.elements();
        let end = split.unwrap_or(elements.len());

        let mut list = DisplayList::new();
        compose_grid(&mut list, input.camera, input.style);
        list.extend(compose_scene(&ComposeInput {
            elements: &elements[..end],
            overrides: input.overrides,
            camera: input.camera,
            viewport: input.viewport,
            style: input.style,
            fonts: input.fonts,
        }));

        log::trace!("static pass repaint, {} ops below split {:?}", list.len(), split);
        surface.replay(&list, input.fonts, input.scale_factor);
        self.last_key = Some(key);
        true
    }
}

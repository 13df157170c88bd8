use crate::overlay::domain::overlay_scene::OverlayScene;
use crate::overlay::domain::overlay_surface::{OverlayStyle, OverlaySurface};
use crate::shared::face_box::FaceBox;

/// Draws an [`OverlayScene`] onto a surface.
///
/// Every call is a full redraw: the surface is cleared first, then every
/// box is stroked and, when labeled, captioned above its top edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn render(&self, scene: &OverlayScene, surface: &mut dyn OverlaySurface) {
        surface.clear(scene.width, scene.height);
        for item in &scene.items {
            surface.stroke_rect(&item.face, self.style.stroke, self.style.line_width);
            if let Some(label) = &item.label {
                let (x, y) = self.label_anchor(&item.face);
                surface.fill_text(label, x, y, self.style.label_color, self.style.label_size);
            }
        }
    }

    /// Baseline origin for a box's label: `label_offset` above the top
    /// edge, clamped to the frame top but never below the edge itself.
    pub fn label_anchor(&self, face: &FaceBox) -> (f32, f32) {
        let top = face.y as f32;
        let y = (top - self.style.label_offset).max(0.0).min(top);
        (face.x as f32, y)
    }
}

/// Uniform scale plus centering offsets that fit a frame inside widget
/// bounds without distortion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Viewport {
    pub fn fit(frame: (u32, u32), bounds: (f32, f32)) -> Self {
        let (fw, fh) = (frame.0 as f32, frame.1 as f32);
        if fw <= 0.0 || fh <= 0.0 {
            return Self {
                scale: 1.0,
                offset_x: 0.0,
                offset_y: 0.0,
            };
        }
        let scale = (bounds.0 / fw).min(bounds.1 / fh);
        Self {
            scale,
            offset_x: (bounds.0 - fw * scale) / 2.0,
            offset_y: (bounds.1 - fh * scale) / 2.0,
        }
    }

    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.offset_x + x * self.scale,
            self.offset_y + y * self.scale,
        )
    }
}

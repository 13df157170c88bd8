use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke};
use iced::{mouse, Color, Pixels, Point, Rectangle, Renderer, Size, Theme};

use facewatch_core::overlay::domain::overlay_renderer::{OverlayRenderer, Viewport};
use facewatch_core::overlay::domain::overlay_scene::OverlayScene;
use facewatch_core::overlay::domain::overlay_surface::{OverlayColor, OverlaySurface};
use facewatch_core::shared::face_box::FaceBox;

/// Canvas program that draws the current overlay scene on top of the
/// preview image, letterboxed the same way as `ContentFit::Contain`.
pub struct OverlayCanvas {
    scene: OverlayScene,
    renderer: OverlayRenderer,
}

impl OverlayCanvas {
    pub fn new(scene: OverlayScene, renderer: OverlayRenderer) -> Self {
        Self { scene, renderer }
    }
}

impl<Message> canvas::Program<Message> for OverlayCanvas {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let mut surface = CanvasSurface {
            frame: &mut frame,
            bounds: bounds.size(),
            viewport: Viewport::fit((1, 1), (bounds.width, bounds.height)),
        };
        self.renderer.render(&self.scene, &mut surface);
        vec![frame.into_geometry()]
    }
}

/// Adapts an iced canvas frame to [`OverlaySurface`].
struct CanvasSurface<'a> {
    frame: &'a mut Frame,
    bounds: Size,
    viewport: Viewport,
}

impl OverlaySurface for CanvasSurface<'_> {
    fn clear(&mut self, width: u32, height: u32) {
        // Each draw starts from an empty frame; only the mapping changes.
        self.viewport = Viewport::fit((width, height), (self.bounds.width, self.bounds.height));
    }

    fn stroke_rect(&mut self, face: &FaceBox, color: OverlayColor, line_width: f32) {
        let (top_left, size) = map_box(&self.viewport, face);
        self.frame.stroke(
            &Path::rectangle(top_left, size),
            Stroke::default()
                .with_color(to_color(color))
                .with_width(line_width),
        );
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: OverlayColor, size: f32) {
        let scaled = size * self.viewport.scale;
        let (x, baseline) = self.viewport.map(x, y);
        // Canvas text is top-aligned; shift up so (x, y) is the baseline.
        self.frame.fill_text(canvas::Text {
            content: text.to_string(),
            position: Point::new(x, baseline - scaled),
            color: to_color(color),
            size: Pixels(scaled),
            ..canvas::Text::default()
        });
    }
}

/// Frame-pixel box to widget-space top-left corner and size.
fn map_box(viewport: &Viewport, face: &FaceBox) -> (Point, Size) {
    let (x, y) = viewport.map(face.x as f32, face.y as f32);
    (
        Point::new(x, y),
        Size::new(
            face.width as f32 * viewport.scale,
            face.height as f32 * viewport.scale,
        ),
    )
}

fn to_color(color: OverlayColor) -> Color {
    Color::from_rgb8(color.r, color.g, color.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_map_box_scales_and_letterboxes() {
        // 640x480 shown in 800x800: scale 1.25, 100px bars top and bottom.
        let viewport = Viewport::fit((640, 480), (800.0, 800.0));
        let (origin, size) = map_box(&viewport, &FaceBox::new(10, 10, 50, 50));
        assert_relative_eq!(origin.x, 12.5);
        assert_relative_eq!(origin.y, 112.5);
        assert_relative_eq!(size.width, 62.5);
        assert_relative_eq!(size.height, 62.5);
    }

    #[test]
    fn test_to_color_default_stroke_is_green() {
        let c = to_color(OverlayColor::GREEN);
        assert_relative_eq!(c.r, 0.0);
        assert_relative_eq!(c.g, 1.0);
        assert_relative_eq!(c.b, 0.0);
    }
}

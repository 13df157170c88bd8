use crate::shared::face_box::FaceBox;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl OverlayColor {
    pub const GREEN: OverlayColor = OverlayColor::rgb(0x00, 0xff, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Stroke and label styling for face boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub stroke: OverlayColor,
    pub line_width: f32,
    pub label_color: OverlayColor,
    pub label_size: f32,
    /// Distance from the box's top edge to the label baseline.
    pub label_offset: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke: OverlayColor::GREEN,
            line_width: 2.0,
            label_color: OverlayColor::GREEN,
            label_size: 16.0,
            label_offset: 10.0,
        }
    }
}

/// Something boxes and labels can be drawn on, in frame pixel coordinates.
///
/// Implementations map frame coordinates to their own space (a GUI canvas
/// scales them; a recorder keeps them verbatim).
pub trait OverlaySurface {
    /// Erases everything; `width`/`height` give the frame size.
    fn clear(&mut self, width: u32, height: u32);

    fn stroke_rect(&mut self, face: &FaceBox, color: OverlayColor, line_width: f32);

    /// Draws `text` with its baseline starting at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: OverlayColor, size: f32);
}

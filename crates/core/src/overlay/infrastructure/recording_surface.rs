use crate::overlay::domain::overlay_surface::{OverlayColor, OverlaySurface};
use crate::shared::face_box::FaceBox;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear {
        width: u32,
        height: u32,
    },
    StrokeRect {
        face: FaceBox,
        color: OverlayColor,
        line_width: f32,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        color: OverlayColor,
        size: f32,
    },
}

impl std::fmt::Display for DrawCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawCommand::Clear { width, height } => write!(f, "clear {width}x{height}"),
            DrawCommand::StrokeRect { face, .. } => write!(f, "rect {face}"),
            DrawCommand::Text { text, x, y, .. } => write!(f, "label {text:?} at ({x:.0},{y:.0})"),
        }
    }
}

/// Surface that keeps the draw calls issued since the last clear.
///
/// Used headless (the CLI prints it) and in tests to assert exactly what
/// would be on screen.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn rectangles(&self) -> Vec<FaceBox> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeRect { face, .. } => Some(*face),
                _ => None,
            })
            .collect()
    }

    pub fn labels(&self) -> Vec<(String, f32, f32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, x, y, .. } => Some((text.clone(), *x, *y)),
                _ => None,
            })
            .collect()
    }
}

impl OverlaySurface for RecordingSurface {
    fn clear(&mut self, width: u32, height: u32) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear { width, height });
    }

    fn stroke_rect(&mut self, face: &FaceBox, color: OverlayColor, line_width: f32) {
        self.commands.push(DrawCommand::StrokeRect {
            face: *face,
            color,
            line_width,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: OverlayColor, size: f32) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            color,
            size,
        });
    }
}

use kurbo::Rect;

use crate::render::surface::{FillStyle, StrokeStyle, Surface};

/// One captured [`Surface`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear,
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    ClosePath,
    Stroke(StrokeStyle),
    Fill(FillStyle),
    FillRect(Rect, FillStyle),
}

/// A [`Surface`] that records draw calls instead of rasterizing them.
///
/// Used by the test suite to assert on what the curves emit, and handy for
/// headless inspection of a frame.
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

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::LineTo(x, y));
    }

    fn close_path(&mut self) {
        self.commands.push(DrawCommand::ClosePath);
    }

    fn stroke(&mut self, style: &StrokeStyle) {
        self.commands.push(DrawCommand::Stroke(*style));
    }

    fn fill(&mut self, style: &FillStyle) {
        self.commands.push(DrawCommand::Fill(style.clone()));
    }

    fn fill_rect(&mut self, rect: Rect, style: &FillStyle) {
        self.commands.push(DrawCommand::FillRect(rect, style.clone()));
    }
}

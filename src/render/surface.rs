use kurbo::Rect;

use crate::foundation::color::Rgba;

/// How a fill is composited onto existing pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompositeMode {
    /// Ordinary source-over alpha blending.
    #[default]
    SourceOver,
    /// Additive blending, for the layered spawning-style fills.
    Lighter,
}

/// Stroke parameters for an open path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba,
    pub width: f64,
}

/// Fill parameters for a closed path or rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct FillStyle {
    pub paint: Paint,
    /// Global alpha multiplier applied on top of the paint's own alpha.
    pub alpha: f64,
    pub composite: CompositeMode,
}

/// Source pixels for a fill.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    /// Gradient running left-to-right across the filled rectangle.
    LinearGradient(LinearGradient),
}

/// A left-to-right linear gradient described by offset/color stops.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    /// Stops as `(offset in [0, 1], color)`, sorted by offset.
    pub stops: Vec<(f64, Rgba)>,
}

impl LinearGradient {
    /// Straight-alpha color at normalized position `t`, interpolating
    /// between the surrounding stops.
    pub fn sample(&self, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let Some(&(first_off, first)) = self.stops.first() else {
            return Rgba::TRANSPARENT;
        };
        if t <= first_off {
            return first;
        }
        for pair in self.stops.windows(2) {
            let (o0, c0) = pair[0];
            let (o1, c1) = pair[1];
            if t <= o1 {
                let span = o1 - o0;
                let f = if span <= 0.0 { 0.0 } else { (t - o0) / span };
                let lerp_u8 = |a: u8, b: u8| -> u8 {
                    (f64::from(a) + (f64::from(b) - f64::from(a)) * f).round() as u8
                };
                return Rgba::new(
                    lerp_u8(c0.r, c1.r),
                    lerp_u8(c0.g, c1.g),
                    lerp_u8(c0.b, c1.b),
                    c0.a + (c1.a - c0.a) * f,
                );
            }
        }
        self.stops.last().map(|&(_, c)| c).unwrap_or(first)
    }
}

/// Immediate-mode 2D drawing capability the wave core draws against.
///
/// Mirrors the minimal canvas subset the animation needs: one current path
/// built from `move_to`/`line_to`/`close_path`, stroked or filled with an
/// explicit style, plus a rectangle fill and a whole-surface clear. A
/// `line_to` on an empty path starts it (canvas semantics), so callers may
/// begin a polyline without an explicit `move_to`.
pub trait Surface {
    /// Reset every pixel to transparent.
    fn clear(&mut self);

    /// Discard the current path and start a new one.
    fn begin_path(&mut self);

    fn move_to(&mut self, x: f64, y: f64);

    fn line_to(&mut self, x: f64, y: f64);

    fn close_path(&mut self);

    /// Stroke the current path. The path is kept, as on a canvas.
    fn stroke(&mut self, style: &StrokeStyle);

    /// Fill the current path.
    fn fill(&mut self, style: &FillStyle);

    /// Fill an axis-aligned rectangle.
    fn fill_rect(&mut self, rect: Rect, style: &FillStyle);
}

use std::sync::Arc;

use kurbo::{Affine, PathEl, Rect, Shape};

use crate::foundation::color::Rgba;
use crate::foundation::error::{UndulaError, UndulaResult};
use crate::render::surface::{CompositeMode, FillStyle, LinearGradient, Paint, StrokeStyle, Surface};

/// CPU raster [`Surface`] powered by `vello_cpu`.
///
/// Draw calls are queued on a `RenderContext` and rasterized into the owned
/// pixmap on [`CpuSurface::to_rgba8_premul`]; `clear` resets both, which is
/// what the engine's per-frame clear maps to.
pub struct CpuSurface {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    path: kurbo::BezPath,
}

impl CpuSurface {
    pub fn new(width: u32, height: u32) -> UndulaResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| UndulaError::render("surface width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| UndulaError::render("surface height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(UndulaError::render("surface dimensions must be non-zero"));
        }
        Ok(Self {
            width: w,
            height: h,
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
            path: kurbo::BezPath::new(),
        })
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Rasterize everything drawn since the last clear and return the frame
    /// as tightly packed premultiplied RGBA8, row-major.
    pub fn to_rgba8_premul(&mut self) -> Vec<u8> {
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        // Queued ops are now baked into the pixmap; drop them so the next
        // rasterization does not composite them a second time.
        self.ctx.reset();
        self.pixmap.data_as_u8_slice().to_vec()
    }

    fn apply_fill_state(&mut self, style: &FillStyle) -> UndulaResult<()> {
        self.ctx.set_blend_mode(blend_for(style.composite));
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        match &style.paint {
            Paint::Solid(color) => {
                self.ctx.set_paint(color_to_cpu(*color, style.alpha));
            }
            Paint::LinearGradient(gradient) => {
                let bbox = self.path.bounding_box();
                let img = gradient_image(gradient, style.alpha, bbox.width(), bbox.height())?;
                self.ctx.set_paint_transform(affine_to_cpu(Affine::translate((
                    bbox.x0, bbox.y0,
                ))));
                self.ctx.set_paint(img);
            }
        }
        Ok(())
    }
}

impl Surface for CpuSurface {
    fn clear(&mut self) {
        self.ctx.reset();
        self.path = kurbo::BezPath::new();
        self.pixmap.data_as_u8_slice_mut().fill(0);
    }

    fn begin_path(&mut self) {
        self.path = kurbo::BezPath::new();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to((x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if self.path.elements().is_empty() {
            self.path.move_to((x, y));
        } else {
            self.path.line_to((x, y));
        }
    }

    fn close_path(&mut self) {
        if !self.path.elements().is_empty() {
            self.path.close_path();
        }
    }

    fn stroke(&mut self, style: &StrokeStyle) {
        if self.path.elements().is_empty() {
            return;
        }
        self.ctx.set_blend_mode(blend_for(CompositeMode::SourceOver));
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_stroke(vello_cpu::kurbo::Stroke::new(style.width));
        self.ctx.set_paint(color_to_cpu(style.color, 1.0));
        self.ctx.stroke_path(&bezpath_to_cpu(&self.path));
    }

    fn fill(&mut self, style: &FillStyle) {
        if self.path.elements().is_empty() {
            return;
        }
        // Gradient image construction can only fail for degenerate sizes,
        // which an empty-path guard already excludes.
        if self.apply_fill_state(style).is_ok() {
            self.ctx.fill_path(&bezpath_to_cpu(&self.path));
        }
    }

    fn fill_rect(&mut self, rect: Rect, style: &FillStyle) {
        self.ctx.set_blend_mode(blend_for(style.composite));
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        match &style.paint {
            Paint::Solid(color) => {
                self.ctx.set_paint(color_to_cpu(*color, style.alpha));
            }
            Paint::LinearGradient(gradient) => {
                let Ok(img) = gradient_image(gradient, style.alpha, rect.width(), rect.height())
                else {
                    return;
                };
                self.ctx.set_paint_transform(affine_to_cpu(Affine::translate((
                    rect.x0, rect.y0,
                ))));
                self.ctx.set_paint(img);
            }
        }
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            rect.x0, rect.y0, rect.x1, rect.y1,
        ));
    }
}

fn blend_for(mode: CompositeMode) -> vello_cpu::peniko::BlendMode {
    use vello_cpu::peniko::{BlendMode, Compose, Mix};
    match mode {
        CompositeMode::SourceOver => BlendMode::default(),
        CompositeMode::Lighter => BlendMode::new(Mix::Normal, Compose::Plus),
    }
}

fn color_to_cpu(color: Rgba, extra_alpha: f64) -> vello_cpu::peniko::Color {
    let a = (color.a * extra_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    vello_cpu::peniko::Color::from_rgba8(color.r, color.g, color.b, a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Rasterize a left-to-right gradient into a premultiplied image paint.
fn gradient_image(
    gradient: &LinearGradient,
    extra_alpha: f64,
    width: f64,
    height: f64,
) -> UndulaResult<vello_cpu::Image> {
    let w = width.ceil().max(1.0) as u32;
    let h = height.ceil().max(1.0) as u32;
    let w16: u16 = w
        .try_into()
        .map_err(|_| UndulaError::render("gradient width exceeds u16"))?;
    let h16: u16 = h
        .try_into()
        .map_err(|_| UndulaError::render("gradient height exceeds u16"))?;

    let mut pixels =
        Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity((w as usize) * (h as usize));
    let mut row = Vec::with_capacity(w as usize);
    for x in 0..w {
        let t = (f64::from(x) + 0.5) / f64::from(w);
        let c = gradient.sample(t);
        let a = c.a * extra_alpha.clamp(0.0, 1.0);
        let premul = |v: u8| -> u8 { (f64::from(v) * a).round().clamp(0.0, 255.0) as u8 };
        row.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            premul(c.r),
            premul(c.g),
            premul(c.b),
            (a * 255.0).round() as u8,
        ]));
    }
    for _ in 0..h {
        pixels.extend_from_slice(&row);
    }

    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w16, h16, true);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::color::Rgb;

    #[test]
    fn rejects_degenerate_dimensions() {
        assert!(CpuSurface::new(0, 100).is_err());
        assert!(CpuSurface::new(100_000, 100).is_err());
    }

    #[test]
    fn cleared_frame_is_fully_transparent() {
        let mut surface = CpuSurface::new(8, 8).unwrap();
        surface.clear();
        let px = surface.to_rgba8_premul();
        assert_eq!(px.len(), 8 * 8 * 4);
        assert!(px.iter().all(|&b| b == 0));
    }

    #[test]
    fn stroke_leaves_visible_pixels() {
        let mut surface = CpuSurface::new(16, 16).unwrap();
        surface.clear();
        surface.begin_path();
        surface.line_to(0.0, 8.0);
        surface.line_to(16.0, 8.0);
        surface.stroke(&StrokeStyle {
            color: Rgb::WHITE.with_alpha(1.0),
            width: 2.0,
        });
        let px = surface.to_rgba8_premul();
        assert!(px.iter().any(|&b| b != 0));
    }

    #[test]
    fn clear_discards_previous_frame() {
        let mut surface = CpuSurface::new(16, 16).unwrap();
        surface.begin_path();
        surface.line_to(0.0, 8.0);
        surface.line_to(16.0, 8.0);
        surface.stroke(&StrokeStyle {
            color: Rgb::WHITE.with_alpha(1.0),
            width: 2.0,
        });
        let _ = surface.to_rgba8_premul();
        surface.clear();
        assert!(surface.to_rgba8_premul().iter().all(|&b| b == 0));
    }
}

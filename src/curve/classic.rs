use crate::curve::{CurveBundle, WaveView};
use crate::foundation::math::bell_attenuation;
use crate::render::surface::{StrokeStyle, Surface};

/// Sampling window in graph space: x runs over `[-GRAPH_X, GRAPH_X]`.
const GRAPH_X: f64 = 2.0;
/// Overall vertical scale applied to every layer.
const AMPLITUDE_FACTOR: f64 = 0.6;
/// Attenuation exponent of the edge-suppressing envelope.
const ATT_EXPONENT: i32 = 4;

/// Fixed parameters of one classic decorative layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassicDefinition {
    /// Per-layer amplitude divisor; negative values mirror the layer.
    pub attenuation: f64,
    pub line_width: f64,
    pub opacity: f64,
}

/// One of the five fixed stroked layers of the classic look.
#[derive(Clone, Copy, Debug)]
pub struct ClassicCurve {
    definition: ClassicDefinition,
}

impl ClassicCurve {
    pub fn new(definition: ClassicDefinition) -> Self {
        Self { definition }
    }

    /// The five layer definitions of the default classic look, back to
    /// front.
    pub fn default_set() -> Vec<ClassicCurve> {
        [
            ClassicDefinition {
                attenuation: -2.0,
                line_width: 1.0,
                opacity: 0.1,
            },
            ClassicDefinition {
                attenuation: -6.0,
                line_width: 1.0,
                opacity: 0.2,
            },
            ClassicDefinition {
                attenuation: 4.0,
                line_width: 1.0,
                opacity: 0.4,
            },
            ClassicDefinition {
                attenuation: 2.0,
                line_width: 1.0,
                opacity: 0.6,
            },
            ClassicDefinition {
                attenuation: 1.0,
                line_width: 1.5,
                opacity: 1.0,
            },
        ]
        .into_iter()
        .map(ClassicCurve::new)
        .collect()
    }

    /// Bell envelope suppressing the wave near the window edges.
    pub fn attenuation(x: f64) -> f64 {
        bell_attenuation(x, ATT_EXPONENT)
    }

    /// Map graph-space x in `[-2, 2]` onto `[0, width]`.
    fn x_pos(view: &WaveView, x: f64) -> f64 {
        view.width * ((x + GRAPH_X) / (2.0 * GRAPH_X))
    }

    /// Vertical offset from the center line at graph-space x.
    fn y_pos(&self, view: &WaveView, x: f64) -> f64 {
        AMPLITUDE_FACTOR
            * Self::attenuation(x)
            * view.height_max
            * view.amplitude
            * (1.0 / self.definition.attenuation)
            * (view.frequency * x - view.phase).sin()
    }
}

impl CurveBundle for ClassicCurve {
    fn draw(&mut self, view: &WaveView, surface: &mut dyn Surface) {
        surface.begin_path();
        let mut x = -GRAPH_X;
        while x <= GRAPH_X {
            surface.line_to(Self::x_pos(view, x), view.height_max + self.y_pos(view, x));
            x += view.pixel_depth;
        }
        surface.stroke(&StrokeStyle {
            color: view.color.with_alpha(self.definition.opacity),
            width: self.definition.line_width,
        });
    }
}

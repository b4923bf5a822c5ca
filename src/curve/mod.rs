pub mod classic;
pub mod spawning;

use crate::foundation::color::Rgb;
use crate::render::surface::Surface;

/// Read-only snapshot of the engine's per-frame state, handed to every curve
/// bundle. Curves never mutate global state; this is the whole seam.
#[derive(Clone, Copy, Debug)]
pub struct WaveView {
    /// Frame timestamp in milliseconds, from the scheduler.
    pub now_ms: f64,
    /// Device width in pixels.
    pub width: f64,
    /// Vertical center offset: half the device height, minus a margin.
    pub height_max: f64,
    /// Current (post-interpolation) amplitude.
    pub amplitude: f64,
    /// Current (post-interpolation) speed.
    pub speed: f64,
    /// Global phase in `[0, 2π)`.
    pub phase: f64,
    /// Angular frequency of the classic layers.
    pub frequency: f64,
    /// Horizontal sampling step in graph space.
    pub pixel_depth: f64,
    /// Base stroke color for the classic layers.
    pub color: Rgb,
}

/// One drawable curve bundle: a classic stroked layer or a spawning-style
/// group of randomized curves. The engine calls `update` then `draw` once
/// per frame, in that order.
pub trait CurveBundle {
    /// Advance per-curve lifecycle state (amplitudes, phases, respawn
    /// bookkeeping). Classic layers are stateless and keep the default
    /// no-op.
    fn update(&mut self, _view: &WaveView) {}

    /// Emit draw calls for this frame.
    fn draw(&mut self, view: &WaveView, surface: &mut dyn Surface);
}

use kurbo::Rect;

use crate::config::SpawnDefinition;
use crate::curve::{CurveBundle, WaveView};
use crate::foundation::color::Rgba;
use crate::foundation::math::{bell_attenuation, wrap_phase};
use crate::render::surface::{CompositeMode, FillStyle, LinearGradient, Paint, Surface};

/// Sampling window in graph space: x runs over `[-GRAPH_X, GRAPH_X]`.
const GRAPH_X: f64 = 25.0;
/// Overall vertical scale of the bundle.
const AMPLITUDE_FACTOR: f64 = 0.8;
/// Multiplier on the per-curve traversal speed.
const SPEED_FACTOR: f64 = 1.0;
/// Rendered extent below which the bundle counts as dead, in pixels.
const DEAD_PX: f64 = 2.0;
/// Amplitude growth/decay step per frame.
const DESPAWN_STEP: f64 = 0.02;
/// Attenuation exponent used by the spawning envelope.
const ATT_EXPONENT: i32 = 2;

const CURVE_COUNT_RANGE: std::ops::RangeInclusive<usize> = 2..=5;
const AMPLITUDE_RANGE: (f64, f64) = (0.3, 1.0);
const OFFSET_RANGE: (f64, f64) = (-3.0, 3.0);
const WIDTH_RANGE: (f64, f64) = (1.0, 3.0);
const SPEED_RANGE: (f64, f64) = (0.5, 1.0);
const DESPAWN_TIMEOUT_MS_RANGE: (f64, f64) = (500.0, 2_000.0);

/// Runtime state of one curve inside a spawning bundle. All randomized
/// fields are fixed at birth; `phase` and `amplitude` mutate per frame.
#[derive(Clone, Copy, Debug)]
struct SpawnCurve {
    phase: f64,
    amplitude: f64,
    despawn_timeout_ms: f64,
    offset: f64,
    speed: f64,
    final_amplitude: f64,
    width: f64,
    /// Direction sign: +1 or -1.
    verse: f64,
}

/// A bundle of 2-5 superimposed randomized curves rendered as one filled,
/// mirrored shape — or, for the support-line definition, a static gradient
/// bar.
///
/// Lifecycle per spawn generation: amplitudes grow toward their individual
/// targets, decay once each curve's despawn timeout elapses, and when the
/// rendered extent falls below [`DEAD_PX`] on a falling edge the whole
/// generation is discarded and re-randomized.
pub struct SpawningBundle {
    definition: SpawnDefinition,
    rng: fastrand::Rng,
    curves: Vec<SpawnCurve>,
    /// Birth timestamp of the current generation, stamped on the first
    /// update after a (re)spawn.
    spawn_at_ms: Option<f64>,
    prev_max_y: f64,
    generation: u64,
}

impl SpawningBundle {
    pub fn new(definition: SpawnDefinition, seed: u64) -> Self {
        let mut bundle = Self {
            definition,
            rng: fastrand::Rng::with_seed(seed),
            curves: Vec::new(),
            spawn_at_ms: None,
            prev_max_y: f64::NEG_INFINITY,
            generation: 0,
        };
        bundle.respawn();
        bundle
    }

    /// Bundles for the given definitions (or the default set), with one RNG
    /// stream per bundle.
    pub fn build_set(definitions: Option<Vec<SpawnDefinition>>, base_seed: u64) -> Vec<Self> {
        definitions
            .unwrap_or_else(SpawnDefinition::default_set)
            .into_iter()
            .enumerate()
            .map(|(i, def)| Self::new(def, base_seed.wrapping_add(i as u64)))
            .collect()
    }

    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    /// Number of times this bundle has (re)spawned, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Discard the whole generation and re-randomize every curve.
    fn respawn(&mut self) {
        let count = self.rng.usize(CURVE_COUNT_RANGE);
        self.curves.clear();
        for _ in 0..count {
            let curve = self.spawn_single();
            self.curves.push(curve);
        }
        self.spawn_at_ms = None;
        self.generation += 1;
        tracing::debug!(count, generation = self.generation, "bundle respawned");
    }

    fn spawn_single(&mut self) -> SpawnCurve {
        SpawnCurve {
            phase: 0.0,
            amplitude: 0.0,
            despawn_timeout_ms: self.random_range(DESPAWN_TIMEOUT_MS_RANGE),
            offset: self.random_range(OFFSET_RANGE),
            speed: self.random_range(SPEED_RANGE),
            final_amplitude: self.random_range(AMPLITUDE_RANGE),
            width: self.random_range(WIDTH_RANGE),
            verse: if self.rng.bool() { 1.0 } else { -1.0 },
        }
    }

    fn random_range(&mut self, (lo, hi): (f64, f64)) -> f64 {
        lo + self.rng.f64() * (hi - lo)
    }

    /// Spawning envelope: exponent-2 bell shared by every per-curve and
    /// outer attenuation term.
    fn attenuation(x: f64) -> f64 {
        bell_attenuation(x, ATT_EXPONENT)
    }

    /// Mean absolute contribution of all curves at graph-space x, in
    /// normalized (pre-scale) units.
    fn y_relative(&self, x: f64) -> f64 {
        let n = self.curves.len();
        debug_assert!(n >= 2, "spawn generation must keep at least two curves");
        let mut sum = 0.0;
        for (i, curve) in self.curves.iter().enumerate() {
            // Spread the curves across the window, then apply the random
            // birth offset.
            let offset_term = 4.0 * ((i as f64 / (n as f64 - 1.0)) * 2.0 - 1.0) + curve.offset;
            let s = x / curve.width - offset_term;
            sum += (curve.amplitude * (curve.verse * s - curve.phase).sin() * Self::attenuation(s))
                .abs();
        }
        sum / n as f64
    }

    /// Vertical offset from the center line at graph-space x, in pixels.
    fn y_pos(&self, view: &WaveView, x: f64) -> f64 {
        AMPLITUDE_FACTOR
            * view.height_max
            * view.amplitude
            * self.y_relative(x)
            * Self::attenuation(x / GRAPH_X * 2.0)
    }

    /// Map graph-space x in `[-25, 25]` onto `[0, width]`.
    fn x_pos(view: &WaveView, x: f64) -> f64 {
        view.width * ((x + GRAPH_X) / (2.0 * GRAPH_X))
    }

    fn draw_support_line(&self, view: &WaveView, surface: &mut dyn Surface) {
        let gradient = LinearGradient {
            stops: vec![
                (0.0, Rgba::TRANSPARENT),
                (0.1, Rgba::new(255, 255, 255, 0.5)),
                (0.8, Rgba::new(255, 255, 255, 0.5)),
                (1.0, Rgba::TRANSPARENT),
            ],
        };
        surface.fill_rect(
            Rect::new(0.0, view.height_max, view.width, view.height_max + 1.0),
            &FillStyle {
                paint: Paint::LinearGradient(gradient),
                alpha: 0.7,
                composite: CompositeMode::Lighter,
            },
        );
    }
}

impl CurveBundle for SpawningBundle {
    fn update(&mut self, view: &WaveView) {
        if self.definition.support_line {
            return;
        }
        let spawn_at = *self.spawn_at_ms.get_or_insert(view.now_ms);
        for curve in &mut self.curves {
            if view.now_ms >= spawn_at + curve.despawn_timeout_ms {
                curve.amplitude -= DESPAWN_STEP;
            } else {
                curve.amplitude += DESPAWN_STEP;
            }
            curve.amplitude = curve.amplitude.clamp(0.0, curve.final_amplitude);
            curve.phase = wrap_phase(curve.phase + view.speed * curve.speed * SPEED_FACTOR);
        }
    }

    fn draw(&mut self, view: &WaveView, surface: &mut dyn Surface) {
        if self.definition.support_line {
            self.draw_support_line(view, surface);
            return;
        }

        let fill = FillStyle {
            paint: Paint::Solid(self.definition.color.with_alpha(1.0)),
            alpha: 0.7,
            composite: CompositeMode::Lighter,
        };

        let mut max_y = f64::NEG_INFINITY;
        for sign in [1.0, -1.0] {
            surface.begin_path();
            let mut x = -GRAPH_X;
            while x <= GRAPH_X {
                let y = self.y_pos(view, x);
                surface.line_to(Self::x_pos(view, x), view.height_max - sign * y);
                max_y = max_y.max(y);
                x += view.pixel_depth;
            }
            surface.close_path();
            surface.fill(&fill);
        }

        if dead_falling_edge(self.prev_max_y, max_y) {
            self.respawn();
            // Fresh generation, fresh extent history: the quiet first frames
            // of the new curves must not re-trigger against the dying value.
            self.prev_max_y = f64::NEG_INFINITY;
        } else {
            self.prev_max_y = max_y;
        }
    }
}

/// Death detection: a falling-edge crossing of the dead-pixel threshold.
///
/// Compares only the current and previous frame's maximum rendered extent;
/// intentionally no wider hysteresis.
fn dead_falling_edge(prev_max_y: f64, max_y: f64) -> bool {
    max_y < DEAD_PX && prev_max_y > max_y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::color::Rgb;
    use crate::render::recording::{DrawCommand, RecordingSurface};

    fn wave_bundle(seed: u64) -> SpawningBundle {
        SpawningBundle::new(
            SpawnDefinition {
                color: Rgb::new(15, 82, 169),
                support_line: false,
            },
            seed,
        )
    }

    fn view_at(now_ms: f64) -> WaveView {
        WaveView {
            now_ms,
            width: 400.0,
            height_max: 94.0,
            amplitude: 1.0,
            speed: 0.2,
            phase: 0.0,
            frequency: 6.0,
            pixel_depth: 0.05,
            color: Rgb::WHITE,
        }
    }

    #[test]
    fn spawn_parameters_stay_in_their_ranges() {
        for seed in 0..64 {
            let bundle = wave_bundle(seed);
            assert!((2..=5).contains(&bundle.curve_count()));
            for curve in &bundle.curves {
                assert!(curve.amplitude == 0.0 && curve.phase == 0.0);
                assert!((0.3..=1.0).contains(&curve.final_amplitude));
                assert!((-3.0..=3.0).contains(&curve.offset));
                assert!((1.0..=3.0).contains(&curve.width));
                assert!((0.5..=1.0).contains(&curve.speed));
                assert!((500.0..=2_000.0).contains(&curve.despawn_timeout_ms));
                assert!(curve.verse == 1.0 || curve.verse == -1.0);
            }
        }
    }

    #[test]
    fn amplitudes_grow_then_decay_within_bounds() {
        let mut bundle = wave_bundle(7);
        let mut now = 0.0;

        // Growth phase: every step moves amplitudes up, clamped to final.
        for _ in 0..30 {
            bundle.update(&view_at(now));
            for curve in &bundle.curves {
                assert!(curve.amplitude >= 0.0);
                assert!(curve.amplitude <= curve.final_amplitude);
            }
            now += 16.0;
        }

        // Jump past every despawn timeout: amplitudes decay back to zero.
        now += 3_000.0;
        for _ in 0..60 {
            bundle.update(&view_at(now));
            now += 16.0;
        }
        for curve in &bundle.curves {
            assert_eq!(curve.amplitude, 0.0);
        }
    }

    #[test]
    fn phases_wrap_and_advance_with_engine_speed() {
        let mut bundle = wave_bundle(3);
        let mut now = 0.0;
        for _ in 0..10_000 {
            bundle.update(&view_at(now));
            now += 16.0;
            for curve in &bundle.curves {
                assert!((0.0..std::f64::consts::TAU).contains(&curve.phase));
            }
        }
    }

    #[test]
    fn falling_edge_fires_once_per_death_cycle() {
        // Synthetic extent sequence: alive, decaying through the threshold,
        // then rising again. Exactly one event, on the crossing frame.
        let extents = [5.0, 3.0, 1.5, 1.7, 2.5, 4.0];
        let mut prev = f64::NEG_INFINITY;
        let mut events = Vec::new();
        for (i, &e) in extents.iter().enumerate() {
            if dead_falling_edge(prev, e) {
                events.push(i);
            }
            prev = e;
        }
        assert_eq!(events, vec![2]);
    }

    #[test]
    fn first_frame_never_respawns() {
        assert!(!dead_falling_edge(f64::NEG_INFINITY, 0.0));
    }

    #[test]
    fn dead_bundle_respawns_with_fresh_generation() {
        let mut bundle = wave_bundle(11);
        let mut surface = RecordingSurface::new();
        let first_generation = bundle.generation();
        assert_eq!(first_generation, 1);

        // Let the bundle rise, then starve it far past every timeout until
        // the extent collapses and the falling edge triggers.
        let mut now = 0.0;
        for _ in 0..20 {
            bundle.update(&view_at(now));
            bundle.draw(&view_at(now), &mut surface);
            now += 16.0;
        }
        now += 10_000.0;
        let mut steps = 0;
        while bundle.generation() == first_generation {
            bundle.update(&view_at(now));
            bundle.draw(&view_at(now), &mut surface);
            now += 16.0;
            steps += 1;
            assert!(steps < 200, "bundle never respawned");
        }

        assert_eq!(bundle.generation(), first_generation + 1);
        assert!((2..=5).contains(&bundle.curve_count()));
        assert!(bundle.spawn_at_ms.is_none(), "birth restamped on next update");
        for curve in &bundle.curves {
            assert_eq!(curve.amplitude, 0.0);
        }

        // Quiet frames right after the respawn do not fire again: the
        // extent history was reset with the generation.
        for _ in 0..5 {
            bundle.update(&view_at(now));
            bundle.draw(&view_at(now), &mut surface);
            now += 16.0;
        }
        assert_eq!(bundle.generation(), first_generation + 1);
    }

    #[test]
    fn support_line_draws_a_gradient_bar() {
        let mut bundle = SpawningBundle::new(
            SpawnDefinition {
                color: Rgb::WHITE,
                support_line: true,
            },
            0,
        );
        let view = view_at(0.0);
        let mut surface = RecordingSurface::new();
        bundle.update(&view);
        bundle.draw(&view, &mut surface);

        let cmds = surface.commands();
        assert_eq!(cmds.len(), 1);
        match &cmds[0] {
            DrawCommand::FillRect(rect, style) => {
                assert_eq!(rect.y0, view.height_max);
                assert_eq!(rect.height(), 1.0);
                assert_eq!(rect.width(), view.width);
                assert_eq!(style.alpha, 0.7);
                assert_eq!(style.composite, CompositeMode::Lighter);
                assert!(matches!(style.paint, Paint::LinearGradient(_)));
            }
            other => panic!("expected gradient bar, got {other:?}"),
        }
    }

    #[test]
    fn wave_bundle_fills_two_mirrored_shapes() {
        let mut bundle = wave_bundle(5);
        let view = view_at(0.0);
        let mut surface = RecordingSurface::new();
        // A few updates so amplitudes are non-zero.
        for i in 0..5 {
            bundle.update(&view_at(f64::from(i) * 16.0));
        }
        bundle.draw(&view, &mut surface);

        let fills = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill(_)))
            .count();
        let closes = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::ClosePath))
            .count();
        assert_eq!(fills, 2);
        assert_eq!(closes, 2);
    }
}

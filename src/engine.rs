use std::cell::RefCell;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

use crate::config::{WaveConfig, WaveStyle};
use crate::curve::classic::ClassicCurve;
use crate::curve::spawning::SpawningBundle;
use crate::curve::{CurveBundle, WaveView};
use crate::foundation::error::{UndulaError, UndulaResult};
use crate::foundation::math::{lerp, wrap_phase};
use crate::render::surface::Surface;
use crate::scheduler::{FrameScheduler, default_scheduler};

/// Vertical margin kept clear above and below the waveform, in device
/// pixels.
const HEIGHT_MARGIN_PX: f64 = 6.0;

/// Mutable animation state behind the engine facade.
struct EngineCore {
    config: WaveConfig,
    width: f64,
    height_max: f64,
    phase: f64,
    speed: f64,
    amplitude: f64,
    target_speed: Option<f64>,
    target_amplitude: Option<f64>,
    run: bool,
    curves: Vec<Box<dyn CurveBundle>>,
}

impl EngineCore {
    /// One interpolation step toward the target, dropping the target once
    /// the value lands on it exactly.
    fn interpolate(current: &mut f64, target: &mut Option<f64>, t: f64) {
        if let Some(goal) = *target {
            *current = lerp(*current, goal, t);
            if *current == goal {
                *target = None;
            }
        }
    }

    fn view(&self, now_ms: f64) -> WaveView {
        WaveView {
            now_ms,
            width: self.width,
            height_max: self.height_max,
            amplitude: self.amplitude,
            speed: self.speed,
            phase: self.phase,
            frequency: self.config.frequency,
            pixel_depth: self.config.pixel_depth,
            color: self.config.color,
        }
    }

    /// Run one frame cycle: clear, interpolate, update and draw every curve,
    /// then advance the global phase.
    fn frame(&mut self, now_ms: f64, surface: &mut dyn Surface) {
        surface.clear();
        let t = self.config.lerp_speed;
        Self::interpolate(&mut self.amplitude, &mut self.target_amplitude, t);
        Self::interpolate(&mut self.speed, &mut self.target_speed, t);

        let view = self.view(now_ms);
        for curve in &mut self.curves {
            curve.update(&view);
            curve.draw(&view, surface);
        }

        self.phase = wrap_phase(self.phase + FRAC_PI_2 * self.speed);
    }
}

/// The animated waveform: owns the animation state, draws onto a shared
/// [`Surface`], and keeps itself scheduled on a [`FrameScheduler`] while
/// running.
///
/// The engine is single-threaded by construction; the surface is shared
/// through `Rc<RefCell<..>>` so the embedder keeps access to the pixels (or
/// recorded commands) between frames.
pub struct WaveEngine {
    core: Rc<RefCell<EngineCore>>,
    scheduler: Rc<dyn FrameScheduler>,
    surface: Rc<RefCell<dyn Surface>>,
}

impl WaveEngine {
    /// Build an engine on the default software scheduler.
    pub fn new(config: WaveConfig, surface: Rc<RefCell<dyn Surface>>) -> UndulaResult<Self> {
        Self::with_scheduler(config, surface, Rc::new(default_scheduler()))
    }

    /// Build an engine on an explicit scheduler (tests drive a manual one).
    #[tracing::instrument(skip_all, fields(style = ?config.style))]
    pub fn with_scheduler(
        config: WaveConfig,
        surface: Rc<RefCell<dyn Surface>>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> UndulaResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
        let curves: Vec<Box<dyn CurveBundle>> = match config.style {
            WaveStyle::Classic => ClassicCurve::default_set()
                .into_iter()
                .map(|c| Box::new(c) as Box<dyn CurveBundle>)
                .collect(),
            WaveStyle::Spawning => {
                SpawningBundle::build_set(config.spawn_definitions.clone(), seed)
                    .into_iter()
                    .map(|b| Box::new(b) as Box<dyn CurveBundle>)
                    .collect()
            }
        };
        tracing::debug!(style = ?config.style, seed, "wave engine constructed");

        let autostart = config.autostart;
        let core = EngineCore {
            width: config.device_width(),
            height_max: config.device_height() / 2.0 - HEIGHT_MARGIN_PX,
            phase: 0.0,
            speed: config.speed,
            amplitude: config.amplitude,
            target_speed: None,
            target_amplitude: None,
            run: false,
            curves,
            config,
        };
        let engine = Self {
            core: Rc::new(RefCell::new(core)),
            scheduler,
            surface,
        };
        if autostart {
            engine.start();
        }
        Ok(engine)
    }

    /// Start the frame loop. Starting an already-running engine is a no-op,
    /// so the loop can never be scheduled twice.
    pub fn start(&self) {
        {
            let mut core = self.core.borrow_mut();
            if core.run {
                return;
            }
            core.phase = 0.0;
            core.run = true;
        }
        tracing::debug!("wave engine started");
        schedule_cycle(&self.core, &self.scheduler, &self.surface);
    }

    /// Stop the frame loop cooperatively: the flag is cleared now and any
    /// already-scheduled callback sees it and winds down without drawing.
    pub fn stop(&self) {
        let mut core = self.core.borrow_mut();
        core.phase = 0.0;
        core.run = false;
        tracing::debug!("wave engine stopped");
    }

    /// Set a new speed target; the animation eases toward it over the
    /// following frames.
    pub fn set_speed(&self, speed: f64) -> UndulaResult<()> {
        if !speed.is_finite() {
            return Err(UndulaError::config(format!(
                "speed must be finite, got {speed}"
            )));
        }
        self.core.borrow_mut().target_speed = Some(speed);
        Ok(())
    }

    /// Set a new amplitude target in `[0, 1]`; out-of-range values are
    /// clamped.
    pub fn set_amplitude(&self, amplitude: f64) -> UndulaResult<()> {
        if !amplitude.is_finite() {
            return Err(UndulaError::config(format!(
                "amplitude must be finite, got {amplitude}"
            )));
        }
        self.core.borrow_mut().target_amplitude = Some(amplitude.clamp(0.0, 1.0));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.core.borrow().run
    }

    /// Global phase in `[0, 2π)`.
    pub fn phase(&self) -> f64 {
        self.core.borrow().phase
    }

    pub fn speed(&self) -> f64 {
        self.core.borrow().speed
    }

    pub fn amplitude(&self) -> f64 {
        self.core.borrow().amplitude
    }

    /// Device width of the drawing area in pixels.
    pub fn width(&self) -> f64 {
        self.core.borrow().width
    }

    /// Center-line offset: half the device height minus the margin.
    pub fn height_max(&self) -> f64 {
        self.core.borrow().height_max
    }
}

/// Schedule the next frame cycle. The callback re-schedules itself for as
/// long as the run flag stays set.
fn schedule_cycle(
    core: &Rc<RefCell<EngineCore>>,
    scheduler: &Rc<dyn FrameScheduler>,
    surface: &Rc<RefCell<dyn Surface>>,
) {
    let core = Rc::clone(core);
    let scheduler_for_cb = Rc::clone(scheduler);
    let surface = Rc::clone(surface);
    scheduler.schedule(Box::new(move |now_ms| {
        if !core.borrow().run {
            return;
        }
        core.borrow_mut().frame(now_ms, &mut *surface.borrow_mut());
        if core.borrow().run {
            schedule_cycle(&core, &scheduler_for_cb, &surface);
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::render::recording::RecordingSurface;
    use crate::scheduler::{FRAME_INTERVAL_MS, SoftwareScheduler};

    struct Rig {
        engine: WaveEngine,
        scheduler: Rc<SoftwareScheduler>,
        clock: ManualClock,
        surface: Rc<RefCell<RecordingSurface>>,
    }

    fn rig(config: WaveConfig) -> Rig {
        let clock = ManualClock::new();
        let scheduler = Rc::new(SoftwareScheduler::with_clock(Box::new(clock.clone())));
        let surface = Rc::new(RefCell::new(RecordingSurface::new()));
        let engine = WaveEngine::with_scheduler(
            config,
            Rc::clone(&surface) as Rc<RefCell<dyn Surface>>,
            Rc::clone(&scheduler) as Rc<dyn FrameScheduler>,
        )
        .unwrap();
        Rig {
            engine,
            scheduler,
            clock,
            surface,
        }
    }

    fn pump(r: &Rig, frames: usize) {
        for _ in 0..frames {
            if let Some(deadline) = r.scheduler.deadline_ms() {
                r.clock.set_ms(deadline);
            }
            r.scheduler.flush();
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let clock = ManualClock::new();
        let scheduler = Rc::new(SoftwareScheduler::with_clock(Box::new(clock)));
        let surface = Rc::new(RefCell::new(RecordingSurface::new()));
        let err = WaveEngine::with_scheduler(
            WaveConfig::new(0.0, 100.0),
            surface as Rc<RefCell<dyn Surface>>,
            scheduler as Rc<dyn FrameScheduler>,
        );
        assert!(err.is_err());
    }

    #[test]
    fn phase_advances_by_half_pi_times_speed_per_frame() {
        let r = rig(WaveConfig::new(320.0, 100.0));
        r.engine.start();
        pump(&r, 10);
        // 10 frames at speed 0.2: 10 * pi/2 * 0.2 == pi.
        assert!((r.engine.phase() - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn start_is_idempotent() {
        let r = rig(WaveConfig::new(320.0, 100.0));
        r.engine.start();
        r.engine.start();
        assert_eq!(r.scheduler.pending(), 1);
        pump(&r, 1);
        assert_eq!(r.scheduler.pending(), 1);
    }

    #[test]
    fn stop_resets_phase_and_ends_the_loop() {
        let r = rig(WaveConfig::new(320.0, 100.0));
        r.engine.start();
        pump(&r, 3);
        assert!(r.engine.phase() > 0.0);

        r.engine.stop();
        assert!(!r.engine.is_running());
        assert_eq!(r.engine.phase(), 0.0);

        // The already-queued callback sees the cleared flag and winds down.
        let drawn_before = r.surface.borrow().commands().len();
        pump(&r, 1);
        assert_eq!(r.surface.borrow().commands().len(), drawn_before);
        assert_eq!(r.scheduler.pending(), 0);
    }

    #[test]
    fn amplitude_eases_toward_its_target() {
        let r = rig(WaveConfig::new(320.0, 100.0));
        r.engine.start();
        r.engine.set_amplitude(0.0).unwrap();
        pump(&r, 1);
        assert!((r.engine.amplitude() - 0.9).abs() < 1e-12);

        // Each further frame covers a tenth of what remains, never
        // overshooting.
        let mut prev = r.engine.amplitude();
        for _ in 0..50 {
            pump(&r, 1);
            let a = r.engine.amplitude();
            assert!(a <= prev && a >= 0.0);
            prev = a;
        }
    }

    #[test]
    fn speed_target_is_dropped_on_arrival() {
        let r = rig(WaveConfig::new(320.0, 100.0));
        r.engine.start();
        r.engine.set_speed(0.2).unwrap(); // already there
        pump(&r, 1);
        assert_eq!(r.engine.speed(), 0.2);
        assert!(r.engine.core.borrow().target_speed.is_none());
    }

    #[test]
    fn setters_reject_non_finite_values() {
        let r = rig(WaveConfig::new(320.0, 100.0));
        assert!(r.engine.set_speed(f64::NAN).is_err());
        assert!(r.engine.set_amplitude(f64::INFINITY).is_err());
        // Out-of-range amplitude clamps instead of erroring.
        r.engine.set_amplitude(7.0).unwrap();
        r.engine.start();
        pump(&r, 500);
        assert!(r.engine.amplitude() <= 1.0);
    }

    #[test]
    fn autostart_schedules_the_first_frame() {
        let clock = ManualClock::new();
        let scheduler = Rc::new(SoftwareScheduler::with_clock(Box::new(clock.clone())));
        let surface = Rc::new(RefCell::new(RecordingSurface::new()));
        let engine = WaveEngine::with_scheduler(
            WaveConfig::new(320.0, 100.0).with_autostart(true),
            Rc::clone(&surface) as Rc<RefCell<dyn Surface>>,
            Rc::clone(&scheduler) as Rc<dyn FrameScheduler>,
        )
        .unwrap();
        assert!(engine.is_running());
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn frame_timestamps_follow_the_scheduler_cadence() {
        let r = rig(WaveConfig::new(320.0, 100.0).with_seed(1));
        r.engine.start();
        let first = r.scheduler.deadline_ms().unwrap();
        pump(&r, 2);
        let third = r.scheduler.deadline_ms().unwrap();
        assert!((third - first - 2.0 * FRAME_INTERVAL_MS).abs() < 1e-9);
    }

    #[test]
    fn each_frame_clears_before_drawing() {
        let r = rig(WaveConfig::new(320.0, 100.0));
        r.engine.start();
        pump(&r, 2);
        let commands = r.surface.borrow_mut().take_commands();
        let clears: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                matches!(c, crate::render::recording::DrawCommand::Clear).then_some(i)
            })
            .collect();
        assert_eq!(clears.len(), 2);
        assert_eq!(clears[0], 0);
        // Five classic layers, each one stroke per frame.
        let strokes = commands
            .iter()
            .filter(|c| matches!(c, crate::render::recording::DrawCommand::Stroke(_)))
            .count();
        assert_eq!(strokes, 10);
    }
}

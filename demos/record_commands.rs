use std::cell::RefCell;
use std::rc::Rc;

use undula::clock::ManualClock;
use undula::render::recording::DrawCommand;
use undula::{
    FrameScheduler, RecordingSurface, SoftwareScheduler, Surface, WaveConfig, WaveEngine,
    WaveStyle,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let clock = ManualClock::new();
    let scheduler = Rc::new(SoftwareScheduler::with_clock(Box::new(clock.clone())));
    let surface = Rc::new(RefCell::new(RecordingSurface::new()));

    let config = WaveConfig::new(320.0, 100.0)
        .with_style(WaveStyle::Spawning)
        .with_seed(7);
    let engine = WaveEngine::with_scheduler(
        config,
        Rc::clone(&surface) as Rc<RefCell<dyn Surface>>,
        Rc::clone(&scheduler) as Rc<dyn FrameScheduler>,
    )?;

    engine.start();
    for frame in 0..3 {
        if let Some(deadline) = scheduler.deadline_ms() {
            clock.set_ms(deadline);
        }
        scheduler.flush();

        let commands = surface.borrow_mut().take_commands();
        let points = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::LineTo(..) | DrawCommand::MoveTo(..)))
            .count();
        let fills = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill(_) | DrawCommand::FillRect(..)))
            .count();
        println!(
            "frame {frame}: phase={:.4} amplitude={:.2} commands={} (path points={points}, fills={fills})",
            engine.phase(),
            engine.amplitude(),
            commands.len(),
        );
    }
    engine.stop();
    Ok(())
}

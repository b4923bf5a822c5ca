use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use undula::clock::ManualClock;
use undula::{
    CpuSurface, FrameScheduler, SoftwareScheduler, Surface, WaveConfig, WaveEngine, WaveStyle,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 200;

fn parse_args() -> anyhow::Result<(WaveStyle, usize, PathBuf)> {
    let mut args = std::env::args().skip(1);
    let style = match args.next().as_deref() {
        Some("classic") | None => WaveStyle::Classic,
        Some("spawning") => WaveStyle::Spawning,
        Some(other) => anyhow::bail!("unknown style '{other}', expected classic or spawning"),
    };
    let frames: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 30,
    };
    let out = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("wave.png"));
    Ok((style, frames, out))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let (style, frames, out) = parse_args()?;

    let clock = ManualClock::new();
    let scheduler = Rc::new(SoftwareScheduler::with_clock(Box::new(clock.clone())));
    let surface = Rc::new(RefCell::new(CpuSurface::new(WIDTH, HEIGHT)?));

    let config = WaveConfig::new(f64::from(WIDTH), f64::from(HEIGHT))
        .with_style(style)
        .with_seed(42);
    let engine = WaveEngine::with_scheduler(
        config,
        Rc::clone(&surface) as Rc<RefCell<dyn Surface>>,
        Rc::clone(&scheduler) as Rc<dyn FrameScheduler>,
    )?;

    engine.start();
    for _ in 0..frames {
        if let Some(deadline) = scheduler.deadline_ms() {
            clock.set_ms(deadline);
        }
        scheduler.flush();
    }
    engine.stop();

    // Premultiplied pixels over a black background reduce to the color
    // channels as-is.
    let premul = surface.borrow_mut().to_rgba8_premul();
    let mut rgb = Vec::with_capacity((WIDTH * HEIGHT * 3) as usize);
    for px in premul.chunks_exact(4) {
        rgb.extend_from_slice(&px[0..3]);
    }
    let img = image::RgbImage::from_raw(WIDTH, HEIGHT, rgb)
        .ok_or_else(|| anyhow::anyhow!("pixel buffer size mismatch"))?;
    img.save(&out)?;
    println!("wrote {} after {frames} frames ({style:?})", out.display());
    Ok(())
}

//! Headless demo: a scripted hand drives the field through its modes while
//! the scene ticks at 60 Hz, logging progress.
//!
//! ```text
//! RUST_LOG=info cargo run --bin morphfield-demo -- 900
//! ```

use morphfield::prelude::*;
use morphfield::{Regime, TickReport};
use std::thread;
use std::time::Duration;

const DEFAULT_FRAMES: u64 = 600;
const FRAME_TIME: Duration = Duration::from_micros(16_667);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let frames = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(n) => n,
            Err(e) => {
                log::error!("Invalid frame count '{}': {}", arg, e);
                std::process::exit(2);
            }
        },
        None => DEFAULT_FRAMES,
    };

    if let Err(e) = run(frames) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(frames: u64) -> Result<(), ConfigError> {
    let config = KernelConfig::default().with_particle_count(1500).with_cube_fraction(0.1);
    let debounce = config.debounce();

    let (tx, rx) = gesture_latch();
    let mut scene = Scene::new(config)?.with_receiver(rx);
    let mut buffer = InstanceBuffer::new(scene.field().len());

    // Camera at ~30 fps: open hand, fist, hand leaves, repeat.
    let hand = SimulatedHand::new(
        vec![PoseStep::open(30), PoseStep::fist(90), PoseStep::absent(30)],
        Duration::from_millis(33),
    )
    .looping();
    let capture = spawn_capture(hand, debounce, tx);

    let mut clock = FrameClock::new(scene.config().max_dt);
    clock.set_fixed_delta(Some(FRAME_TIME.as_secs_f32()));

    let mut corrections = 0;
    for _ in 0..frames {
        let frame = clock.update();
        let report = scene.tick(frame.elapsed, frame.delta, &mut buffer);
        corrections += report.safety.total();

        if report.mode_changed || scene.frame() % 60 == 0 {
            log_progress(&scene, &report);
        }
        thread::sleep(FRAME_TIME);
    }

    capture.stop();
    log::info!(
        "Ran {} frames, {} safety corrections, status '{}'",
        scene.frame(),
        corrections,
        scene.status()
    );
    Ok(())
}

fn log_progress(scene: &Scene, report: &TickReport) {
    let particles = scene.field().particles();
    let spread = particles
        .iter()
        .map(|p| {
            let target = match report.regime {
                Regime::Explode => p.explode_target(),
                Regime::Tree => p.tree_target(),
            };
            p.position.distance(target)
        })
        .sum::<f32>()
        / particles.len() as f32;

    log::info!(
        "frame {:>5} | {:<7} | mean distance to target {:.3} | star {} | {}",
        scene.frame(),
        report.mode.to_string(),
        spread,
        if scene.cues().star_visible { "on" } else { "off" },
        scene.status()
    );
}

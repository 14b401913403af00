//! End-to-end properties of the particle kernel.
//!
//! These drive the public API the way a host would: build a field or scene,
//! switch modes, and tick with assorted frame deltas.

use glam::Vec3;
use morphfield::integrator::{explode_step, jitter_for, safety_net, tree_step};
use morphfield::{
    AttractionModel, ConfigError, Correction, GestureClassifier, InstanceBuffer, Integrator, KernelConfig, Mode,
    ModeController, ParticleField, RawGesture, Regime, SafetyReport, Scene, TreeShape,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

fn scene(config: KernelConfig) -> (Scene, InstanceBuffer) {
    let scene = Scene::new(config).unwrap();
    let buffer = InstanceBuffer::new(scene.field().len());
    (scene, buffer)
}

fn still_tree_config(count: usize) -> KernelConfig {
    KernelConfig::default()
        .with_particle_count(count)
        .with_jitter(0.0, 0.0)
        .with_attraction_model(AttractionModel::FixedStep { fraction: 0.05 })
}

// ============================================================================
// Numerical stability
// ============================================================================

#[test]
fn test_positions_stay_finite_under_hostile_timing() {
    let (mut scene, mut buffer) = scene(KernelConfig::default().with_particle_count(100));
    let mut rng = SmallRng::seed_from_u64(7);
    let modes = [Mode::Open, Mode::Tree, Mode::Explode, Mode::Idle];
    let mut t = 0.0;

    for frame in 0..10_000 {
        if frame % 97 == 0 {
            scene.set_mode(modes[rng.gen_range(0..modes.len())]);
        }
        let dt = match rng.gen_range(0..20) {
            0 => rng.gen_range(0.5..5.0),
            1 => 0.0,
            _ => rng.gen_range(0.001..0.05),
        };
        t += dt;
        scene.tick(t, dt, &mut buffer);

        for p in scene.field().particles() {
            assert!(p.position.is_finite(), "frame {} produced {:?}", frame, p.position);
            assert!(p.position.length_squared() <= scene.config().divergence_bound);
        }
    }
    assert!(buffer.transforms().iter().all(|t| t.translation().is_finite()));
}

#[test]
fn test_nan_delta_is_harmless() {
    let (mut scene, mut buffer) = scene(KernelConfig::default().with_particle_count(50));
    let report = scene.tick(0.0, f32::NAN, &mut buffer);
    assert_eq!(report.dt, 0.0);
    assert!(scene.field().particles().iter().all(|p| p.position.is_finite()));
}

// ============================================================================
// Tree attraction
// ============================================================================

#[test]
fn test_tree_attraction_contracts_and_converges() {
    let (mut scene, mut buffer) = scene(still_tree_config(300));
    scene.set_mode(Mode::Tree);

    let distances = |scene: &Scene| -> Vec<f32> {
        scene
            .field()
            .particles()
            .iter()
            .map(|p| p.position.distance(p.tree_target()))
            .collect()
    };

    let mut previous = distances(&scene);
    for frame in 0..200 {
        let report = scene.tick(frame as f32 / 60.0, 1.0 / 60.0, &mut buffer);
        assert_eq!(report.regime, Regime::Tree);
        let current = distances(&scene);
        for (now, before) in current.iter().zip(&previous) {
            assert!(*now <= *before + 1e-5, "distance grew from {} to {}", before, now);
        }
        previous = current;
    }

    let worst = previous.iter().cloned().fold(0.0, f32::max);
    assert!(worst < 1e-2, "furthest particle still {} away", worst);
}

#[test]
fn test_tree_beyond_divergence_bound_is_rejected() {
    let config = still_tree_config(100).with_tree(TreeShape::LayeredCone {
        levels: 15,
        height: 200.0,
        base_radius: 2.8,
        layer_jitter: 0.3,
    });
    assert!(matches!(Scene::new(config), Err(ConfigError::OutOfRange { .. })));
}

// ============================================================================
// Explode physics
// ============================================================================

#[test]
fn test_speed_clamp_holds_every_step() {
    let config = KernelConfig::default()
        .with_particle_count(200)
        .with_explode_forces(5.0, 4.0)
        .with_impulse(3.0);
    let max_speed = config.max_speed;
    let (mut scene, mut buffer) = scene(config);

    for frame in 0..600 {
        match frame % 150 {
            0 => scene.set_mode(Mode::Tree),
            60 => scene.set_mode(Mode::Open),
            _ => false,
        };
        let report = scene.tick(frame as f32 * 0.016, 0.1, &mut buffer);
        if report.regime == Regime::Explode {
            for p in scene.field().particles() {
                assert!(
                    p.velocity.length() <= max_speed + 1e-4,
                    "speed {} over clamp",
                    p.velocity.length()
                );
            }
        }
    }
}

#[test]
fn test_impulse_fires_once_per_entry_edge() {
    let config = KernelConfig::default().with_particle_count(100);
    let mut field = ParticleField::new(&config).unwrap();
    let mut integrator = Integrator::new(&config);
    let mut modes = ModeController::starting_in(Mode::Tree);

    for _ in 0..10 {
        integrator.step(&mut field, &modes, 0.016);
        modes.resync();
    }

    assert!(modes.apply(Mode::Open));
    let first = integrator.step(&mut field, &modes, 0.016);
    modes.resync();
    assert!(first.impulse_applied);

    for _ in 0..20 {
        // Repeated confirmations of the same gesture are not new edges.
        assert!(!modes.apply(Mode::Open));
        let report = integrator.step(&mut field, &modes, 0.016);
        modes.resync();
        assert!(!report.impulse_applied);
    }

    assert!(modes.apply(Mode::Tree));
    assert!(!integrator.step(&mut field, &modes, 0.016).impulse_applied);
    modes.resync();
    assert!(modes.apply(Mode::Open));
    assert!(integrator.step(&mut field, &modes, 0.016).impulse_applied);
}

#[test]
fn test_impulse_pushes_outward() {
    let config = KernelConfig::default().with_particle_count(50).with_explode_forces(0.0, 0.0);
    let mut field = ParticleField::new(&config).unwrap();
    let before: Vec<Vec3> = field.particles().iter().map(|p| p.position).collect();

    let mut integrator = Integrator::new(&config);
    let mut modes = ModeController::starting_in(Mode::Tree);
    modes.apply(Mode::Open);
    integrator.step(&mut field, &modes, 0.016);

    for (p, start) in field.particles().iter().zip(&before) {
        assert!(p.position.length() > start.length());
    }
}

// ============================================================================
// Safety net
// ============================================================================

#[test]
fn test_diverged_particle_returns_to_nebula_target() {
    for mode in [Mode::Explode, Mode::Tree] {
        let config = KernelConfig::default().with_particle_count(10);
        let mut field = ParticleField::new(&config).unwrap();
        let mut integrator = Integrator::new(&config);
        let modes = ModeController::starting_in(mode);

        field.particles_mut()[4].position = Vec3::new(1000.0, 1000.0, 1000.0);
        let report = integrator.step(&mut field, &modes, 0.016);

        let p = &field.particles()[4];
        assert_eq!(p.position, p.explode_target());
        assert_eq!(p.velocity, Vec3::ZERO);
        assert_eq!(report.safety.diverged, 1);
    }
}

#[test]
fn test_non_finite_particle_resets_to_origin() {
    let config = KernelConfig::default().with_particle_count(10);
    let mut field = ParticleField::new(&config).unwrap();
    let mut integrator = Integrator::new(&config);
    let modes = ModeController::new();

    field.particles_mut()[2].velocity = Vec3::new(f32::NAN, 0.0, 0.0);
    field.particles_mut()[7].position = Vec3::splat(f32::INFINITY);
    let report = integrator.step(&mut field, &modes, 0.016);

    for i in [2, 7] {
        let p = &field.particles()[i];
        assert_eq!(p.position, Vec3::ZERO);
        assert_eq!(p.velocity, Vec3::ZERO);
    }
    assert_eq!(report.safety.non_finite, 2);
}

// ============================================================================
// Debounce
// ============================================================================

#[test]
fn test_flicker_is_suppressed_until_steady() {
    let mut classifier = GestureClassifier::new(Duration::from_millis(300));
    let mut modes = ModeController::new();
    let t0 = Instant::now();
    let at = |ms: u64| t0 + Duration::from_millis(ms);

    // Alternate every frame for 299 ms.
    let mut ms = 0;
    let mut flip = false;
    while ms < 299 {
        let raw = if flip { RawGesture::Open } else { RawGesture::Fist };
        assert_eq!(classifier.observe_raw(raw, at(ms)), None);
        flip = !flip;
        ms += 13;
    }

    // Then hold the next reading in the sequence, so the steady run starts
    // on a change.
    let steady = if flip { RawGesture::Open } else { RawGesture::Fist };
    let expected = steady.mode();
    let steady_from = ms;
    let mut emissions = 0;
    while ms < steady_from + 600 {
        if let Some(emission) = classifier.observe_raw(steady, at(ms)) {
            assert!(ms - steady_from >= 300);
            assert_eq!(Some(emission.mode), expected);
            if modes.apply(emission.mode) {
                emissions += 1;
            }
        }
        ms += 13;
    }

    assert_eq!(emissions, 1);
    assert_eq!(Some(modes.current()), expected);
}

#[test]
fn test_missing_hand_keeps_pending_candidate() {
    let mut classifier = GestureClassifier::new(Duration::from_millis(300));
    let t0 = Instant::now();

    classifier.observe_raw(RawGesture::Open, t0);
    assert_eq!(classifier.observe_points(None, t0 + Duration::from_millis(100)), None);
    assert_eq!(classifier.observe_points(Some(&[Vec3::ZERO; 4][..]), t0 + Duration::from_millis(200)), None);

    let emission = classifier.observe_raw(RawGesture::Open, t0 + Duration::from_millis(300));
    assert_eq!(emission.map(|e| e.mode), Some(Mode::Open));
}

// ============================================================================
// Integration order
// ============================================================================

/// One tick computed particle by particle, in index order.
fn reference_step(integrator: &Integrator, field: &mut ParticleField, modes: &ModeController, dt: f32) -> SafetyReport {
    let params = *integrator.params();
    let dt = params.clamp_dt(dt);
    let alpha = params.attraction_model.step_fraction(dt);
    let frame_seed = integrator.frame_seed();
    let impulse = modes.entered_explode();

    let mut report = SafetyReport::default();
    for (i, p) in field.particles_mut().iter_mut().enumerate() {
        match modes.regime() {
            Regime::Explode => explode_step(p, &params, dt, impulse),
            Regime::Tree => tree_step(p, &params, alpha, jitter_for(&params, frame_seed, i)),
        }
        match safety_net(p, params.divergence_bound) {
            Correction::None => {}
            Correction::NonFinite => report.non_finite += 1,
            Correction::Diverged => report.diverged += 1,
        }
    }
    report
}

fn assert_matches_reference(count: usize, frames: usize) {
    let config = KernelConfig::default().with_particle_count(count).with_jitter(0.5, 0.05);
    let mut field = ParticleField::new(&config).unwrap();
    let mut expected = field.clone();
    let mut integrator = Integrator::new(&config);
    let mut modes = ModeController::new();

    for frame in 0..frames {
        match frame % 90 {
            0 => modes.apply(Mode::Tree),
            45 => modes.apply(Mode::Open),
            _ => false,
        };
        if frame % 30 == 7 {
            field.particles_mut()[frame % count].position = Vec3::splat(900.0);
            expected.particles_mut()[frame % count].position = Vec3::splat(900.0);
        }

        let safety = reference_step(&integrator, &mut expected, &modes, 0.016);
        let report = integrator.step(&mut field, &modes, 0.016);
        modes.resync();

        assert_eq!(report.safety, safety, "frame {}", frame);
        for (a, b) in field.particles().iter().zip(expected.particles()) {
            assert_eq!(a.position.to_array().map(f32::to_bits), b.position.to_array().map(f32::to_bits));
            assert_eq!(a.velocity.to_array().map(f32::to_bits), b.velocity.to_array().map(f32::to_bits));
        }
    }
}

#[test]
fn test_step_matches_per_particle_reference() {
    assert_matches_reference(300, 200);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_step_matches_per_particle_reference() {
    // Large enough for rayon to split the field across threads.
    assert_matches_reference(20_000, 120);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_identical_inputs_give_identical_trajectories() {
    let run = || {
        let (mut scene, mut buffer) = scene(KernelConfig::default().with_particle_count(256).with_seed(42));
        let mut rng = SmallRng::seed_from_u64(99);
        for frame in 0..400 {
            if frame == 50 {
                scene.set_mode(Mode::Tree);
            }
            if frame == 250 {
                scene.set_mode(Mode::Open);
            }
            let dt = rng.gen_range(0.01..0.03);
            scene.tick(frame as f32 * 0.016, dt, &mut buffer);
        }
        scene
            .field()
            .particles()
            .iter()
            .map(|p| (p.position, p.velocity))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_different_seeds_give_different_fields() {
    let a = ParticleField::new(&KernelConfig::default().with_particle_count(32).with_seed(1)).unwrap();
    let b = ParticleField::new(&KernelConfig::default().with_particle_count(32).with_seed(2)).unwrap();
    assert_ne!(a.particles()[0].explode_target(), b.particles()[0].explode_target());
}

// ============================================================================
// Configuration
// ============================================================================

#[cfg(feature = "serde")]
#[test]
fn test_config_loads_from_partial_json() {
    let json = r#"{
        "particle_count": 500,
        "attraction_model": { "FixedStep": { "fraction": 0.05 } },
        "debounce_ms": 250
    }"#;
    let config: KernelConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.particle_count, 500);
    assert_eq!(config.attraction_model, AttractionModel::FixedStep { fraction: 0.05 });
    assert_eq!(config.debounce(), Duration::from_millis(250));
    assert_eq!(config.max_speed, KernelConfig::default().max_speed);
    assert!(config.validate().is_ok());
}

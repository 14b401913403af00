//! Per-frame motion integration.
//!
//! Each tick every particle is advanced by exactly one of two strategies,
//! chosen once per tick from the latched [`ModeController`]:
//!
//! - **Explode** ([`Regime::Explode`]): spring toward the nebula target plus a
//!   swirl around the Y axis, integrated with semi-implicit Euler, per-particle
//!   drag and a hard speed clamp. On the first tick after entering the regime
//!   every particle gets a radial kick.
//! - **Tree** ([`Regime::Tree`]): residual velocity is damped and the position
//!   slides a fraction of the remaining distance toward the tree target, with
//!   an occasional tiny jitter.
//!
//! Afterwards the safety net resets any particle whose state became
//! non-finite or left the divergence bound. Particles never interact, so the
//! field can be processed in any order, or in parallel with the `parallel`
//! feature; the jitter stream is keyed by `(seed, frame, index)` so both paths
//! produce identical results.

use crate::config::{AttractionModel, KernelConfig};
use crate::field::ParticleField;
use crate::mode::{ModeController, Regime};
use crate::particle::Particle;
use crate::shapes::mix_seed;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Coefficients read by the integrator each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionParams {
    pub max_dt: f32,
    pub attraction: f32,
    pub vortex_strength: f32,
    pub impulse: f32,
    pub max_speed: f32,
    pub tree_velocity_damping: f32,
    pub attraction_model: AttractionModel,
    pub jitter_probability: f32,
    pub jitter_amplitude: f32,
    pub divergence_bound: f32,
}

impl From<&KernelConfig> for MotionParams {
    fn from(c: &KernelConfig) -> Self {
        Self {
            max_dt: c.max_dt,
            attraction: c.attraction,
            vortex_strength: c.vortex_strength,
            impulse: c.impulse,
            max_speed: c.max_speed,
            tree_velocity_damping: c.tree_velocity_damping,
            attraction_model: c.attraction_model,
            jitter_probability: c.jitter_probability,
            jitter_amplitude: c.jitter_amplitude,
            divergence_bound: c.divergence_bound,
        }
    }
}

impl MotionParams {
    /// Clamp a raw frame delta into `[0, max_dt]`. NaN becomes 0.
    #[inline]
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_nan() {
            0.0
        } else {
            dt.clamp(0.0, self.max_dt)
        }
    }
}

/// What the safety net did to one particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correction {
    None,
    /// Non-finite state reset to the origin at rest.
    NonFinite,
    /// Out-of-bounds position reset to the explode target at rest.
    Diverged,
}

/// Safety-net counters for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SafetyReport {
    pub non_finite: usize,
    pub diverged: usize,
}

impl SafetyReport {
    fn record(mut self, correction: Correction) -> Self {
        match correction {
            Correction::None => {}
            Correction::NonFinite => self.non_finite += 1,
            Correction::Diverged => self.diverged += 1,
        }
        self
    }

    /// Combine the counters of two reports.
    pub fn merge(self, other: SafetyReport) -> Self {
        Self {
            non_finite: self.non_finite + other.non_finite,
            diverged: self.diverged + other.diverged,
        }
    }

    /// Total particles corrected.
    pub fn total(&self) -> usize {
        self.non_finite + self.diverged
    }
}

/// Summary of one [`Integrator::step`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub regime: Regime,
    /// The clamped delta actually used.
    pub dt: f32,
    /// Whether the entry impulse was applied this tick.
    pub impulse_applied: bool,
    pub safety: SafetyReport,
}

/// Advances a [`ParticleField`] one tick at a time.
#[derive(Clone, Debug)]
pub struct Integrator {
    params: MotionParams,
    seed: u64,
    frame: u64,
}

impl Integrator {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            params: MotionParams::from(config),
            seed: config.seed,
            frame: 0,
        }
    }

    #[inline]
    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Ticks integrated so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seed of the jitter stream for the next [`step`](Self::step).
    #[inline]
    pub fn frame_seed(&self) -> u64 {
        mix_seed(self.seed, self.frame ^ 0xA5A5_0000_0000_0000)
    }

    /// Advance every particle by one tick of (raw) length `dt`.
    ///
    /// `modes` must already hold this tick's mode; the caller resyncs it
    /// afterwards.
    pub fn step(&mut self, field: &mut ParticleField, modes: &ModeController, dt: f32) -> StepReport {
        let params = self.params;
        let dt = params.clamp_dt(dt);
        let regime = modes.regime();
        let impulse = modes.entered_explode();
        let alpha = params.attraction_model.step_fraction(dt);
        let frame_seed = self.frame_seed();

        let advance = |index: usize, p: &mut Particle| -> Correction {
            match regime {
                Regime::Explode => explode_step(p, &params, dt, impulse),
                Regime::Tree => {
                    let jitter = jitter_for(&params, frame_seed, index);
                    tree_step(p, &params, alpha, jitter)
                }
            }
            safety_net(p, params.divergence_bound)
        };

        let safety = run(field.particles_mut(), advance);

        if safety.total() > 0 {
            log::debug!(
                "Safety net frame {}: {} non-finite, {} diverged",
                self.frame,
                safety.non_finite,
                safety.diverged
            );
        }

        self.frame += 1;
        StepReport {
            regime,
            dt,
            impulse_applied: impulse,
            safety,
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn run<F>(particles: &mut [Particle], advance: F) -> SafetyReport
where
    F: Fn(usize, &mut Particle) -> Correction,
{
    particles
        .iter_mut()
        .enumerate()
        .fold(SafetyReport::default(), |report, (i, p)| report.record(advance(i, p)))
}

#[cfg(feature = "parallel")]
fn run<F>(particles: &mut [Particle], advance: F) -> SafetyReport
where
    F: Fn(usize, &mut Particle) -> Correction + Sync + Send,
{
    use rayon::prelude::*;

    particles
        .par_iter_mut()
        .enumerate()
        .fold(SafetyReport::default, |report, (i, p)| report.record(advance(i, p)))
        .reduce(SafetyReport::default, SafetyReport::merge)
}

/// One explode-regime step.
///
/// `impulse` adds the radial entry kick before the forces are applied. A
/// particle sitting exactly at the origin is kicked straight up.
pub fn explode_step(p: &mut Particle, params: &MotionParams, dt: f32, impulse: bool) {
    if impulse {
        let dir = p.position.normalize_or_zero();
        let dir = if dir == Vec3::ZERO { Vec3::Y } else { dir };
        p.velocity += dir * params.impulse;
    }

    let mut force = (p.explode_target() - p.position) * params.attraction;
    force.x += -p.position.z * params.vortex_strength;
    force.z += p.position.x * params.vortex_strength;

    p.velocity += force * (dt / p.mass());
    p.velocity *= p.drag();
    p.velocity = p.velocity.clamp_length_max(params.max_speed);
    p.position += p.velocity;
}

/// One tree-regime step with interpolation factor `alpha`.
pub fn tree_step(p: &mut Particle, params: &MotionParams, alpha: f32, jitter: Vec3) {
    p.velocity *= params.tree_velocity_damping;
    p.position = p.position.lerp(p.tree_target(), alpha);
    p.position += jitter;
}

/// Jitter offset for particle `index` in the tick seeded by `frame_seed`
/// (usually zero).
pub fn jitter_for(params: &MotionParams, frame_seed: u64, index: usize) -> Vec3 {
    if params.jitter_amplitude <= 0.0 || params.jitter_probability <= 0.0 {
        return Vec3::ZERO;
    }
    let mut rng = SmallRng::seed_from_u64(mix_seed(frame_seed, index as u64));
    if rng.gen::<f32>() >= params.jitter_probability {
        return Vec3::ZERO;
    }
    Vec3::new(
        rng.gen::<f32>() - 0.5,
        rng.gen::<f32>() - 0.5,
        rng.gen::<f32>() - 0.5,
    ) * params.jitter_amplitude
}

/// Reset a particle whose state is unusable.
///
/// Non-finite position or velocity: origin, at rest. Squared distance from
/// the origin above `bound`: explode target, at rest.
pub fn safety_net(p: &mut Particle, bound: f32) -> Correction {
    if !p.position.is_finite() || !p.velocity.is_finite() {
        p.position = Vec3::ZERO;
        p.velocity = Vec3::ZERO;
        return Correction::NonFinite;
    }
    if p.position.length_squared() > bound {
        p.position = p.explode_target();
        p.velocity = Vec3::ZERO;
        return Correction::Diverged;
    }
    Correction::None
}

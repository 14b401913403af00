//! Kernel configuration.
//!
//! Every tunable of the kernel lives in [`KernelConfig`]. The defaults
//! give the classic look: 1200 particles, a 300 ms gesture debounce,
//! spring 0.2 / vortex 0.5 explode physics clamped to speed 1.5, and a 5 %
//! per-frame (at 60 fps) slide into the tree.
//!
//! ```ignore
//! let config = KernelConfig::default()
//!     .with_particle_count(2500)
//!     .with_attraction_model(AttractionModel::FixedStep { fraction: 0.05 });
//! config.validate()?;
//! ```
//!
//! Invalid values are reported by [`KernelConfig::validate`], never clamped.

use crate::error::ConfigError;
use crate::shapes::{NebulaShape, TreeShape};
use glam::Vec3;
use std::ops::Range;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hard upper bound on the particle count.
pub const MAX_PARTICLES: usize = 100_000;

/// Convert a `0xRRGGBB` literal into an RGB color in `0.0..=1.0`.
pub fn rgb_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    )
}

/// Cream gold, pure gold, cardinal red, emerald.
pub fn default_palette() -> Vec<Vec3> {
    [0xF8F0E3, 0xFFD700, 0xC41E3A, 0x50C878]
        .into_iter()
        .map(rgb_hex)
        .collect()
}

/// How the tree strategy slides a particle toward its target.
///
/// The classic look moved every particle a fixed fraction of the remaining
/// distance each rendered frame, which converges faster on faster displays.
/// `Exponential` uses `1 - exp(-rate * dt)` instead and behaves the same at
/// any frame rate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttractionModel {
    /// Fixed fraction per tick, independent of `dt`.
    FixedStep {
        /// Fraction of the remaining distance covered each tick, in `(0, 1]`.
        fraction: f32,
    },
    /// Frame-rate independent exponential decay.
    Exponential {
        /// Decay rate per second.
        rate: f32,
    },
}

impl AttractionModel {
    /// Exponential rate that matches a fixed-step `fraction` at `fps`.
    pub fn matching_fixed_step(fraction: f32, fps: f32) -> Self {
        AttractionModel::Exponential {
            rate: -(1.0 - fraction).ln() * fps,
        }
    }

    /// Interpolation factor for one tick of length `dt`.
    #[inline]
    pub fn step_fraction(&self, dt: f32) -> f32 {
        match *self {
            AttractionModel::FixedStep { fraction } => fraction,
            AttractionModel::Exponential { rate } => 1.0 - (-rate * dt).exp(),
        }
    }
}

impl Default for AttractionModel {
    fn default() -> Self {
        AttractionModel::matching_fixed_step(0.05, 60.0)
    }
}

/// All tunables of the particle kernel.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KernelConfig {
    /// Number of particles, fixed for the life of the field.
    pub particle_count: usize,
    /// Seed for target generation and tree jitter.
    pub seed: u64,

    /// Explode target distribution.
    pub nebula: NebulaShape,
    /// Tree target distribution.
    pub tree: TreeShape,
    /// Fraction of particles tagged as cubes (the rest are spheres).
    pub cube_fraction: f32,

    /// Per-particle mass range.
    pub mass_range: Range<f32>,
    /// Per-particle velocity retention per tick, in `(0, 1]`.
    pub drag_range: Range<f32>,
    /// Per-particle base render scale.
    pub scale_range: Range<f32>,
    /// Per-particle self-rotation speed in radians per second.
    pub spin_range: Range<f32>,
    /// Colors assigned uniformly at random.
    pub palette: Vec<Vec3>,

    /// Upper bound on the frame delta fed to the integrator, in seconds.
    pub max_dt: f32,
    /// Spring coefficient pulling toward the explode target.
    pub attraction: f32,
    /// Strength of the swirl around the vertical axis.
    pub vortex_strength: f32,
    /// Radial velocity kick applied on entry into the explode regime.
    pub impulse: f32,
    /// Speed clamp after integration.
    pub max_speed: f32,

    /// Velocity retention per tick while in the tree regime.
    pub tree_velocity_damping: f32,
    /// Tree slide model.
    pub attraction_model: AttractionModel,
    /// Probability per particle per tick of a jitter nudge.
    pub jitter_probability: f32,
    /// Full width of the per-axis jitter nudge (0 disables jitter).
    pub jitter_amplitude: f32,

    /// Squared distance from the origin beyond which a particle is reset.
    pub divergence_bound: f32,

    /// How long a raw gesture must persist before it is confirmed, in ms.
    pub debounce_ms: u64,

    /// Angular frequency of the scale pulse.
    pub pulse_frequency: f32,
    /// Relative amplitude of the scale pulse, in `[0, 1)`.
    pub pulse_amplitude: f32,
    /// Field-wide yaw added per tick.
    pub group_spin: f32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            particle_count: 1200,
            seed: 0x6E65_6275_6C61,
            nebula: NebulaShape::default(),
            tree: TreeShape::default(),
            cube_fraction: 0.0,
            mass_range: 1.0..2.0,
            drag_range: 0.90..0.95,
            scale_range: 0.05..0.17,
            spin_range: 0.5..1.5,
            palette: default_palette(),
            max_dt: 0.1,
            attraction: 0.2,
            vortex_strength: 0.5,
            impulse: 0.5,
            max_speed: 1.5,
            tree_velocity_damping: 0.9,
            attraction_model: AttractionModel::default(),
            jitter_probability: 0.1,
            jitter_amplitude: 0.01,
            divergence_bound: 5000.0,
            debounce_ms: 300,
            pulse_frequency: 3.0,
            pulse_amplitude: 0.2,
            group_spin: 0.002,
        }
    }
}

impl KernelConfig {
    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the generation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the explode target distribution.
    pub fn with_nebula(mut self, nebula: NebulaShape) -> Self {
        self.nebula = nebula;
        self
    }

    /// Set the tree target distribution.
    pub fn with_tree(mut self, tree: TreeShape) -> Self {
        self.tree = tree;
        self
    }

    /// Set the fraction of cube-tagged particles.
    pub fn with_cube_fraction(mut self, fraction: f32) -> Self {
        self.cube_fraction = fraction;
        self
    }

    /// Replace the color palette.
    pub fn with_palette(mut self, palette: Vec<Vec3>) -> Self {
        self.palette = palette;
        self
    }

    /// Set the tree slide model.
    pub fn with_attraction_model(mut self, model: AttractionModel) -> Self {
        self.attraction_model = model;
        self
    }

    /// Set the jitter probability and amplitude. Zero amplitude disables it.
    pub fn with_jitter(mut self, probability: f32, amplitude: f32) -> Self {
        self.jitter_probability = probability;
        self.jitter_amplitude = amplitude;
        self
    }

    /// Set the explode spring and vortex coefficients.
    pub fn with_explode_forces(mut self, attraction: f32, vortex_strength: f32) -> Self {
        self.attraction = attraction;
        self.vortex_strength = vortex_strength;
        self
    }

    /// Set the entry impulse magnitude.
    pub fn with_impulse(mut self, impulse: f32) -> Self {
        self.impulse = impulse;
        self
    }

    /// Set the speed clamp.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Set the frame delta clamp.
    pub fn with_max_dt(mut self, max_dt: f32) -> Self {
        self.max_dt = max_dt;
        self
    }

    /// Set the divergence bound (squared distance).
    pub fn with_divergence_bound(mut self, bound: f32) -> Self {
        self.divergence_bound = bound;
        self
    }

    /// Set the gesture debounce window in milliseconds.
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Check every value, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::ZeroParticles);
        }
        if self.particle_count > MAX_PARTICLES {
            return Err(ConfigError::TooManyParticles {
                count: self.particle_count,
                max: MAX_PARTICLES,
            });
        }
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::ZeroDebounce);
        }

        positive("max_dt", self.max_dt)?;
        positive("max_speed", self.max_speed)?;
        positive("divergence_bound", self.divergence_bound)?;
        non_negative("attraction", self.attraction)?;
        finite("vortex_strength", self.vortex_strength)?;
        non_negative("impulse", self.impulse)?;
        non_negative("jitter_amplitude", self.jitter_amplitude)?;
        non_negative("pulse_frequency", self.pulse_frequency)?;
        finite("group_spin", self.group_spin)?;

        within("tree_velocity_damping", self.tree_velocity_damping, 0.0, 1.0)?;
        within("jitter_probability", self.jitter_probability, 0.0, 1.0)?;
        within("cube_fraction", self.cube_fraction, 0.0, 1.0)?;
        within("pulse_amplitude", self.pulse_amplitude, 0.0, 0.99)?;

        range("mass_range", &self.mass_range)?;
        positive("mass_range.start", self.mass_range.start)?;
        range("drag_range", &self.drag_range)?;
        within("drag_range.start", self.drag_range.start, f32::MIN_POSITIVE, 1.0)?;
        within("drag_range.end", self.drag_range.end, f32::MIN_POSITIVE, 1.0)?;
        range("scale_range", &self.scale_range)?;
        positive("scale_range.start", self.scale_range.start)?;
        finite("spin_range.start", self.spin_range.start)?;
        finite("spin_range.end", self.spin_range.end)?;
        if self.spin_range.end < self.spin_range.start {
            return Err(ConfigError::EmptyRange {
                name: "spin_range",
                min: self.spin_range.start,
                max: self.spin_range.end,
            });
        }

        match self.attraction_model {
            AttractionModel::FixedStep { fraction } => {
                within("attraction_model.fraction", fraction, f32::MIN_POSITIVE, 1.0)?
            }
            AttractionModel::Exponential { rate } => positive("attraction_model.rate", rate)?,
        }

        non_negative("nebula.min_radius", self.nebula.min_radius)?;
        non_negative("nebula.spread", self.nebula.spread)?;
        positive("nebula.falloff", self.nebula.falloff)?;
        for (name, v) in [
            ("nebula.axes.x", self.nebula.axes.x),
            ("nebula.axes.y", self.nebula.axes.y),
            ("nebula.axes.z", self.nebula.axes.z),
        ] {
            positive(name, v)?;
        }
        // Explode targets must sit strictly inside the divergence bound or
        // the guard would keep resetting particles onto themselves.
        let extent = self.nebula.max_extent();
        if extent * extent >= self.divergence_bound {
            return Err(ConfigError::OutOfRange {
                name: "nebula extent squared",
                value: extent * extent,
                min: 0.0,
                max: self.divergence_bound,
            });
        }

        match self.tree {
            TreeShape::LayeredCone {
                height,
                base_radius,
                layer_jitter,
                ..
            } => {
                if self.tree.levels().unwrap_or(0) < 2 {
                    return Err(ConfigError::OutOfRange {
                        name: "tree.levels",
                        value: self.tree.levels().unwrap_or(0) as f32,
                        min: 2.0,
                        max: u32::MAX as f32,
                    });
                }
                positive("tree.height", height)?;
                positive("tree.base_radius", base_radius)?;
                non_negative("tree.layer_jitter", layer_jitter)?;
            }
            TreeShape::Spiral {
                turns,
                height,
                base_radius,
                thickness,
            } => {
                positive("tree.turns", turns)?;
                positive("tree.height", height)?;
                positive("tree.base_radius", base_radius)?;
                non_negative("tree.thickness", thickness)?;
            }
        }
        // Same for tree targets, or the tree regime could never converge.
        let extent = self.tree.max_extent();
        if extent * extent >= self.divergence_bound {
            return Err(ConfigError::OutOfRange {
                name: "tree extent squared",
                value: extent * extent,
                min: 0.0,
                max: self.divergence_bound,
            });
        }

        for color in &self.palette {
            if !color.is_finite() {
                return Err(ConfigError::NonFinite {
                    name: "palette",
                    value: f32::NAN,
                });
            }
        }

        Ok(())
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name, value })
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

fn within(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value, min, max })
    }
}

fn range(name: &'static str, r: &Range<f32>) -> Result<(), ConfigError> {
    finite(name, r.start)?;
    finite(name, r.end)?;
    if r.start < r.end {
        Ok(())
    } else {
        Err(ConfigError::EmptyRange {
            name,
            min: r.start,
            max: r.end,
        })
    }
}

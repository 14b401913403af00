//! Target shape generators.
//!
//! Every particle owns two fixed targets: a point in the nebula (explode
//! shape) and a point on the tree. Both are drawn once, at field
//! construction, from closed-form distributions by a [`ShapeContext`] that is
//! seeded from the field seed and the particle index, so a particle's targets
//! never depend on any other particle.
//!
//! ```ignore
//! let mut ctx = ShapeContext::new(seed, index);
//! let nebula = NebulaShape::default().sample(&mut ctx);
//! let tree = TreeShape::default().sample(&mut ctx);
//! ```

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-particle random source with helpers for the distributions used here.
pub struct ShapeContext {
    /// Index of the particle being generated.
    pub index: usize,
    rng: SmallRng,
}

impl ShapeContext {
    /// Create a context for one particle.
    ///
    /// The same `(seed, index)` pair always yields the same sequence.
    pub fn new(seed: u64, index: usize) -> Self {
        Self {
            index,
            rng: SmallRng::seed_from_u64(mix_seed(seed, index as u64)),
        }
    }

    /// Random f32 in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in `[min, max)`. Returns `min` when the range is empty.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Random index in `0..len`. `len` must be non-zero.
    #[inline]
    pub fn random_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniformly distributed unit vector.
    ///
    /// Uses `acos(2u - 1)` for the polar angle so the poles are not
    /// oversampled.
    pub fn random_direction(&mut self) -> Vec3 {
        let theta = self.rng.gen_range(0.0..TAU);
        let phi = (self.rng.gen::<f32>() * 2.0 - 1.0).clamp(-1.0, 1.0).acos();
        Vec3::new(
            phi.sin() * theta.cos(),
            phi.sin() * theta.sin(),
            phi.cos(),
        )
    }
}

/// Derive an independent stream per particle from the field seed.
///
/// SplitMix64 finalizer over `seed ^ index * golden`.
pub(crate) fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Diffuse nebula distribution used as the explode target.
///
/// Radius is `min_radius + u^falloff * spread`, so particles crowd toward the
/// inner shell and thin out with distance. `axes` stretches the sphere into
/// an ellipsoid.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NebulaShape {
    /// Radius of the empty core.
    pub min_radius: f32,
    /// Extra radius reachable beyond the core.
    pub spread: f32,
    /// Exponent applied to the uniform sample (higher = denser core).
    pub falloff: f32,
    /// Per-axis stretch (ONE = sphere).
    pub axes: Vec3,
}

impl Default for NebulaShape {
    fn default() -> Self {
        Self {
            min_radius: 1.0,
            spread: 6.0,
            falloff: 3.0,
            axes: Vec3::ONE,
        }
    }
}

impl NebulaShape {
    /// Draw one nebula point.
    pub fn sample(&self, ctx: &mut ShapeContext) -> Vec3 {
        let r = ctx.random().powf(self.falloff) * self.spread + self.min_radius;
        ctx.random_direction() * r * self.axes
    }

    /// Largest distance from the origin a sample can reach.
    pub fn max_extent(&self) -> f32 {
        (self.min_radius + self.spread) * self.axes.abs().max_element()
    }
}

/// Tree distribution used as the attract target.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TreeShape {
    /// Stacked rings whose radius shrinks linearly toward the top.
    LayeredCone {
        /// Number of rings (at least 2).
        levels: u32,
        /// Total height; the cone spans `-height/2..=height/2`.
        height: f32,
        /// Ring radius at the bottom level.
        base_radius: f32,
        /// Full width of the vertical jitter band around each ring.
        layer_jitter: f32,
    },
    /// A single helix wound around a narrowing cone.
    Spiral {
        /// Number of full turns from bottom to top.
        turns: f32,
        /// Total height; the spiral spans `-height/2..=height/2`.
        height: f32,
        /// Radius at the bottom.
        base_radius: f32,
        /// Radial scatter around the helix line.
        thickness: f32,
    },
}

impl Default for TreeShape {
    fn default() -> Self {
        TreeShape::LayeredCone {
            levels: 15,
            height: 6.0,
            base_radius: 2.8,
            layer_jitter: 0.3,
        }
    }
}

impl TreeShape {
    /// Draw one tree point.
    pub fn sample(&self, ctx: &mut ShapeContext) -> Vec3 {
        match *self {
            TreeShape::LayeredCone {
                levels,
                height,
                base_radius,
                layer_jitter,
            } => {
                let levels = levels.max(2);
                let level = ctx.random_index(levels as usize) as f32;
                let h = level / (levels - 1) as f32;
                let y = h * height - height * 0.5;
                let radius = (1.0 - h) * base_radius;
                let theta = ctx.random_range(0.0, TAU);
                let jitter = (ctx.random() - 0.5) * layer_jitter;

                Vec3::new(radius * theta.cos(), y + jitter, radius * theta.sin())
            }
            TreeShape::Spiral {
                turns,
                height,
                base_radius,
                thickness,
            } => {
                let h = ctx.random();
                let theta = h * turns * TAU;
                let radius = (1.0 - h) * base_radius;
                let scatter = Vec3::new(
                    ctx.random() - 0.5,
                    ctx.random() - 0.5,
                    ctx.random() - 0.5,
                ) * thickness;

                Vec3::new(
                    radius * theta.cos(),
                    h * height - height * 0.5,
                    radius * theta.sin(),
                ) + scatter
            }
        }
    }

    /// Upper bound on the distance from the origin a sample can reach,
    /// including layer jitter and spiral scatter.
    pub fn max_extent(&self) -> f32 {
        match *self {
            TreeShape::LayeredCone {
                height,
                base_radius,
                layer_jitter,
                ..
            } => {
                let half_height = height.abs() * 0.5 + layer_jitter.abs() * 0.5;
                (base_radius * base_radius + half_height * half_height).sqrt()
            }
            TreeShape::Spiral {
                height,
                base_radius,
                thickness,
                ..
            } => {
                let half_height = height.abs() * 0.5;
                // Scatter is up to thickness / 2 on each axis.
                let scatter = thickness.abs() * 0.5 * 3.0_f32.sqrt();
                (base_radius * base_radius + half_height * half_height).sqrt() + scatter
            }
        }
    }

    pub(crate) fn levels(&self) -> Option<u32> {
        match self {
            TreeShape::LayeredCone { levels, .. } => Some(*levels),
            TreeShape::Spiral { .. } => None,
        }
    }
}

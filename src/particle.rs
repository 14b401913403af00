//! The per-particle record.

use crate::config::KernelConfig;
use crate::shapes::ShapeContext;
use glam::Vec3;

/// Which instanced mesh a particle is drawn with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    /// Drawn with the sphere mesh (default).
    #[default]
    Sphere,
    /// Drawn with the cube mesh.
    Cube,
}

/// One particle.
///
/// `position` and `velocity` are the only mutable state; everything else is
/// fixed when the particle is generated.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Current location, advanced by the integrator every tick.
    pub position: Vec3,
    /// Current velocity. Only the explode regime integrates it.
    pub velocity: Vec3,
    explode_target: Vec3,
    tree_target: Vec3,
    mass: f32,
    drag: f32,
    scale: f32,
    spin_speed: f32,
    color: Vec3,
    kind: ParticleKind,
}

impl Particle {
    /// Generate particle `ctx.index` from the configured distributions.
    ///
    /// The particle starts at rest on its explode target. `config` must have
    /// passed [`KernelConfig::validate`]; [`ParticleField::new`] checks that
    /// first.
    ///
    /// [`ParticleField::new`]: crate::field::ParticleField::new
    pub(crate) fn generate(config: &KernelConfig, ctx: &mut ShapeContext) -> Self {
        let explode_target = config.nebula.sample(ctx);
        let tree_target = config.tree.sample(ctx);
        let color = config.palette[ctx.random_index(config.palette.len())];
        let scale = ctx.random_range(config.scale_range.start, config.scale_range.end);
        let mass = ctx.random_range(config.mass_range.start, config.mass_range.end);
        let drag = ctx.random_range(config.drag_range.start, config.drag_range.end);
        let spin_speed = ctx.random_range(config.spin_range.start, config.spin_range.end);
        let kind = if ctx.random() < config.cube_fraction {
            ParticleKind::Cube
        } else {
            ParticleKind::Sphere
        };

        Self {
            position: explode_target,
            velocity: Vec3::ZERO,
            explode_target,
            tree_target,
            mass,
            drag,
            scale,
            spin_speed,
            color,
            kind,
        }
    }

    /// Resting point in the nebula.
    #[inline]
    pub fn explode_target(&self) -> Vec3 {
        self.explode_target
    }

    /// Resting point on the tree.
    #[inline]
    pub fn tree_target(&self) -> Vec3 {
        self.tree_target
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Velocity retained per tick in the explode regime.
    #[inline]
    pub fn drag(&self) -> f32 {
        self.drag
    }

    /// Base render scale before the pulse.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Self-rotation speed in radians per second.
    #[inline]
    pub fn spin_speed(&self) -> f32 {
        self.spin_speed
    }

    #[inline]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    #[inline]
    pub fn kind(&self) -> ParticleKind {
        self.kind
    }
}

//! The fixed-size particle field.
//!
//! A [`ParticleField`] is built once from a validated [`KernelConfig`] and
//! never grows or shrinks. Particles are only ever moved, by the integrator.

use crate::config::KernelConfig;
use crate::error::ConfigError;
use crate::particle::{Particle, ParticleKind};
use crate::shapes::ShapeContext;

/// All particles of the scene.
#[derive(Clone, Debug)]
pub struct ParticleField {
    particles: Vec<Particle>,
    seed: u64,
}

impl ParticleField {
    /// Validate `config` and generate every particle.
    ///
    /// Generation is independent per particle: particle `i` depends only on
    /// `config.seed` and `i`.
    pub fn new(config: &KernelConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let particles: Vec<Particle> = (0..config.particle_count)
            .map(|i| {
                let mut ctx = ShapeContext::new(config.seed, i);
                Particle::generate(config, &mut ctx)
            })
            .collect();

        let cubes = particles
            .iter()
            .filter(|p| p.kind() == ParticleKind::Cube)
            .count();
        log::info!(
            "Generated particle field: {} particles ({} cubes), seed {:#x}",
            particles.len(),
            cubes,
            config.seed
        );

        Ok(Self {
            particles,
            seed: config.seed,
        })
    }

    /// Number of particles. Never changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Always false for a constructed field.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Seed the field was generated from.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access to the particle slice (fixed length).
    #[inline]
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    /// Number of particles of the given kind.
    pub fn count_kind(&self, kind: ParticleKind) -> usize {
        self.particles.iter().filter(|p| p.kind() == kind).count()
    }
}

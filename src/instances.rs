//! Per-instance render data.
//!
//! The renderer is a collaborator behind the [`InstanceSink`] trait: each tick
//! the [`TransformEmitter`] writes one [`InstanceTransform`] per particle
//! slot, and once, right after construction, one color (and mesh kind) per
//! slot. [`InstanceBuffer`] is a ready-made sink holding both arrays in
//! GPU-uploadable form.

use crate::config::KernelConfig;
use crate::field::ParticleField;
use crate::particle::ParticleKind;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// Translation, rotation and uniform scale of one instance.
///
/// Layout is `#[repr(C)]`, 32 bytes: `translation`, `scale`, then the
/// rotation quaternion as `xyzw`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub translation: [f32; 3],
    pub scale: f32,
    pub rotation: [f32; 4],
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, 1.0)
    }
}

impl InstanceTransform {
    pub fn new(translation: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            translation: translation.to_array(),
            scale,
            rotation: rotation.to_array(),
        }
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        Vec3::from_array(self.translation)
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_array(self.rotation)
    }

    /// Column-major model matrix (scale, then rotate, then translate).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation(), self.translation())
    }
}

/// Receives per-instance render data. Implemented by the renderer.
pub trait InstanceSink {
    /// Store the transform of slot `index`. Called every tick.
    fn write_transform(&mut self, index: usize, transform: &InstanceTransform);

    /// Store the color of slot `index`. Called once.
    fn write_color(&mut self, index: usize, color: Vec3);

    /// Store the mesh kind of slot `index`. Called once, with the colors.
    fn write_kind(&mut self, _index: usize, _kind: ParticleKind) {}
}

/// Fixed-size transform and color arrays, allocated once.
#[derive(Clone, Debug)]
pub struct InstanceBuffer {
    transforms: Vec<InstanceTransform>,
    colors: Vec<[f32; 3]>,
    kinds: Vec<ParticleKind>,
    transforms_dirty: bool,
    colors_dirty: bool,
}

impl InstanceBuffer {
    /// Allocate storage for `count` instances.
    pub fn new(count: usize) -> Self {
        Self {
            transforms: vec![InstanceTransform::default(); count],
            colors: vec![[1.0; 3]; count],
            kinds: vec![ParticleKind::default(); count],
            transforms_dirty: false,
            colors_dirty: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    #[inline]
    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    #[inline]
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    #[inline]
    pub fn kinds(&self) -> &[ParticleKind] {
        &self.kinds
    }

    /// Transform array as raw bytes for upload.
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    /// Color array as raw bytes for upload.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Slots drawn with the given mesh.
    pub fn slots_of(&self, kind: ParticleKind) -> impl Iterator<Item = usize> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .filter(move |(_, k)| **k == kind)
            .map(|(i, _)| i)
    }

    /// Whether transforms changed since the last call; clears the flag.
    pub fn take_transforms_dirty(&mut self) -> bool {
        std::mem::take(&mut self.transforms_dirty)
    }

    /// Whether colors changed since the last call; clears the flag.
    pub fn take_colors_dirty(&mut self) -> bool {
        std::mem::take(&mut self.colors_dirty)
    }
}

impl InstanceSink for InstanceBuffer {
    fn write_transform(&mut self, index: usize, transform: &InstanceTransform) {
        if let Some(slot) = self.transforms.get_mut(index) {
            *slot = *transform;
            self.transforms_dirty = true;
        }
    }

    fn write_color(&mut self, index: usize, color: Vec3) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color.to_array();
            self.colors_dirty = true;
        }
    }

    fn write_kind(&mut self, index: usize, kind: ParticleKind) {
        if let Some(slot) = self.kinds.get_mut(index) {
            *slot = kind;
        }
    }
}

/// Turns particle state into instance transforms.
///
/// Scale breathes as `scale * (1 + sin(t * frequency + index) * amplitude)`;
/// each particle spins about Y at its own speed; the whole field yaws by
/// `group_spin` per tick.
#[derive(Clone, Debug)]
pub struct TransformEmitter {
    pulse_frequency: f32,
    pulse_amplitude: f32,
    group_spin: f32,
    angles: Vec<f32>,
    group_yaw: f32,
    colors_written: bool,
}

impl TransformEmitter {
    pub fn new(config: &KernelConfig, count: usize) -> Self {
        Self {
            pulse_frequency: config.pulse_frequency,
            pulse_amplitude: config.pulse_amplitude,
            group_spin: config.group_spin,
            angles: vec![0.0; count],
            group_yaw: 0.0,
            colors_written: false,
        }
    }

    /// Pulse factor for slot `index` at time `t`.
    #[inline]
    pub fn pulse(&self, t: f32, index: usize) -> f32 {
        pulse(t, index, self.pulse_frequency, self.pulse_amplitude)
    }

    /// Field-wide yaw in radians, for the renderer's mesh transform.
    #[inline]
    pub fn group_yaw(&self) -> f32 {
        self.group_yaw
    }

    /// Write the static color and kind of every slot.
    pub fn write_colors<S: InstanceSink + ?Sized>(&mut self, field: &ParticleField, sink: &mut S) {
        for (i, p) in field.particles().iter().enumerate() {
            sink.write_color(i, p.color());
            sink.write_kind(i, p.kind());
        }
        self.colors_written = true;
    }

    /// Write this tick's transforms. Colors are written on the first call
    /// only.
    pub fn emit<S: InstanceSink + ?Sized>(&mut self, field: &ParticleField, t: f32, dt: f32, sink: &mut S) {
        if !self.colors_written {
            self.write_colors(field, sink);
        }

        self.group_yaw = (self.group_yaw + self.group_spin) % std::f32::consts::TAU;

        let (frequency, amplitude) = (self.pulse_frequency, self.pulse_amplitude);
        for ((i, p), angle) in field.particles().iter().enumerate().zip(self.angles.iter_mut()) {
            *angle = (*angle + dt * p.spin_speed()) % std::f32::consts::TAU;
            let transform = InstanceTransform::new(
                p.position,
                Quat::from_rotation_y(*angle),
                p.scale() * pulse(t, i, frequency, amplitude),
            );
            sink.write_transform(i, &transform);
        }
    }
}

#[inline]
fn pulse(t: f32, index: usize, frequency: f32, amplitude: f32) -> f32 {
    1.0 + (t * frequency + index as f32).sin() * amplitude
}

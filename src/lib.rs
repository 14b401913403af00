//! # Morphfield
//!
//! A gesture-driven particle field that morphs between a drifting nebula and
//! a layered tree.
//!
//! Morphfield is the simulation kernel only: it owns the particles, decides
//! how they move each frame, and writes per-instance transforms for a
//! renderer. The camera, hand detector and renderer are collaborators behind
//! small traits ([`LandmarkSource`], [`InstanceSink`]).
//!
//! ## Quick Start
//!
//! ```ignore
//! use morphfield::prelude::*;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let mut scene = Scene::new(KernelConfig::default().with_particle_count(2000))?;
//!     let mut buffer = InstanceBuffer::new(scene.field().len());
//!     let mut clock = FrameClock::new(scene.config().max_dt);
//!
//!     scene.set_mode(Mode::Tree);
//!     loop {
//!         let frame = clock.update();
//!         scene.tick(frame.elapsed, frame.delta, &mut buffer);
//!         // upload buffer.transform_bytes() and draw
//!     }
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! A [`ParticleField`] is built once from a [`KernelConfig`] and never
//! resized. Every particle carries two precomputed targets: a point in the
//! nebula ([`NebulaShape`]) and a point on the tree ([`TreeShape`]). Each
//! particle is generated from its own RNG stream derived from the field seed
//! and its index, so the same seed always gives the same field.
//!
//! ### Modes
//!
//! | Mode | Gesture | Motion |
//! |------|---------|--------|
//! | [`Mode::Idle`] | none yet | same as `Explode` |
//! | [`Mode::Explode`] | | spring + swirl toward the nebula target |
//! | [`Mode::Open`] | open hand | same as `Explode`, with a radial kick on entry |
//! | [`Mode::Tree`] | fist | slide onto the tree target |
//!
//! The [`ModeController`] latches the mode at the start of a tick and keeps
//! the previous one for exactly one tick so the integrator can see the edge.
//!
//! ### Gestures
//!
//! The [`GestureClassifier`] counts extended digits in a 21-point hand and
//! only emits a mode once the same reading has held for the debounce window
//! (300 ms by default). With [`spawn_capture`] it runs on its own thread and
//! hands results to the render loop through a single-slot latch
//! ([`gesture_latch`]), so a render frame never waits for the camera.
//!
//! ### Safety
//!
//! After every step, any particle with a non-finite state is reset to the
//! origin and any particle that drifted past the divergence bound is put back
//! on its nebula target, both at rest.
//!
//! ## Features
//!
//! - `parallel`: integrate particles across threads with `rayon`. Results are
//!   identical to the sequential path.
//! - `serde`: `Serialize`/`Deserialize` for [`KernelConfig`] and the shape
//!   types.

pub mod capture;
pub mod config;
pub mod error;
pub mod field;
pub mod gesture;
pub mod instances;
pub mod integrator;
pub mod latch;
pub mod mode;
pub mod particle;
pub mod scene;
pub mod shapes;
pub mod time;

pub use bytemuck;
pub use glam::{Quat, Vec3};

pub use capture::{spawn_capture, CaptureHandle, CapturePipeline, LandmarkSource, PoseStep, SimulatedHand};
pub use config::{AttractionModel, KernelConfig, MAX_PARTICLES};
pub use error::{CaptureError, ConfigError, LandmarkError};
pub use field::ParticleField;
pub use gesture::{GestureClassifier, GestureEmission, HandLandmarks, RawGesture, LANDMARK_COUNT};
pub use instances::{InstanceBuffer, InstanceSink, InstanceTransform, TransformEmitter};
pub use integrator::{Correction, Integrator, MotionParams, SafetyReport, StepReport};
pub use latch::{gesture_latch, GestureReceiver, GestureSender};
pub use mode::{Mode, ModeController, Regime};
pub use particle::{Particle, ParticleKind};
pub use scene::{Scene, SceneCues, TickReport};
pub use shapes::{NebulaShape, ShapeContext, TreeShape};
pub use time::{FrameClock, FrameTime};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use morphfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capture::{spawn_capture, LandmarkSource, PoseStep, SimulatedHand};
    pub use crate::config::{AttractionModel, KernelConfig};
    pub use crate::error::{CaptureError, ConfigError};
    pub use crate::field::ParticleField;
    pub use crate::gesture::HandLandmarks;
    pub use crate::instances::{InstanceBuffer, InstanceSink, InstanceTransform};
    pub use crate::latch::gesture_latch;
    pub use crate::mode::Mode;
    pub use crate::scene::{Scene, SceneCues};
    pub use crate::shapes::{NebulaShape, TreeShape};
    pub use crate::time::FrameClock;
    pub use crate::{Quat, Vec3};
}

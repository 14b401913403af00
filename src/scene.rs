//! The per-frame driver.
//!
//! A [`Scene`] owns the particle field and everything that advances it. The
//! host calls [`Scene::tick`] once per rendered frame:
//!
//! ```ignore
//! let mut scene = Scene::new(KernelConfig::default())?;
//! let (tx, rx) = gesture_latch();
//! scene.attach(rx);
//! let _capture = spawn_capture(source, scene.config().debounce(), tx);
//!
//! let mut buffer = InstanceBuffer::new(scene.field().len());
//! loop {
//!     let frame = clock.update();
//!     scene.tick(frame.elapsed, frame.delta, &mut buffer);
//!     // upload buffer.transform_bytes(), draw, present
//! }
//! ```

use crate::config::KernelConfig;
use crate::error::ConfigError;
use crate::field::ParticleField;
use crate::instances::{InstanceSink, TransformEmitter};
use crate::integrator::{Integrator, SafetyReport};
use crate::latch::GestureReceiver;
use crate::mode::{Mode, ModeController, Regime};

/// Status shown until the capture pipeline reports anything.
pub const STATUS_IDLE: &str = "Initializing...";

/// Presentation hints derived from the current mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCues {
    /// Show the topper star above the tree.
    pub star_visible: bool,
    /// Let the camera orbit on its own.
    pub auto_rotate: bool,
}

impl SceneCues {
    pub fn for_mode(mode: Mode) -> Self {
        let tree = mode.regime() == Regime::Tree;
        Self {
            star_visible: tree,
            auto_rotate: tree,
        }
    }
}

/// Summary of one [`Scene::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub mode: Mode,
    pub regime: Regime,
    /// The clamped delta actually integrated.
    pub dt: f32,
    /// The mode behaves differently from the last tick's.
    pub mode_changed: bool,
    pub impulse_applied: bool,
    pub safety: SafetyReport,
}

/// Particle field plus its mode latch, integrator and transform emitter.
#[derive(Debug)]
pub struct Scene {
    config: KernelConfig,
    field: ParticleField,
    integrator: Integrator,
    emitter: TransformEmitter,
    modes: ModeController,
    receiver: Option<GestureReceiver>,
    status: String,
}

impl Scene {
    /// Build a scene from a validated config.
    pub fn new(config: KernelConfig) -> Result<Self, ConfigError> {
        let field = ParticleField::new(&config)?;
        let integrator = Integrator::new(&config);
        let emitter = TransformEmitter::new(&config, field.len());
        Ok(Self {
            config,
            field,
            integrator,
            emitter,
            modes: ModeController::new(),
            receiver: None,
            status: STATUS_IDLE.to_string(),
        })
    }

    /// Attach the reading end of a gesture latch.
    pub fn with_receiver(mut self, receiver: GestureReceiver) -> Self {
        self.attach(receiver);
        self
    }

    /// Attach (or replace) the gesture latch.
    pub fn attach(&mut self, receiver: GestureReceiver) {
        self.receiver = Some(receiver);
    }

    /// Detach the gesture latch, returning it.
    pub fn detach(&mut self) -> Option<GestureReceiver> {
        self.receiver.take()
    }

    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[inline]
    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    #[inline]
    pub fn field_mut(&mut self) -> &mut ParticleField {
        &mut self.field
    }

    #[inline]
    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.modes.current()
    }

    /// Latest status line for the UI.
    #[inline]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Field-wide yaw for the renderer's mesh transform.
    #[inline]
    pub fn group_yaw(&self) -> f32 {
        self.emitter.group_yaw()
    }

    /// Ticks run so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.integrator.frame()
    }

    pub fn cues(&self) -> SceneCues {
        SceneCues::for_mode(self.modes.current())
    }

    /// Drive the mode directly, bypassing the latch. The next tick sees an
    /// edge if its mode behaves differently from the last tick's.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        self.modes.apply(mode)
    }

    /// Advance one frame at scene time `t` with raw delta `dt`, writing the
    /// resulting transforms into `sink`.
    pub fn tick<S: InstanceSink + ?Sized>(&mut self, t: f32, dt: f32, sink: &mut S) -> TickReport {
        if let Some(rx) = &self.receiver {
            if let Some(status) = rx.take_status() {
                self.status = status;
            }
            if let Some(mode) = rx.take() {
                self.modes.apply(mode);
            }
        }
        // Measured against the last integrated tick, so set_mode calls since
        // then are included.
        let mode_changed = self.modes.is_transition_edge();

        let step = self.integrator.step(&mut self.field, &self.modes, dt);
        self.emitter.emit(&self.field, t, step.dt, sink);
        self.modes.resync();

        TickReport {
            mode: self.modes.current(),
            regime: step.regime,
            dt: step.dt,
            mode_changed,
            impulse_applied: step.impulse_applied,
            safety: step.safety,
        }
    }
}

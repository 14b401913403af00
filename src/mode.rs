//! Behavioral modes and the per-tick mode latch.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Discrete behavioral state of the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// No gesture confirmed yet. Behaves as [`Mode::Explode`].
    #[default]
    Idle,
    /// Nebula physics.
    Explode,
    /// Open hand: nebula physics.
    Open,
    /// Closed fist: particles gather into the tree.
    Tree,
}

impl Mode {
    /// Which motion strategy governs this mode.
    #[inline]
    pub fn regime(self) -> Regime {
        match self {
            Mode::Tree => Regime::Tree,
            Mode::Idle | Mode::Explode | Mode::Open => Regime::Explode,
        }
    }

    /// `Idle` collapses to `Explode`; every other mode is unchanged.
    #[inline]
    pub fn effective(self) -> Mode {
        match self {
            Mode::Idle => Mode::Explode,
            m => m,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::Explode => "EXPLODE",
            Mode::Open => "OPEN",
            Mode::Tree => "FIST",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two motion strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Spring + vortex force integration.
    Explode,
    /// Exponential slide onto the tree target.
    Tree,
}

/// Current and previous mode, with transition-edge detection.
///
/// Written (by [`ModeController::apply`] with the latest confirmed gesture)
/// before the integrator runs, read by the integrator, and resynced by
/// [`ModeController::resync`] after integration. `previous` is the mode of
/// the last integrated tick, so an edge is visible for exactly one tick no
/// matter how many modes were applied in between.
///
/// Edges compare [`Mode::effective`] values: `Idle` and `Explode` are the
/// same behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeController {
    current: Mode,
    previous: Mode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start in `mode` with no pending edge.
    pub fn starting_in(mode: Mode) -> Self {
        Self {
            current: mode,
            previous: mode,
        }
    }

    #[inline]
    pub fn current(&self) -> Mode {
        self.current
    }

    #[inline]
    pub fn previous(&self) -> Mode {
        self.previous
    }

    /// Accept a confirmed mode.
    ///
    /// Re-confirming the current behavior is a no-op, so repeated classifier
    /// emissions cannot manufacture edges. Returns true if the effective mode
    /// changed.
    pub fn apply(&mut self, mode: Mode) -> bool {
        if mode == self.current {
            return false;
        }
        let changed = mode.effective() != self.current.effective();
        if changed {
            log::info!("Mode change: {} -> {}", self.current, mode);
        }
        self.current = mode;
        changed
    }

    /// True on the tick following a change of effective mode.
    #[inline]
    pub fn is_transition_edge(&self) -> bool {
        self.previous.effective() != self.current.effective()
    }

    /// True when this tick is an edge into the explode regime.
    #[inline]
    pub fn entered_explode(&self) -> bool {
        self.is_transition_edge() && self.current.regime() == Regime::Explode
    }

    /// Strategy for this tick.
    #[inline]
    pub fn regime(&self) -> Regime {
        self.current.regime()
    }

    /// Close the edge window. Call once after the integrator has run.
    #[inline]
    pub fn resync(&mut self) {
        self.previous = self.current;
    }
}

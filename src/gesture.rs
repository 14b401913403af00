//! Hand-gesture classification with debounce.
//!
//! A frame of 21 hand landmarks (wrist first, MediaPipe ordering) is reduced
//! to a count of open digits, the count to a raw gesture, and the raw gesture
//! is only confirmed after it has been held for the debounce window:
//!
//! | open digits | raw gesture |
//! |-------------|-------------|
//! | 4–5         | [`RawGesture::Open`] |
//! | 2–3         | [`RawGesture::Unresolved`] |
//! | 0–1         | [`RawGesture::Fist`] |
//!
//! Frames without a hand, and malformed frames, are not observations at all:
//! they neither emit nor disturb the debounce state.

use crate::error::LandmarkError;
use crate::mode::Mode;
use glam::{Vec2, Vec3};
use std::time::{Duration, Instant};

/// Landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Index of the wrist landmark.
pub const WRIST: usize = 0;

/// `(tip, proximal joint)` landmark pairs: thumb, index, middle, ring, pinky.
pub const DIGITS: [(usize, usize); 5] = [(4, 2), (8, 5), (12, 9), (16, 13), (20, 17)];

/// One validated hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [Vec3; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Validate a detector frame.
    pub fn new(points: &[Vec3]) -> Result<Self, LandmarkError> {
        if points.len() != LANDMARK_COUNT {
            return Err(LandmarkError::WrongCount {
                expected: LANDMARK_COUNT,
                got: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(LandmarkError::NonFinite { index });
        }

        let mut out = [Vec3::ZERO; LANDMARK_COUNT];
        out.copy_from_slice(points);
        Ok(Self { points: out })
    }

    /// Build a synthetic hand with the given digits extended.
    ///
    /// Each digit is a straight ray from the wrist; an open digit places its
    /// tip beyond the proximal joint, a curled one folds it back toward the
    /// wrist. Used by [`SimulatedHand`](crate::capture::SimulatedHand).
    pub fn posed(open: [bool; 5]) -> Self {
        let wrist = Vec3::new(0.5, 0.8, 0.0);
        let mut points = [wrist; LANDMARK_COUNT];

        for (digit, &(tip, joint)) in DIGITS.iter().enumerate() {
            // Fan the digits out over the upper half plane.
            let angle = std::f32::consts::PI * (0.15 + 0.175 * digit as f32);
            let dir = Vec3::new(-angle.cos(), -angle.sin(), 0.0);

            // Landmarks joint..=tip run along the ray.
            for idx in joint..=tip {
                let step = (idx - joint + 1) as f32;
                points[idx] = wrist + dir * (0.08 + 0.04 * step);
            }
            if !open[digit] {
                points[tip] = wrist + dir * 0.05;
            }
        }

        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Vec3; LANDMARK_COUNT] {
        &self.points
    }

    /// Whether digit `(tip, joint)` is extended.
    ///
    /// Compares planar (x, y) distances from the wrist; depth is ignored.
    pub fn is_digit_open(&self, tip: usize, joint: usize) -> bool {
        let wrist = planar(self.points[WRIST]);
        let d_tip = planar(self.points[tip]).distance(wrist);
        let d_joint = planar(self.points[joint]).distance(wrist);
        d_tip > d_joint
    }

    /// Number of extended digits, 0–5.
    pub fn open_digits(&self) -> usize {
        DIGITS
            .iter()
            .filter(|&&(tip, joint)| self.is_digit_open(tip, joint))
            .count()
    }
}

#[inline]
fn planar(p: Vec3) -> Vec2 {
    Vec2::new(p.x, p.y)
}

/// Per-frame classification before debouncing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RawGesture {
    Open,
    Fist,
    /// Neither clearly open nor closed.
    Unresolved,
}

impl RawGesture {
    /// Classify a count of open digits.
    pub fn from_open_digits(open: usize) -> Self {
        if open >= 4 {
            RawGesture::Open
        } else if open <= 1 {
            RawGesture::Fist
        } else {
            RawGesture::Unresolved
        }
    }

    /// Mode this gesture confirms, if any.
    pub fn mode(self) -> Option<Mode> {
        match self {
            RawGesture::Open => Some(Mode::Open),
            RawGesture::Fist => Some(Mode::Tree),
            RawGesture::Unresolved => None,
        }
    }
}

/// A confirmed gesture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GestureEmission {
    pub mode: Mode,
    /// Status line for the UI collaborator.
    pub status: String,
}

impl GestureEmission {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            status: format!("Gesture: {}", mode),
        }
    }
}

/// Debouncing classifier.
///
/// A raw gesture must be observed continuously for `window` before it is
/// emitted. Once confirmed it is emitted again on every further matching
/// frame; [`ModeController::apply`](crate::ModeController::apply) ignores the
/// repeats.
#[derive(Clone, Debug)]
pub struct GestureClassifier {
    window: Duration,
    candidate: Option<(RawGesture, Instant)>,
}

impl GestureClassifier {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            candidate: None,
        }
    }

    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// The gesture currently being timed, if any.
    #[inline]
    pub fn candidate(&self) -> Option<RawGesture> {
        self.candidate.map(|(g, _)| g)
    }

    /// Feed one detector frame taken at `now`.
    ///
    /// `None` means no hand was detected. Malformed frames are skipped the
    /// same way.
    pub fn observe_points(&mut self, points: Option<&[Vec3]>, now: Instant) -> Option<GestureEmission> {
        let points = points?;
        match HandLandmarks::new(points) {
            Ok(hand) => self.observe(Some(&hand), now),
            Err(e) => {
                log::debug!("Skipping landmark frame: {}", e);
                None
            }
        }
    }

    /// Feed one validated frame taken at `now`.
    pub fn observe(&mut self, hand: Option<&HandLandmarks>, now: Instant) -> Option<GestureEmission> {
        let hand = hand?;
        let raw = RawGesture::from_open_digits(hand.open_digits());
        self.observe_raw(raw, now)
    }

    /// Feed one raw classification taken at `now`.
    pub fn observe_raw(&mut self, raw: RawGesture, now: Instant) -> Option<GestureEmission> {
        match self.candidate {
            Some((candidate, since)) if candidate == raw => {
                if now.saturating_duration_since(since) >= self.window {
                    raw.mode().map(GestureEmission::new)
                } else {
                    None
                }
            }
            _ => {
                self.candidate = Some((raw, now));
                None
            }
        }
    }

    /// Forget the current candidate.
    pub fn reset(&mut self) {
        self.candidate = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_posed_hands_count_digits() {
        assert_eq!(HandLandmarks::posed([true; 5]).open_digits(), 5);
        assert_eq!(HandLandmarks::posed([false; 5]).open_digits(), 0);
        assert_eq!(
            HandLandmarks::posed([false, true, true, false, false]).open_digits(),
            2
        );
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(RawGesture::from_open_digits(5), RawGesture::Open);
        assert_eq!(RawGesture::from_open_digits(4), RawGesture::Open);
        assert_eq!(RawGesture::from_open_digits(3), RawGesture::Unresolved);
        assert_eq!(RawGesture::from_open_digits(2), RawGesture::Unresolved);
        assert_eq!(RawGesture::from_open_digits(1), RawGesture::Fist);
        assert_eq!(RawGesture::from_open_digits(0), RawGesture::Fist);
    }

    #[test]
    fn test_planar_distance_ignores_depth() {
        let mut points = HandLandmarks::posed([false; 5]).points().to_vec();
        // Push every curled tip far away in z only; still curled.
        for &(tip, _) in DIGITS.iter() {
            points[tip].z = 10.0;
        }
        let hand = HandLandmarks::new(&points).unwrap();
        assert_eq!(hand.open_digits(), 0);
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert!(matches!(
            HandLandmarks::new(&[Vec3::ZERO; 20]),
            Err(LandmarkError::WrongCount { got: 20, .. })
        ));
        let mut points = [Vec3::ZERO; LANDMARK_COUNT];
        points[7].y = f32::NAN;
        assert_eq!(HandLandmarks::new(&points), Err(LandmarkError::NonFinite { index: 7 }));
    }

    #[test]
    fn test_emits_after_window() {
        let t0 = Instant::now();
        let mut c = GestureClassifier::new(Duration::from_millis(300));
        assert_eq!(c.observe_raw(RawGesture::Fist, t0), None);
        assert_eq!(c.observe_raw(RawGesture::Fist, ms(t0, 150)), None);
        assert_eq!(c.observe_raw(RawGesture::Fist, ms(t0, 299)), None);
        let e = c.observe_raw(RawGesture::Fist, ms(t0, 300)).unwrap();
        assert_eq!(e.mode, Mode::Tree);
        assert_eq!(e.status, "Gesture: FIST");
    }

    #[test]
    fn test_change_resets_timer() {
        let t0 = Instant::now();
        let mut c = GestureClassifier::new(Duration::from_millis(300));
        c.observe_raw(RawGesture::Fist, t0);
        c.observe_raw(RawGesture::Open, ms(t0, 250));
        assert_eq!(c.observe_raw(RawGesture::Open, ms(t0, 400)), None);
        assert!(c.observe_raw(RawGesture::Open, ms(t0, 550)).is_some());
    }

    #[test]
    fn test_unresolved_resets_but_never_emits() {
        let t0 = Instant::now();
        let mut c = GestureClassifier::new(Duration::from_millis(300));
        c.observe_raw(RawGesture::Open, t0);
        c.observe_raw(RawGesture::Unresolved, ms(t0, 100));
        assert_eq!(c.observe_raw(RawGesture::Unresolved, ms(t0, 1000)), None);
        assert_eq!(c.candidate(), Some(RawGesture::Unresolved));
        assert_eq!(c.observe_raw(RawGesture::Open, ms(t0, 1100)), None);
    }

    #[test]
    fn test_no_hand_does_not_touch_state() {
        let t0 = Instant::now();
        let mut c = GestureClassifier::new(Duration::from_millis(300));
        c.observe_raw(RawGesture::Open, t0);
        assert_eq!(c.observe(None, ms(t0, 100)), None);
        assert_eq!(c.observe_points(Some(&[Vec3::ZERO; 3][..]), ms(t0, 200)), None);
        assert_eq!(c.candidate(), Some(RawGesture::Open));
        assert!(c.observe_raw(RawGesture::Open, ms(t0, 300)).is_some());
    }

    #[test]
    fn test_observe_points_classifies_open_hand() {
        let t0 = Instant::now();
        let mut c = GestureClassifier::new(Duration::from_millis(300));
        let open = HandLandmarks::posed([true; 5]);
        assert_eq!(c.observe_points(Some(&open.points()[..]), t0), None);
        let e = c.observe_points(Some(&open.points()[..]), ms(t0, 301)).unwrap();
        assert_eq!(e.mode, Mode::Open);
    }
}

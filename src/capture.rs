//! Landmark capture and the background gesture pipeline.
//!
//! The camera and hand detector are external. They plug in through
//! [`LandmarkSource`]; [`spawn_capture`] runs a source on its own thread,
//! feeds every frame through a [`GestureClassifier`], and publishes confirmed
//! gestures into the [`GestureSender`] latch. Failures never propagate to the
//! render loop: they become status strings on the latch.
//!
//! [`SimulatedHand`] is a scripted source for headless runs and tests.

use crate::error::CaptureError;
use crate::gesture::{GestureClassifier, HandLandmarks};
use crate::latch::GestureSender;
use crate::mode::Mode;
use glam::Vec3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Status shown before the source has started.
pub const STATUS_STARTING: &str = "Starting Camera...";
/// Status shown once the source is delivering frames.
pub const STATUS_ACTIVE: &str = "Camera Active. Looking for hands...";

/// A camera + hand detector.
pub trait LandmarkSource: Send + 'static {
    /// Open the device. Called once, on the capture thread.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Block until the next frame and return its landmarks.
    ///
    /// `Ok(None)` means the frame contained no hand.
    fn next_frame(&mut self) -> Result<Option<Vec<Vec3>>, CaptureError>;
}

/// Classifier plus latch, driven one frame at a time.
#[derive(Debug)]
pub struct CapturePipeline {
    classifier: GestureClassifier,
    sender: GestureSender,
}

impl CapturePipeline {
    pub fn new(window: Duration, sender: GestureSender) -> Self {
        Self {
            classifier: GestureClassifier::new(window),
            sender,
        }
    }

    /// Classify one frame taken at `now` and publish any confirmed gesture.
    pub fn process(&mut self, frame: Option<&[Vec3]>, now: Instant) -> Option<Mode> {
        let emission = self.classifier.observe_points(frame, now)?;
        let mode = emission.mode;
        self.sender.publish(emission);
        Some(mode)
    }

    /// Drive `source` until it ends, `stop` is raised, or the receiver is
    /// dropped.
    pub fn run<S: LandmarkSource>(mut self, mut source: S, stop: &AtomicBool) {
        self.sender.set_status(STATUS_STARTING);
        if let Err(e) = source.start() {
            log::warn!("Landmark capture unavailable: {}", e);
            self.sender.set_status(e.status());
            return;
        }
        log::info!("Landmark capture started");
        self.sender.set_status(STATUS_ACTIVE);

        let mut failures = 0u32;
        while !stop.load(Ordering::Relaxed) && !self.sender.is_closed() {
            match source.next_frame() {
                Ok(frame) => {
                    if failures > 0 {
                        log::info!("Landmark capture recovered after {} failed frames", failures);
                        self.sender.set_status(STATUS_ACTIVE);
                        failures = 0;
                    }
                    self.process(frame.as_deref(), Instant::now());
                }
                Err(CaptureError::Ended) => {
                    log::info!("Landmark capture ended");
                    break;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    if failures == 1 {
                        log::warn!("Landmark frame failed: {}", e);
                        self.sender.set_status(e.status());
                    } else {
                        log::debug!("Landmark frame failed ({} in a row): {}", failures, e);
                    }
                    thread::sleep(failure_backoff(failures));
                }
            }
        }
    }
}

/// Pause after the `failures`-th consecutive frame error: 10 ms, doubling,
/// capped at 500 ms.
pub fn failure_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(6);
    (BACKOFF_BASE * (1 << exponent)).min(BACKOFF_MAX)
}

const BACKOFF_BASE: Duration = Duration::from_millis(10);
const BACKOFF_MAX: Duration = Duration::from_millis(500);

/// Handle to a running capture thread. Dropping it stops and joins the thread.
#[derive(Debug)]
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Ask the thread to stop after its current frame and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// True once the capture thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Landmark capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `source` on a new thread, publishing into `sender`.
pub fn spawn_capture<S: LandmarkSource>(source: S, window: Duration, sender: GestureSender) -> CaptureHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let thread = thread::spawn(move || {
        CapturePipeline::new(window, sender).run(source, &flag);
    });
    CaptureHandle {
        stop,
        thread: Some(thread),
    }
}

/// One segment of a [`SimulatedHand`] script.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseStep {
    /// Extended digits, or `None` for "no hand in view".
    pub pose: Option<[bool; 5]>,
    /// Number of frames the pose is held.
    pub frames: u32,
}

impl PoseStep {
    pub fn open(frames: u32) -> Self {
        Self {
            pose: Some([true; 5]),
            frames,
        }
    }

    pub fn fist(frames: u32) -> Self {
        Self {
            pose: Some([false; 5]),
            frames,
        }
    }

    pub fn absent(frames: u32) -> Self {
        Self { pose: None, frames }
    }
}

/// Scripted landmark source.
///
/// Plays its [`PoseStep`]s in order at a fixed frame interval, optionally
/// looping, and can be told to fail on start to exercise the error path.
#[derive(Clone, Debug)]
pub struct SimulatedHand {
    script: Vec<PoseStep>,
    interval: Duration,
    repeat: bool,
    fail_start: Option<String>,
    step: usize,
    frame_in_step: u32,
}

impl SimulatedHand {
    pub fn new(script: Vec<PoseStep>, interval: Duration) -> Self {
        Self {
            script,
            interval,
            repeat: false,
            fail_start: None,
            step: 0,
            frame_in_step: 0,
        }
    }

    /// Restart the script when it runs out.
    pub fn looping(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// A source whose `start` fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let mut hand = Self::new(Vec::new(), Duration::ZERO);
        hand.fail_start = Some(reason.into());
        hand
    }

    fn next_pose(&mut self) -> Option<Option<[bool; 5]>> {
        loop {
            if self.step >= self.script.len() {
                if !self.repeat || self.script.iter().all(|s| s.frames == 0) {
                    return None;
                }
                self.step = 0;
            }
            let current = self.script[self.step];
            if self.frame_in_step < current.frames {
                self.frame_in_step += 1;
                return Some(current.pose);
            }
            self.step += 1;
            self.frame_in_step = 0;
        }
    }
}

impl LandmarkSource for SimulatedHand {
    fn start(&mut self) -> Result<(), CaptureError> {
        match &self.fail_start {
            Some(reason) => Err(CaptureError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Vec<Vec3>>, CaptureError> {
        let pose = self.next_pose().ok_or(CaptureError::Ended)?;
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
        Ok(pose.map(|open| HandLandmarks::posed(open).points().to_vec()))
    }
}

//! Frame timing.
//!
//! [`FrameClock`] turns the host loop's frame callbacks into the `(t, dt)`
//! pair a tick needs. `dt` is clamped to `max_delta` so that a stalled frame
//! (window drag, debugger, tab switch) cannot hand the integrator a huge step.
//!
//! # Example
//!
//! ```ignore
//! use morphfield::time::FrameClock;
//!
//! let mut clock = FrameClock::new(0.1);
//!
//! // In the render loop:
//! let frame = clock.update();
//! scene.tick(frame.elapsed, frame.delta, &mut buffer);
//! ```

use std::time::{Duration, Instant};

/// Timing values for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock started.
    pub elapsed: f32,
    /// Clamped seconds since the previous frame.
    pub delta: f32,
    /// Unclamped seconds since the previous frame.
    pub raw_delta: f32,
}

/// Elapsed/delta tracking with a delta clamp.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    raw_delta_secs: f32,
    max_delta: f32,
    frame_count: u64,
    /// Frames whose delta had to be clamped.
    hitches: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    /// Fixed delta for deterministic headless runs.
    fixed_delta: Option<f32>,
}

impl FrameClock {
    /// Create a clock starting now. `max_delta` is in seconds.
    pub fn new(max_delta: f32) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            raw_delta_secs: 0.0,
            max_delta,
            frame_count: 0,
            hitches: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            fixed_delta: None,
        }
    }

    /// Sample the wall clock. Call once per rendered frame.
    pub fn update(&mut self) -> FrameTime {
        let now = Instant::now();
        let raw = match self.fixed_delta {
            Some(fixed) => fixed,
            None => now.duration_since(self.last_frame).as_secs_f32(),
        };
        self.last_frame = now;

        if now.duration_since(self.fps_update_time) >= self.fps_update_interval {
            let frames = self.frame_count + 1 - self.fps_frame_count;
            self.fps = frames as f32 / now.duration_since(self.fps_update_time).as_secs_f32();
            self.fps_frame_count = self.frame_count + 1;
            self.fps_update_time = now;
        }

        match self.fixed_delta {
            Some(_) => self.advance(raw),
            None => {
                let elapsed = now.duration_since(self.start).as_secs_f32();
                self.record(raw, elapsed)
            }
        }
    }

    /// Advance by a synthetic delta instead of reading the wall clock.
    ///
    /// Elapsed time accumulates the raw delta, so scene time stays in step
    /// with the host even across hitches.
    pub fn advance(&mut self, raw_delta: f32) -> FrameTime {
        let elapsed = self.elapsed_secs + raw_delta.max(0.0);
        self.record(raw_delta, elapsed)
    }

    fn record(&mut self, raw_delta: f32, elapsed: f32) -> FrameTime {
        let delta = if raw_delta.is_nan() {
            0.0
        } else {
            raw_delta.clamp(0.0, self.max_delta)
        };
        if raw_delta > self.max_delta {
            self.hitches += 1;
        }

        self.raw_delta_secs = raw_delta;
        self.delta_secs = delta;
        self.elapsed_secs = elapsed;
        self.frame_count += 1;

        FrameTime {
            elapsed,
            delta,
            raw_delta,
        }
    }

    /// Seconds since start.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Clamped delta of the last frame.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Unclamped delta of the last frame.
    #[inline]
    pub fn raw_delta(&self) -> f32 {
        self.raw_delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Number of frames whose delta exceeded `max_delta`.
    #[inline]
    pub fn hitches(&self) -> u64 {
        self.hitches
    }

    /// Frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    /// Use a fixed delta on every `update`. `None` restores wall-clock timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }
}

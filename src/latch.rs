//! Single-slot, last-write-wins hand-off from capture to the render tick.
//!
//! The capture pipeline runs at camera rate on its own thread, the kernel
//! ticks at display rate. A queue would let stale gestures pile up, so the
//! pipeline instead overwrites one slot and the tick takes whatever is there
//! (if anything) without ever waiting.
//!
//! ```ignore
//! let (tx, rx) = gesture_latch();
//! tx.publish(GestureEmission::new(Mode::Tree));
//! tx.publish(GestureEmission::new(Mode::Open)); // overwrites
//! assert_eq!(rx.take(), Some(Mode::Open));
//! assert_eq!(rx.take(), None);
//! ```

use crate::gesture::GestureEmission;
use crate::mode::Mode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Slot {
    mode: Option<Mode>,
    status: Option<String>,
    dropped: u64,
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    closed: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // The slot holds plain values; a panic elsewhere cannot leave it
        // half-written, so a poisoned lock is still usable.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Writing end, owned by the capture pipeline.
#[derive(Clone, Debug)]
pub struct GestureSender {
    shared: Arc<Shared>,
}

/// Reading end, owned by the scene.
#[derive(Debug)]
pub struct GestureReceiver {
    shared: Arc<Shared>,
}

/// Create a connected sender/receiver pair.
pub fn gesture_latch() -> (GestureSender, GestureReceiver) {
    let shared = Arc::new(Shared::default());
    (
        GestureSender {
            shared: shared.clone(),
        },
        GestureReceiver { shared },
    )
}

impl GestureSender {
    /// Overwrite the slot with a confirmed gesture and its status line.
    pub fn publish(&self, emission: GestureEmission) {
        let mut slot = self.shared.lock();
        if slot.mode.is_some() {
            slot.dropped += 1;
        }
        slot.mode = Some(emission.mode);
        slot.status = Some(emission.status);
    }

    /// Overwrite the status line only (e.g. capture errors).
    pub fn set_status(&self, status: impl Into<String>) {
        self.shared.lock().status = Some(status.into());
    }

    /// True once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl GestureReceiver {
    /// Take the pending mode, leaving the slot empty. Never blocks on new
    /// input; only contends with a concurrent `publish` for the lock.
    pub fn take(&self) -> Option<Mode> {
        self.shared.lock().mode.take()
    }

    /// Take the pending status line, if it changed since the last call.
    pub fn take_status(&self) -> Option<String> {
        self.shared.lock().status.take()
    }

    /// How many published modes were overwritten before being taken.
    pub fn overwritten(&self) -> u64 {
        self.shared.lock().dropped
    }
}

impl Drop for GestureReceiver {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_latch_yields_nothing() {
        let (_tx, rx) = gesture_latch();
        assert_eq!(rx.take(), None);
        assert_eq!(rx.take_status(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let (tx, rx) = gesture_latch();
        tx.publish(GestureEmission::new(Mode::Tree));
        tx.publish(GestureEmission::new(Mode::Open));
        assert_eq!(rx.take(), Some(Mode::Open));
        assert_eq!(rx.overwritten(), 1);
    }

    #[test]
    fn test_consumed_once() {
        let (tx, rx) = gesture_latch();
        tx.publish(GestureEmission::new(Mode::Tree));
        assert_eq!(rx.take(), Some(Mode::Tree));
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn test_status_is_independent_of_mode() {
        let (tx, rx) = gesture_latch();
        tx.set_status("Camera Error: busy");
        assert_eq!(rx.take(), None);
        assert_eq!(rx.take_status().as_deref(), Some("Camera Error: busy"));
        assert_eq!(rx.take_status(), None);
    }

    #[test]
    fn test_publish_from_other_thread() {
        let (tx, rx) = gesture_latch();
        let handle = thread::spawn(move || {
            for _ in 0..100 {
                tx.publish(GestureEmission::new(Mode::Open));
            }
            tx.publish(GestureEmission::new(Mode::Tree));
        });
        handle.join().unwrap();
        assert_eq!(rx.take(), Some(Mode::Tree));
    }

    #[test]
    fn test_sender_sees_closed_receiver() {
        let (tx, rx) = gesture_latch();
        assert!(!tx.is_closed());
        drop(rx);
        assert!(tx.is_closed());
    }
}

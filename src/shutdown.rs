//! Cooperative stop signal shared by every collector loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest single sleep between two checks of the signal.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Cloneable flag; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleeps until `deadline` in short slices.
    ///
    /// Returns `false` as soon as the signal is seen, `true` once the
    /// deadline is reached.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.is_triggered() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(POLL_SLICE));
        }
    }
}

//! Cooperative interruption flag shared between a signal handler and the loop.

use crate::data::source::Sleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of interruptible sleeps.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop at the next safe point.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early if triggered.
    ///
    /// Returns `true` if the sleep ended because of an interruption.
    pub fn sleep(&self, duration: Duration) -> bool {
        // No representable deadline: wait until triggered.
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.is_triggered() {
                return true;
            }
            let step = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    POLL_INTERVAL.min(deadline - now)
                }
                None => POLL_INTERVAL,
            };
            std::thread::sleep(step);
        }
    }
}

/// Interruptible backoff for ticker-list retries; a triggered flag cancels them.
impl Sleeper for Interrupt {
    fn sleep(&self, duration: Duration) {
        Interrupt::sleep(self, duration);
    }

    fn cancelled(&self) -> bool {
        self.is_triggered()
    }
}

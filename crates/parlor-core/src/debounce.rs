use std::time::Duration;

use tokio::time::Instant;

/// Trailing-edge debouncer.
///
/// Every `push` replaces the pending value and restarts the quiet window;
/// `poll` hands out the last value once the window has elapsed without a
/// newer push. The debouncer owns its deadline, so dropping it cancels any
/// pending emission.
#[derive(Debug)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the window.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.reset(now);
    }

    /// Restart the window without touching the pending value.
    pub fn reset(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop the pending value and disarm.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire if the window has elapsed. Returns `None` when still waiting,
    /// when disarmed, or when the window elapsed with nothing pending.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Like `poll`, for debouncers used purely as a timer.
    pub fn fired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

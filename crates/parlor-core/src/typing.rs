use std::time::Duration;

use tokio::time::Instant;

use parlor_types::models::Status;

use crate::debounce::Debounce;

/// Turns keystroke cadence into at most one `Typing` and one `Online`
/// transition per burst.
#[derive(Debug)]
pub struct TypingSignaler {
    typing: bool,
    quiet: Debounce<()>,
}

impl TypingSignaler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            typing: false,
            quiet: Debounce::new(quiet),
        }
    }

    /// A keystroke. Returns `Typing` on the first keystroke of a burst.
    pub fn on_input(&mut self, now: Instant) -> Option<Status> {
        self.quiet.reset(now);
        if self.typing {
            return None;
        }
        self.typing = true;
        Some(Status::Typing)
    }

    /// Returns `Online` once the quiet interval has passed since the last
    /// keystroke.
    pub fn poll(&mut self, now: Instant) -> Option<Status> {
        if self.typing && self.quiet.fired(now) {
            self.typing = false;
            return Some(Status::Online);
        }
        None
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.quiet.deadline()
    }

    /// Stop tracking the burst without emitting anything.
    pub fn cancel(&mut self) {
        self.typing = false;
        self.quiet.cancel();
    }
}

use std::time::{Duration, Instant};

use crate::document::Canvas;
use crate::error::BoardError;

use super::Store;

/// Debounce window between the last mutation and the save it schedules.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

/// A failing save is retried with exponential backoff up to this many
/// attempts, then the saver gives up and leaves local state dirty.
pub const MAX_SAVE_ATTEMPTS: u32 = 5;

/// What a tick did, for the caller to report.
#[derive(Debug)]
pub enum AutosaveOutcome {
    /// The store accepted the canvas; the returned record carries the
    /// authoritative `modified` timestamp.
    Saved(Canvas),
    /// The save failed. When `gave_up` is false another attempt is already
    /// scheduled; when true the saver stopped retrying until the next
    /// mutation.
    Failed { error: BoardError, gave_up: bool },
}

/// Debounced autosave coalescer.
///
/// Every scene mutation calls [`AutoSaver::schedule`], which starts or
/// resets the timer. [`AutoSaver::tick`] runs on the event loop and fires
/// the save once the timer expires, serializing the canvas at that moment.
/// At most one save runs at a time; a mutation arriving while one runs
/// re-arms the dirty flag and triggers another save afterwards. Failures
/// never touch local scene state.
#[derive(Debug)]
pub struct AutoSaver {
    delay: Duration,
    deadline: Option<Instant>,
    dirty: bool,
    in_flight: bool,
    attempts: u32,
}

impl Default for AutoSaver {
    fn default() -> Self {
        Self::with_delay(AUTOSAVE_DELAY)
    }
}

impl AutoSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            dirty: false,
            in_flight: false,
            attempts: 0,
        }
    }

    /// Note a mutation: mark dirty and restart the debounce window.
    pub fn schedule(&mut self, now: Instant) {
        self.dirty = true;
        self.attempts = 0;
        self.deadline = Some(now + self.delay);
    }

    /// Unsaved changes exist (scheduled, or a save failed).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The debounce window has closed and the next tick will save.
    pub fn due(&self, now: Instant) -> bool {
        self.dirty && !self.in_flight && self.deadline.map(|d| now >= d).unwrap_or(false)
    }

    /// Drop any pending save without writing. Used when the canvas being
    /// tracked ceases to exist.
    pub fn reset(&mut self) {
        self.dirty = false;
        self.deadline = None;
        self.attempts = 0;
    }

    /// Run the timer. Saves when due; otherwise does nothing.
    pub fn tick(
        &mut self,
        now: Instant,
        store: &dyn Store,
        canvas: &Canvas,
    ) -> Option<AutosaveOutcome> {
        if !self.dirty || self.in_flight {
            return None;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => Some(self.save(now, store, canvas)),
            _ => None,
        }
    }

    /// Save immediately if anything is pending. Navigation calls this
    /// before loading another canvas so saves and loads stay ordered.
    pub fn flush(&mut self, store: &dyn Store, canvas: &Canvas) -> Option<AutosaveOutcome> {
        if !self.dirty || self.in_flight {
            return None;
        }
        Some(self.save(Instant::now(), store, canvas))
    }

    fn save(&mut self, now: Instant, store: &dyn Store, canvas: &Canvas) -> AutosaveOutcome {
        self.in_flight = true;
        // Cleared before the call: a mutation landing mid-save re-arms it.
        self.dirty = false;
        self.deadline = None;

        let result = store.save_canvas(canvas);
        self.in_flight = false;

        match result {
            Ok(saved) => {
                self.attempts = 0;
                AutosaveOutcome::Saved(saved)
            }
            Err(error) => {
                self.attempts += 1;
                self.dirty = true;
                if self.attempts >= MAX_SAVE_ATTEMPTS {
                    log::error!(
                        "autosave for {} gave up after {} attempts: {error}",
                        canvas.id,
                        self.attempts
                    );
                    AutosaveOutcome::Failed {
                        error,
                        gave_up: true,
                    }
                } else {
                    // Exponential backoff: delay, 2*delay, 4*delay, ...
                    let backoff = self.delay * 2u32.pow(self.attempts - 1);
                    self.deadline = Some(now + backoff);
                    log::warn!(
                        "autosave for {} failed (attempt {}), retrying in {:?}: {error}",
                        canvas.id,
                        self.attempts,
                        backoff
                    );
                    AutosaveOutcome::Failed {
                        error,
                        gave_up: false,
                    }
                }
            }
        }
    }
}

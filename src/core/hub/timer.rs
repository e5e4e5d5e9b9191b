// src/core/hub/timer.rs

//! A single cancelable delayed action.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// Holds at most one pending delayed action.
///
/// Scheduling replaces any pending action, so actions never stack. Aborting
/// a task cannot stop an action that has already started running, so every
/// schedule is tagged with a generation. An action must check
/// `is_current(generation)` under the owner's lock before doing any work.
/// Cancelling or rescheduling makes all earlier generations stale.
#[derive(Debug, Default)]
pub struct DelayedAction {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl DelayedAction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` after `delay`, cancelling any previously scheduled action.
    /// The action receives its own generation.
    ///
    /// Returns the generation of the new action, or `None` if there is no
    /// Tokio runtime to run the timer on; in that case nothing is scheduled.
    pub fn schedule<F>(&mut self, delay: Duration, action: F) -> Option<u64>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot schedule delayed action without a runtime: {}", e);
                return None;
            }
        };
        let generation = self.generation;
        self.handle = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action(generation);
        }));
        Some(self.generation)
    }

    /// Cancels the pending action. Returns `true` if one was still pending.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.handle.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// True if `generation` is the pending action, i.e. it has been neither
    /// cancelled nor replaced.
    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// The generation of the pending action, if any.
    pub fn pending_generation(&self) -> Option<u64> {
        self.handle.as_ref().map(|_| self.generation)
    }

    /// Forgets the pending action without aborting it. Called from inside the
    /// action itself once it has fired.
    pub fn disarm(&mut self) {
        self.handle = None;
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DelayedAction {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Payment completion handshake.
//!
//! The embedding host makes a zero-argument payment-success callback available
//! at some point after the page loads. The host writes it into a
//! [`CompletionSlot`]; the [`CompletionPoller`] checks the slot on a fixed
//! interval and invokes the callback exactly once. A slot that already holds
//! the callback at start is delivered on the first check.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion callback already injected")]
    AlreadyInjected,
    #[error("completion callback already consumed")]
    AlreadyConsumed,
}

enum SlotState {
    Empty,
    Ready(CompletionCallback),
    Consumed,
}

/// Shared scope the host injects the completion callback into.
#[derive(Clone)]
pub struct CompletionSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl Default for CompletionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.lock() {
            SlotState::Empty => "empty",
            SlotState::Ready(_) => "ready",
            SlotState::Consumed => "consumed",
        };
        f.debug_struct("CompletionSlot").field("state", &state).finish()
    }
}

impl CompletionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState::Empty)),
        }
    }

    /// Makes `callback` available to the poller.
    ///
    /// # Errors
    ///
    /// Returns an error if a callback was already injected or consumed.
    pub fn inject(&self, callback: CompletionCallback) -> Result<(), CompletionError> {
        let mut state = self.lock();
        match *state {
            SlotState::Empty => {
                *state = SlotState::Ready(callback);
                Ok(())
            }
            SlotState::Ready(_) => Err(CompletionError::AlreadyInjected),
            SlotState::Consumed => Err(CompletionError::AlreadyConsumed),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), SlotState::Ready(_))
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        matches!(*self.lock(), SlotState::Consumed)
    }

    /// Takes the callback, leaving the slot consumed. Returns `None` when
    /// nothing was injected yet or the callback is already gone.
    pub fn take(&self) -> Option<CompletionCallback> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, SlotState::Consumed) {
            SlotState::Ready(callback) => Some(callback),
            SlotState::Empty => {
                *state = SlotState::Empty;
                None
            }
            SlotState::Consumed => None,
        }
    }

    /// Invokes the callback now if it is ready. Returns whether it ran.
    pub fn complete(&self) -> bool {
        // The guard is released before the host callback runs.
        let Some(callback) = self.take() else {
            return false;
        };
        info!("payment complete, invoking completion callback");
        callback();
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How a poller run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The callback was invoked on the `polls`-th check.
    Delivered { polls: u64 },
    /// Cancelled after `polls` checks without delivery.
    Cancelled { polls: u64 },
    /// The slot was consumed by someone else; nothing was invoked.
    AlreadyConsumed,
}

/// Fixed-interval poller for the host completion callback.
#[derive(Debug)]
pub struct CompletionPoller {
    slot: CompletionSlot,
    interval: Duration,
    cancel: CancellationToken,
}

impl CompletionPoller {
    #[must_use]
    pub fn new(slot: CompletionSlot, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            slot,
            interval,
            cancel,
        }
    }

    /// Checks the slot until the callback runs or the token is cancelled.
    /// There is no retry limit and no backoff.
    #[instrument(skip_all, fields(interval = ?self.interval))]
    pub async fn run(self) -> PollOutcome {
        let mut polls = 0;

        loop {
            if self.cancel.is_cancelled() {
                debug!(polls, "completion polling cancelled");
                return PollOutcome::Cancelled { polls };
            }

            polls += 1;

            if self.slot.complete() {
                return PollOutcome::Delivered { polls };
            }
            if self.slot.is_consumed() {
                debug!("completion callback already consumed");
                return PollOutcome::AlreadyConsumed;
            }

            debug!(polls, "waiting for payment completion callback");

            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!(polls, "completion polling cancelled");
                    return PollOutcome::Cancelled { polls };
                }
                () = sleep(self.interval) => {}
            }
        }
    }
}

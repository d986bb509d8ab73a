//! Request cancellation
//!
//! A [`CancelToken`] is shared between whoever owns the request and the
//! executor running it. Executors poll it between steps and register an
//! interrupt hook for the statement in flight, so cancelling also aborts a
//! long-running query instead of waiting for it.

use crate::error::ExecutionError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

type InterruptHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    next_hook_id: AtomicU64,
    hooks: Mutex<Vec<(u64, InterruptHook)>>,
}

/// Cheaply clonable cancellation flag
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the request as cancelled and fire every registered hook
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        let hooks = self.state.hooks.lock();
        for (_, hook) in hooks.iter() {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`CancelToken::cancel`] has been called
    pub fn check(&self) -> Result<(), ExecutionError> {
        if self.is_cancelled() {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Register `hook` to run on cancellation for as long as the returned
    /// guard lives.
    ///
    /// A hook registered after cancellation does not fire; callers check
    /// the token after registering.
    pub fn register_interrupt<F>(&self, hook: F) -> InterruptRegistration
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.state.next_hook_id.fetch_add(1, Ordering::Relaxed);
        self.state.hooks.lock().push((id, Box::new(hook)));
        InterruptRegistration {
            state: Arc::clone(&self.state),
            id,
        }
    }
}

/// Removes its interrupt hook when dropped
#[must_use = "the hook is removed as soon as the registration is dropped"]
pub struct InterruptRegistration {
    state: Arc<CancelState>,
    id: u64,
}

impl Drop for InterruptRegistration {
    fn drop(&mut self) {
        self.state.hooks.lock().retain(|(id, _)| *id != self.id);
    }
}

//! Cooperative interruption for blocking queue operations.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

/// Something that parks threads and can wake them to observe an interruption.
pub(crate) trait InterruptWake: Send + Sync {
    /// Wakes every parked thread so it re-checks its token.
    fn wake_waiters(&self);
}

#[derive(Default)]
struct TokenInner {
    interrupted: AtomicBool,
    next_registration: AtomicU64,
    waiters: Mutex<Vec<(u64, Arc<dyn InterruptWake>)>>,
}

/// A cloneable flag that interrupts blocking queue operations.
///
/// Pass the token to [`BoundedBlockingQueue::put`] or
/// [`BoundedBlockingQueue::take`]; calling [`interrupt`](Self::interrupt)
/// from any thread wakes the blocked call, which then fails with
/// [`CollectionError::OperationInterrupted`](crate::CollectionError::OperationInterrupted).
///
/// Interruption is sticky: until [`clear`](Self::clear) is called, every
/// blocking call made with this token fails immediately.
///
/// [`BoundedBlockingQueue::put`]: super::BoundedBlockingQueue::put
/// [`BoundedBlockingQueue::take`]: super::BoundedBlockingQueue::take
///
/// # Examples
///
/// ```rust
/// use itersafe::queue::InterruptToken;
///
/// let token = InterruptToken::new();
/// let handle = token.clone();
/// handle.interrupt();
/// assert!(token.is_interrupted());
/// token.clear();
/// assert!(!handle.is_interrupted());
/// ```
#[derive(Clone, Default)]
pub struct InterruptToken {
    inner: Arc<TokenInner>,
}

impl InterruptToken {
    /// Creates a token that is not interrupted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupts every blocking call using this token, now and until [`clear`](Self::clear).
    pub fn interrupt(&self) {
        self.inner.interrupted.store(true, Ordering::SeqCst);
        let waiters: Vec<Arc<dyn InterruptWake>> = self
            .inner
            .waiters
            .lock()
            .iter()
            .map(|(_, waiter)| Arc::clone(waiter))
            .collect();
        tracing::debug!(waiters = waiters.len(), "interrupt requested");
        for waiter in waiters {
            waiter.wake_waiters();
        }
    }

    /// Returns `true` while the token is interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    /// Resets the token so that it can be reused.
    pub fn clear(&self) {
        self.inner.interrupted.store(false, Ordering::SeqCst);
    }

    /// Registers `waiter` to be woken on interruption until the guard drops.
    ///
    /// Must be called before the caller checks [`is_interrupted`](Self::is_interrupted)
    /// under the waiter's lock, so an interrupt cannot slip between the check
    /// and the wait.
    pub(crate) fn register(&self, waiter: Arc<dyn InterruptWake>) -> Registration<'_> {
        let id = self.inner.next_registration.fetch_add(1, Ordering::Relaxed);
        self.inner.waiters.lock().push((id, waiter));
        Registration { token: self, id }
    }
}

impl fmt::Debug for InterruptToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InterruptToken")
            .field("interrupted", &self.is_interrupted())
            .finish_non_exhaustive()
    }
}

/// Deregisters a waiter from its token on drop.
pub(crate) struct Registration<'a> {
    token: &'a InterruptToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.token.inner.waiters.lock().retain(|(id, _)| *id != self.id);
    }
}

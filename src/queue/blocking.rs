//! Bounded FIFO queue with blocking, timed and non-blocking operations.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::interrupt::{InterruptToken, InterruptWake};
use crate::error::{CollectionError, CollectionResult, Rejected};

struct QueueState<T> {
    items: VecDeque<T>,
    structural_version: u64,
}

impl<T> QueueState<T> {
    fn push(&mut self, value: T) {
        self.items.push_back(value);
        self.structural_version += 1;
    }

    fn pop(&mut self) -> Option<T> {
        let value = self.items.pop_front()?;
        self.structural_version += 1;
        Some(value)
    }
}

struct QueueShared<T> {
    capacity: usize,
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> QueueShared<T> {
    fn has_space(&self, state: &QueueState<T>) -> bool {
        state.items.len() < self.capacity
    }
}

impl<T: Send> InterruptWake for QueueShared<T> {
    fn wake_waiters(&self) {
        // Taking the lock orders this wake after any waiter's flag check.
        let _state = self.state.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

/// A fixed-capacity FIFO queue shared between producers and consumers.
///
/// [`put`](Self::put) blocks while the queue is full and
/// [`take`](Self::take) blocks while it is empty. Every completed put wakes
/// exactly one blocked taker and every completed take wakes exactly one
/// blocked putter. Blocking calls accept an [`InterruptToken`] and fail with
/// [`CollectionError::OperationInterrupted`] when it fires, which is distinct
/// from [`CollectionError::Timeout`] and [`CollectionError::CapacityExceeded`].
///
/// Cloning the queue yields another handle to the same storage.
///
/// # Examples
///
/// ```rust
/// use itersafe::queue::{BoundedBlockingQueue, InterruptToken};
/// use std::thread;
///
/// let queue = BoundedBlockingQueue::new(2).unwrap();
/// let token = InterruptToken::new();
///
/// let producer = {
///     let queue = queue.clone();
///     let token = token.clone();
///     thread::spawn(move || {
///         for value in 1..=3 {
///             queue.put(value, &token).unwrap();
///         }
///     })
/// };
///
/// let consumed: Vec<i32> = (0..3).map(|_| queue.take(&token).unwrap()).collect();
/// producer.join().unwrap();
/// assert_eq!(consumed, vec![1, 2, 3]);
/// ```
pub struct BoundedBlockingQueue<T> {
    shared: Arc<QueueShared<T>>,
}

impl<T> BoundedBlockingQueue<T> {
    /// Creates an empty queue holding at most `capacity` elements.
    ///
    /// # Errors
    ///
    /// [`CollectionError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> CollectionResult<Self> {
        if capacity == 0 {
            return Err(CollectionError::InvalidCapacity { capacity });
        }
        Ok(Self {
            shared: Arc::new(QueueShared {
                capacity,
                state: Mutex::new(QueueState {
                    items: VecDeque::with_capacity(capacity),
                    structural_version: 0,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        })
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns the number of queued elements.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Returns how many more elements fit right now.
    pub fn remaining_capacity(&self) -> usize {
        self.shared.capacity - self.lock().items.len()
    }

    /// Returns the number of completed inserts and removals.
    pub fn structural_version(&self) -> u64 {
        self.lock().structural_version
    }

    /// Appends `value` if there is room, without blocking.
    ///
    /// # Errors
    ///
    /// [`CollectionError::CapacityExceeded`] when full; the value is handed back.
    pub fn offer(&self, value: T) -> Result<(), Rejected<T>> {
        let mut state = self.lock();
        if !self.shared.has_space(&state) {
            return Err(Rejected::new(
                value,
                CollectionError::CapacityExceeded {
                    capacity: self.shared.capacity,
                },
            ));
        }
        state.push(value);
        drop(state);
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Removes the head element without blocking.
    ///
    /// # Errors
    ///
    /// [`CollectionError::EmptyCollection`] when nothing is queued.
    pub fn poll(&self) -> CollectionResult<T> {
        let mut state = self.lock();
        let value = state.pop().ok_or(CollectionError::EmptyCollection)?;
        drop(state);
        self.shared.not_full.notify_one();
        Ok(value)
    }

    /// Returns a copy of the head element.
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.lock().items.front().cloned()
    }

    /// Copies the queued elements in FIFO order.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.lock().items.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.shared.state.lock()
    }
}

impl<T: Send + 'static> BoundedBlockingQueue<T> {
    /// Appends `value`, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// [`CollectionError::OperationInterrupted`] if `token` is or becomes
    /// interrupted before space is available; the value is handed back.
    pub fn put(&self, value: T, token: &InterruptToken) -> Result<(), Rejected<T>> {
        self.put_until(value, None, token)
    }

    /// Appends `value`, blocking at most `timeout` while the queue is full.
    ///
    /// # Errors
    ///
    /// [`CollectionError::Timeout`] when no space appeared in time, or
    /// [`CollectionError::OperationInterrupted`]. The value is handed back.
    pub fn offer_timeout(&self, value: T, timeout: Duration, token: &InterruptToken) -> Result<(), Rejected<T>> {
        self.put_until(value, Instant::now().checked_add(timeout), token)
    }

    /// Removes the head element, blocking while the queue is empty.
    ///
    /// # Errors
    ///
    /// [`CollectionError::OperationInterrupted`] if `token` is or becomes
    /// interrupted before an element is available.
    pub fn take(&self, token: &InterruptToken) -> CollectionResult<T> {
        self.take_until(None, token)
    }

    /// Removes the head element, blocking at most `timeout` while empty.
    ///
    /// # Errors
    ///
    /// [`CollectionError::Timeout`] or [`CollectionError::OperationInterrupted`].
    pub fn poll_timeout(&self, timeout: Duration, token: &InterruptToken) -> CollectionResult<T> {
        self.take_until(Instant::now().checked_add(timeout), token)
    }

    fn put_until(&self, value: T, deadline: Option<Instant>, token: &InterruptToken) -> Result<(), Rejected<T>> {
        if token.is_interrupted() {
            tracing::debug!("put interrupted before waiting");
            return Err(Rejected::new(value, CollectionError::OperationInterrupted));
        }
        let waker: Arc<dyn InterruptWake> = self.shared.clone();
        let _registration = token.register(waker);
        let mut state = self.lock();
        loop {
            if token.is_interrupted() {
                // Hand a pending space signal on to the next putter.
                if self.shared.has_space(&state) {
                    self.shared.not_full.notify_one();
                }
                tracing::debug!("put interrupted while waiting");
                return Err(Rejected::new(value, CollectionError::OperationInterrupted));
            }
            if self.shared.has_space(&state) {
                state.push(value);
                drop(state);
                self.shared.not_empty.notify_one();
                return Ok(());
            }
            match deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    tracing::debug!(capacity = self.shared.capacity, "put timed out");
                    return Err(Rejected::new(value, CollectionError::Timeout));
                }
                Some(deadline) => {
                    tracing::trace!(capacity = self.shared.capacity, "queue full, waiting with deadline");
                    let _ = self.shared.not_full.wait_until(&mut state, deadline);
                }
                None => {
                    tracing::trace!(capacity = self.shared.capacity, "queue full, waiting");
                    self.shared.not_full.wait(&mut state);
                }
            }
        }
    }

    fn take_until(&self, deadline: Option<Instant>, token: &InterruptToken) -> CollectionResult<T> {
        if token.is_interrupted() {
            tracing::debug!("take interrupted before waiting");
            return Err(CollectionError::OperationInterrupted);
        }
        let waker: Arc<dyn InterruptWake> = self.shared.clone();
        let _registration = token.register(waker);
        let mut state = self.lock();
        loop {
            if token.is_interrupted() {
                // Hand a pending element signal on to the next taker.
                if !state.items.is_empty() {
                    self.shared.not_empty.notify_one();
                }
                tracing::debug!("take interrupted while waiting");
                return Err(CollectionError::OperationInterrupted);
            }
            if let Some(value) = state.pop() {
                drop(state);
                self.shared.not_full.notify_one();
                return Ok(value);
            }
            match deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    tracing::debug!("take timed out");
                    return Err(CollectionError::Timeout);
                }
                Some(deadline) => {
                    tracing::trace!("queue empty, waiting with deadline");
                    let _ = self.shared.not_empty.wait_until(&mut state, deadline);
                }
                None => {
                    tracing::trace!("queue empty, waiting");
                    self.shared.not_empty.wait(&mut state);
                }
            }
        }
    }
}

impl<T> Clone for BoundedBlockingQueue<T> {
    /// Returns another handle to the same queue.
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BoundedBlockingQueue<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        formatter
            .debug_struct("BoundedBlockingQueue")
            .field("capacity", &self.shared.capacity)
            .field("items", &state.items)
            .field("structural_version", &state.structural_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(
            BoundedBlockingQueue::<i32>::new(0).unwrap_err(),
            CollectionError::InvalidCapacity { capacity: 0 }
        );
    }

    #[rstest]
    fn test_offer_and_poll_are_fifo() {
        let queue = BoundedBlockingQueue::new(3).unwrap();
        queue.offer(1).unwrap();
        queue.offer(2).unwrap();
        assert_eq!(queue.peek(), Some(1));
        assert_eq!(queue.poll(), Ok(1));
        assert_eq!(queue.poll(), Ok(2));
        assert_eq!(queue.poll(), Err(CollectionError::EmptyCollection));
        assert_eq!(queue.structural_version(), 4);
    }

    #[rstest]
    fn test_offer_on_full_hands_value_back() {
        let queue = BoundedBlockingQueue::new(1).unwrap();
        queue.offer("first").unwrap();
        let rejected = queue.offer("second").unwrap_err();
        assert_eq!(rejected.reason(), &CollectionError::CapacityExceeded { capacity: 1 });
        assert_eq!(rejected.into_inner(), "second");
        assert_eq!(queue.snapshot(), vec!["first"]);
        assert_eq!(queue.structural_version(), 1);
    }

    #[rstest]
    fn test_interrupted_token_fails_fast_even_with_space() {
        let queue = BoundedBlockingQueue::new(1).unwrap();
        let token = InterruptToken::new();
        token.interrupt();
        let rejected = queue.put(5, &token).unwrap_err();
        assert_eq!(rejected.into_parts(), (5, CollectionError::OperationInterrupted));
        assert!(queue.is_empty());
    }

    #[rstest]
    fn test_timeouts_are_distinct_from_interrupts() {
        let queue = BoundedBlockingQueue::new(1).unwrap();
        let token = InterruptToken::new();
        assert_eq!(
            queue.poll_timeout(Duration::from_millis(10), &token),
            Err(CollectionError::Timeout)
        );
        queue.offer(1).unwrap();
        let rejected = queue
            .offer_timeout(2, Duration::from_millis(10), &token)
            .unwrap_err();
        assert_eq!(rejected.reason(), &CollectionError::Timeout);
        assert_eq!(queue.remaining_capacity(), 0);
    }

    #[rstest]
    fn test_huge_timeout_does_not_overflow() {
        let queue = BoundedBlockingQueue::new(1).unwrap();
        queue.offer(7).unwrap();
        let token = InterruptToken::new();
        assert_eq!(queue.poll_timeout(Duration::MAX, &token), Ok(7));
    }
}

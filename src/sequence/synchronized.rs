//! Lock-per-call view over a [`TrackedSequence`].
//!
//! Every single operation on a [`SynchronizedSequence`] takes the view's
//! reentrant mutex for the duration of that call only. Traversal is **not** made safe
//! by this: a [`SynchronizedCursor`] re-locks on each step, so a writer can
//! slip in between two steps and a strict cursor can still report
//! [`CollectionError::ConcurrentStructuralChange`](crate::CollectionError::ConcurrentStructuralChange).
//!
//! To traverse without races, hold the coarse lock returned by
//! [`SynchronizedSequence::lock`] for the whole traversal:
//!
//! ```rust
//! use itersafe::sequence::synchronized_view;
//! use itersafe::IterationMode;
//! use itersafe::sequence::TrackedSequence;
//!
//! let view = synchronized_view(TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]));
//!
//! let guard = view.lock();
//! let total: i32 = guard.iter().map(Result::unwrap).sum();
//! drop(guard);
//!
//! assert_eq!(total, 6);
//! ```

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use super::TrackedSequence;
use crate::error::CollectionResult;
use crate::tracked::{CursorState, IterationMode};

/// Exclusive access to the sequence behind a [`SynchronizedSequence`].
pub type SequenceGuard<'a, T> = ReentrantMutexGuard<'a, TrackedSequence<T>>;

/// Wraps `sequence` in a view that serialises every single call.
///
/// The view takes ownership of the sequence. Clones of the returned view
/// share the same backing store.
pub fn synchronized_view<T>(sequence: TrackedSequence<T>) -> SynchronizedSequence<T> {
    SynchronizedSequence {
        inner: Arc::new(ReentrantMutex::new(sequence)),
    }
}

impl<T> TrackedSequence<T> {
    /// Moves this sequence behind a lock-per-call view. See [`synchronized_view`].
    pub fn into_synchronized(self) -> SynchronizedSequence<T> {
        synchronized_view(self)
    }
}

/// A thread-shareable, lock-per-call view over a [`TrackedSequence`].
///
/// # Caller Obligation
///
/// Only individual calls are atomic. Iterating through
/// [`begin_iteration`](Self::begin_iteration) while other threads mutate the
/// view is racy; hold [`lock`](Self::lock) across the traversal instead.
pub struct SynchronizedSequence<T> {
    inner: Arc<ReentrantMutex<TrackedSequence<T>>>,
}

impl<T> SynchronizedSequence<T> {
    /// Acquires the coarse lock covering the whole sequence.
    ///
    /// While the guard is held no other thread can proceed with a call on any
    /// clone of this view, so a traversal through the guard is race-free. The
    /// lock is reentrant: the holding thread may keep calling the view.
    pub fn lock(&self) -> SequenceGuard<'_, T> {
        self.inner.lock()
    }

    /// Returns the iteration mode of the wrapped sequence.
    pub fn mode(&self) -> IterationMode {
        self.inner.lock().mode()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the sequence holds no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the structural version of the wrapped sequence.
    pub fn structural_version(&self) -> u64 {
        self.inner.lock().structural_version()
    }

    /// Starts a traversal that locks once per step.
    pub fn begin_iteration(&self) -> SynchronizedCursor<'_, T> {
        let sequence = self.inner.lock();
        let state = CursorState::begin(sequence.mode(), &sequence.store());
        drop(sequence);
        tracing::trace!(mode = %state.mode(), "synchronized cursor created");
        SynchronizedCursor {
            view: self,
            state,
            fused: false,
        }
    }

    /// Returns `true` if both views wrap the same backing sequence.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> SynchronizedSequence<T> {
    /// Appends `value` under the lock.
    pub fn insert(&self, value: T) {
        self.inner.lock().insert(value);
    }

    /// Inserts `value` at `position` under the lock.
    ///
    /// # Errors
    ///
    /// As [`TrackedSequence::insert_at`].
    pub fn insert_at(&self, position: usize, value: T) -> CollectionResult<()> {
        self.inner.lock().insert_at(position, value)
    }

    /// Removes the element at `position` under the lock.
    ///
    /// # Errors
    ///
    /// As [`TrackedSequence::remove_at`].
    pub fn remove_at(&self, position: usize) -> CollectionResult<T> {
        self.inner.lock().remove_at(position)
    }

    /// Replaces the element at `position` under the lock.
    ///
    /// # Errors
    ///
    /// As [`TrackedSequence::set`].
    pub fn set(&self, position: usize, value: T) -> CollectionResult<T> {
        self.inner.lock().set(position, value)
    }

    /// Returns a copy of the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.lock().get(index)
    }

    /// Copies the current elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.lock().to_vec()
    }

    /// Removes every element under the lock.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl<T> Clone for SynchronizedSequence<T> {
    /// Returns another handle to the same backing sequence.
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SynchronizedSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("SynchronizedSequence")
            .field(&*self.inner.lock())
            .finish()
    }
}

/// Cursor over a [`SynchronizedSequence`] that locks once per step.
pub struct SynchronizedCursor<'a, T> {
    view: &'a SynchronizedSequence<T>,
    state: CursorState<T>,
    fused: bool,
}

impl<T> SynchronizedCursor<'_, T> {
    /// Returns the mode of this cursor.
    pub const fn mode(&self) -> IterationMode {
        self.state.mode()
    }

    /// Returns `true` if another element is available right now.
    pub fn has_next(&self) -> bool {
        let sequence = self.view.inner.lock();
        let store = sequence.store();
        self.state.has_next(&store)
    }
}

impl<T: Clone> SynchronizedCursor<'_, T> {
    /// Returns the next element under a lock held for this step only.
    ///
    /// # Errors
    ///
    /// As [`Cursor::advance`](super::Cursor::advance).
    pub fn advance(&mut self) -> CollectionResult<Option<T>> {
        let sequence = self.view.inner.lock();
        let store = sequence.store();
        let step = self.state.advance(&store);
        self.fused |= step.is_err();
        step
    }
}

impl<T: Clone> Iterator for SynchronizedCursor<'_, T> {
    type Item = CollectionResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        self.advance().transpose()
    }
}

impl<T: Clone> FusedIterator for SynchronizedCursor<'_, T> {}

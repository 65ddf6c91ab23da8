//! Copy-on-write element buffer with a structural version.

use std::sync::Arc;

use crate::error::{CollectionError, CollectionResult};

/// Ordered element storage plus the structural version that cursors compare.
///
/// The buffer sits behind an `Arc` so that a weakly-consistent cursor can pin
/// it. Mutations go through `Arc::make_mut`, which copies the buffer only
/// while a pinned snapshot is still alive.
///
/// Every method that changes the element count increments the version by
/// exactly one; [`replace`](Self::replace) never does. Failed calls leave
/// both the buffer and the version untouched.
#[derive(Debug, Clone)]
pub(crate) struct TrackedStore<E> {
    elements: Arc<Vec<E>>,
    structural_version: u64,
}

impl<E> TrackedStore<E> {
    pub(crate) fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    pub(crate) fn from_vec(elements: Vec<E>) -> Self {
        Self {
            elements: Arc::new(elements),
            structural_version: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub(crate) const fn structural_version(&self) -> u64 {
        self.structural_version
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&E> {
        self.elements.get(index)
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[E] {
        &self.elements
    }

    /// Pins the current buffer. Later mutations will not be visible through it.
    #[inline]
    pub(crate) fn snapshot(&self) -> Arc<Vec<E>> {
        Arc::clone(&self.elements)
    }

    fn record_structural_change(&mut self) {
        self.structural_version += 1;
    }
}

impl<E: Clone> TrackedStore<E> {
    pub(crate) fn into_vec(self) -> Vec<E> {
        Arc::try_unwrap(self.elements).unwrap_or_else(|shared| shared.as_ref().clone())
    }

    fn elements_mut(&mut self) -> &mut Vec<E> {
        Arc::make_mut(&mut self.elements)
    }

    pub(crate) fn push(&mut self, element: E) {
        self.elements_mut().push(element);
        self.record_structural_change();
    }

    pub(crate) fn insert_at(&mut self, index: usize, element: E) -> CollectionResult<()> {
        let len = self.len();
        if index > len {
            return Err(CollectionError::IndexOutOfRange { index, len });
        }
        self.elements_mut().insert(index, element);
        self.record_structural_change();
        Ok(())
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> CollectionResult<E> {
        self.check_removable(index)?;
        let removed = self.elements_mut().remove(index);
        self.record_structural_change();
        Ok(removed)
    }

    /// Removes the element at `index` and moves the last element into its slot.
    pub(crate) fn swap_remove_at(&mut self, index: usize) -> CollectionResult<E> {
        self.check_removable(index)?;
        let removed = self.elements_mut().swap_remove(index);
        self.record_structural_change();
        Ok(removed)
    }

    /// Overwrites the element at `index`. Not a structural change.
    pub(crate) fn replace(&mut self, index: usize, element: E) -> CollectionResult<E> {
        let len = self.len();
        let slot = self
            .elements_mut()
            .get_mut(index)
            .ok_or(CollectionError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, element))
    }

    /// Removes every element. Counts as one structural change when anything was removed.
    pub(crate) fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        // A pinned snapshot keeps the old buffer; no need to copy it just to empty it.
        match Arc::get_mut(&mut self.elements) {
            Some(elements) => elements.clear(),
            None => self.elements = Arc::new(Vec::new()),
        }
        self.record_structural_change();
    }

    fn check_removable(&self, index: usize) -> CollectionResult<()> {
        let len = self.len();
        if len == 0 {
            return Err(CollectionError::EmptyCollection);
        }
        if index >= len {
            return Err(CollectionError::IndexOutOfRange { index, len });
        }
        Ok(())
    }
}

impl<E> Default for TrackedStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

//! Mode-tagged sequence with structural-version tracking.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::iter::FusedIterator;

use crate::error::CollectionResult;
use crate::tracked::{CursorState, IterationMode, TrackedStore};

/// An ordered sequence that tracks structural modification.
///
/// Mutations take `&self`, so a sequence can be changed while one of its
/// cursors is alive; the cursor's [`IterationMode`] decides what happens
/// next. Elements may repeat, and an "absent" slot is expressed by choosing
/// `Option<T>` as the element type.
///
/// `TrackedSequence` is `Send` but deliberately not `Sync`: a strict sequence
/// provides no cross-thread synchronization of its own. Share one between
/// threads through [`synchronized_view`](super::synchronized_view).
///
/// # Structural Version
///
/// [`structural_version`](Self::structural_version) starts at zero and grows
/// by exactly one on every insert or removal. [`set`](Self::set) replaces a
/// value in place and leaves it unchanged.
///
/// # Examples
///
/// ```rust
/// use itersafe::sequence::TrackedSequence;
/// use itersafe::IterationMode;
///
/// let list = TrackedSequence::new(IterationMode::StrictDetection);
/// list.insert("a");
/// list.insert("c");
/// list.insert_at(1, "b").unwrap();
/// assert_eq!(list.to_vec(), vec!["a", "b", "c"]);
/// assert_eq!(list.structural_version(), 3);
///
/// list.set(0, "A").unwrap();
/// assert_eq!(list.structural_version(), 3);
/// ```
pub struct TrackedSequence<T> {
    mode: IterationMode,
    store: RefCell<TrackedStore<T>>,
}

impl<T> TrackedSequence<T> {
    /// Creates an empty sequence with the given iteration mode.
    pub fn new(mode: IterationMode) -> Self {
        Self::from_store(mode, TrackedStore::new())
    }

    /// Creates an empty sequence with room for `capacity` elements.
    pub fn with_capacity(mode: IterationMode, capacity: usize) -> Self {
        Self::from_store(mode, TrackedStore::with_capacity(capacity))
    }

    /// Creates a sequence holding `elements`, at structural version zero.
    pub fn from_elements<I: IntoIterator<Item = T>>(mode: IterationMode, elements: I) -> Self {
        Self::from_store(mode, TrackedStore::from_vec(elements.into_iter().collect()))
    }

    const fn from_store(mode: IterationMode, store: TrackedStore<T>) -> Self {
        Self {
            mode,
            store: RefCell::new(store),
        }
    }

    /// Returns the iteration mode fixed at construction.
    #[inline]
    pub const fn mode(&self) -> IterationMode {
        self.mode
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.store().len()
    }

    /// Returns `true` if the sequence holds no elements.
    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Returns the number of structural mutations performed so far.
    pub fn structural_version(&self) -> u64 {
        self.store().structural_version()
    }

    /// Starts a traversal.
    ///
    /// In strict mode the cursor captures the current structural version; in
    /// weakly-consistent mode it pins the elements visible right now.
    pub fn begin_iteration(&self) -> Cursor<'_, T> {
        let state = CursorState::begin(self.mode, &self.store());
        tracing::trace!(mode = %self.mode, "sequence cursor created");
        Cursor {
            sequence: self,
            state,
            fused: false,
        }
    }

    /// Alias of [`begin_iteration`](Self::begin_iteration) for `for` loops.
    pub fn iter(&self) -> Cursor<'_, T> {
        self.begin_iteration()
    }

    /// Consumes the sequence and returns its elements.
    pub fn into_vec(self) -> Vec<T>
    where
        T: Clone,
    {
        self.store.into_inner().into_vec()
    }

    pub(crate) fn store(&self) -> Ref<'_, TrackedStore<T>> {
        self.store.borrow()
    }

    fn store_mut(&self) -> RefMut<'_, TrackedStore<T>> {
        self.store.borrow_mut()
    }
}

impl<T: Clone> TrackedSequence<T> {
    /// Returns a copy of the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.store().get(index).cloned()
    }

    /// Returns a copy of the first element.
    pub fn first(&self) -> Option<T> {
        self.store().as_slice().first().cloned()
    }

    /// Returns a copy of the last element.
    pub fn last(&self) -> Option<T> {
        self.store().as_slice().last().cloned()
    }

    /// Returns `true` if an element equal to `value` is present.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.store().as_slice().contains(value)
    }

    /// Copies the current elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.store().as_slice().to_vec()
    }

    /// Appends `value`. Structural.
    pub fn insert(&self, value: T) {
        self.store_mut().push(value);
    }

    /// Inserts `value` at `position`, shifting later elements right. Structural.
    ///
    /// # Errors
    ///
    /// [`CollectionError::IndexOutOfRange`](crate::CollectionError::IndexOutOfRange)
    /// unless `position <= len()`.
    pub fn insert_at(&self, position: usize, value: T) -> CollectionResult<()> {
        self.store_mut().insert_at(position, value)
    }

    /// Removes and returns the element at `position`. Structural.
    ///
    /// # Errors
    ///
    /// [`CollectionError::EmptyCollection`](crate::CollectionError::EmptyCollection)
    /// on an empty sequence, and
    /// [`CollectionError::IndexOutOfRange`](crate::CollectionError::IndexOutOfRange)
    /// when `position >= len()`.
    pub fn remove_at(&self, position: usize) -> CollectionResult<T> {
        self.store_mut().remove_at(position)
    }

    /// Removes the first element equal to `value`.
    ///
    /// Structural only when an element was removed.
    pub fn remove_element(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        let mut store = self.store_mut();
        let Some(index) = store.as_slice().iter().position(|element| element == value) else {
            return false;
        };
        store.remove_at(index).is_ok()
    }

    /// Replaces the element at `position` and returns the old one.
    ///
    /// Not a structural mutation: strict cursors keep working.
    ///
    /// # Errors
    ///
    /// [`CollectionError::IndexOutOfRange`](crate::CollectionError::IndexOutOfRange)
    /// when `position >= len()`.
    pub fn set(&self, position: usize, value: T) -> CollectionResult<T> {
        self.store_mut().replace(position, value)
    }

    /// Removes every element.
    pub fn clear(&self) {
        self.store_mut().clear();
    }
}

impl<T> Default for TrackedSequence<T> {
    fn default() -> Self {
        Self::new(IterationMode::default())
    }
}

impl<T: Clone> Clone for TrackedSequence<T> {
    /// The copy shares the element buffer until either side mutates it.
    fn clone(&self) -> Self {
        Self::from_store(self.mode, self.store().clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for TrackedSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store();
        formatter
            .debug_struct("TrackedSequence")
            .field("mode", &self.mode)
            .field("structural_version", &store.structural_version())
            .field("elements", &store.as_slice())
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for TrackedSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        for (index, element) in self.store().as_slice().iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

impl<T> FromIterator<T> for TrackedSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_elements(IterationMode::default(), iter)
    }
}

impl<T: PartialEq> PartialEq for TrackedSequence<T> {
    /// Compares mode and elements; the structural version is history, not content.
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode && self.store().as_slice() == other.store().as_slice()
    }
}

impl<'a, T: Clone> IntoIterator for &'a TrackedSequence<T> {
    type Item = CollectionResult<T>;
    type IntoIter = Cursor<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.begin_iteration()
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// A traversal handle over a [`TrackedSequence`].
///
/// The cursor borrows its sequence and therefore never outlives it.
///
/// As an [`Iterator`] it yields `Ok(element)` values, then at most one
/// `Err`, then stops. Once [`advance`](Self::advance) has reported an error
/// the iterator yields nothing more, while `advance` keeps reporting it.
pub struct Cursor<'a, T> {
    sequence: &'a TrackedSequence<T>,
    state: CursorState<T>,
    fused: bool,
}

impl<T> Cursor<'_, T> {
    /// Returns the mode of this cursor.
    pub const fn mode(&self) -> IterationMode {
        self.state.mode()
    }

    /// Returns the number of elements this cursor has stepped over.
    pub const fn position(&self) -> usize {
        self.state.position()
    }

    /// Returns `true` if another element is available.
    ///
    /// This only compares positions; a pending structural change is reported
    /// by the next [`advance`](Self::advance), not here.
    pub fn has_next(&self) -> bool {
        self.state.has_next(&self.sequence.store())
    }
}

impl<T: Clone> Cursor<'_, T> {
    /// Returns the next element, or `Ok(None)` once the traversal is complete.
    ///
    /// # Errors
    ///
    /// In strict mode,
    /// [`CollectionError::ConcurrentStructuralChange`](crate::CollectionError::ConcurrentStructuralChange)
    /// when the sequence was structurally modified since this cursor was
    /// created (or since its own last [`remove`](Self::remove)). Weakly
    /// consistent cursors never fail.
    pub fn advance(&mut self) -> CollectionResult<Option<T>> {
        let step = self.state.advance(&self.sequence.store());
        self.fused |= step.is_err();
        step
    }

    /// Removes the element most recently returned by [`advance`](Self::advance).
    ///
    /// The cursor stays valid and continues with the element that followed
    /// the removed one.
    ///
    /// # Errors
    ///
    /// - [`CollectionError::InvalidCursorState`](crate::CollectionError::InvalidCursorState)
    ///   if no element was returned since creation or the last removal
    /// - [`CollectionError::ConcurrentStructuralChange`](crate::CollectionError::ConcurrentStructuralChange)
    ///   if the sequence was modified behind the cursor's back
    /// - [`CollectionError::UnsupportedOperation`](crate::CollectionError::UnsupportedOperation)
    ///   for weakly-consistent cursors
    pub fn remove(&mut self) -> CollectionResult<T> {
        let mut store = self.sequence.store_mut();
        let index = self.state.removal_index(&store)?;
        let removed = store.remove_at(index)?;
        self.state.removal_completed(&store, index);
        Ok(removed)
    }
}

impl<T: Clone> Iterator for Cursor<'_, T> {
    type Item = CollectionResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        self.advance().transpose()
    }
}

impl<T: Clone> FusedIterator for Cursor<'_, T> {}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Cursor")
            .field("mode", &self.state.mode())
            .field("position", &self.state.position())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Serde
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for TrackedSequence<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let store = self.store();
        let mut seq = serializer.serialize_seq(Some(store.len()))?;
        for element in store.as_slice() {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct TrackedSequenceVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for TrackedSequenceVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = TrackedSequence<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        const MAX_PREALLOCATE: usize = 4096;
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOCATE);
        let mut elements = Vec::with_capacity(capacity);
        while let Some(element) = seq.next_element()? {
            elements.push(element);
        }
        Ok(TrackedSequence::from_elements(IterationMode::StrictDetection, elements))
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for TrackedSequence<T>
where
    T: serde::Deserialize<'de>,
{
    /// Deserializes into a fresh strict-mode sequence at version zero.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(TrackedSequenceVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Segment-partitioned concurrent map with weakly consistent traversal.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::DefaultHashBuilder;

/// Segment count used by [`SegmentedMap::new`].
pub const DEFAULT_SEGMENT_COUNT: usize = 16;

/// Upper bound on the segment count.
pub const MAX_SEGMENT_COUNT: usize = 1 << 16;

type Segment<K, V> = RwLock<HashMap<K, V, DefaultHashBuilder>>;

/// A thread-safe map split into independently locked segments.
///
/// Every key lives in exactly one segment, picked from its hash. Writers lock
/// only that segment exclusively and readers lock it shared, so operations on
/// different segments never wait for each other. There is no global lock.
///
/// Traversal through [`iter`](Self::iter) is weakly consistent: it never
/// fails, sees every entry that stays present for the whole traversal exactly
/// once, and may or may not see entries inserted meanwhile.
///
/// # Examples
///
/// ```rust
/// use itersafe::map::SegmentedMap;
/// use std::sync::Arc;
/// use std::thread;
///
/// let map = Arc::new(SegmentedMap::new());
/// map.insert("A".to_string(), 1);
/// map.insert("B".to_string(), 2);
///
/// let writer = {
///     let map = Arc::clone(&map);
///     thread::spawn(move || {
///         for index in 0..5 {
///             map.insert(format!("K{index}"), index);
///         }
///     })
/// };
/// let reader = {
///     let map = Arc::clone(&map);
///     thread::spawn(move || map.iter().count())
/// };
///
/// writer.join().unwrap();
/// let seen = reader.join().unwrap();
/// assert!(seen >= 2);
/// assert_eq!(map.len(), 7);
/// ```
pub struct SegmentedMap<K, V> {
    segments: Box<[Segment<K, V>]>,
    hash_builder: DefaultHashBuilder,
    segment_mask: u64,
    structural_version: AtomicU64,
    len: AtomicUsize,
}

impl<K, V> SegmentedMap<K, V> {
    /// Creates an empty map with [`DEFAULT_SEGMENT_COUNT`] segments.
    pub fn new() -> Self {
        Self::with_segment_count(DEFAULT_SEGMENT_COUNT)
    }

    /// Creates an empty map with at least `segment_count` segments.
    ///
    /// The count is rounded up to a power of two and clamped to
    /// `1..=`[`MAX_SEGMENT_COUNT`].
    pub fn with_segment_count(segment_count: usize) -> Self {
        Self::with_segments_and_capacity(segment_count, 0)
    }

    /// Creates an empty map with room for roughly `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_segments_and_capacity(DEFAULT_SEGMENT_COUNT, capacity)
    }

    /// Creates an empty map with the given segment count and total capacity.
    pub fn with_segments_and_capacity(segment_count: usize, capacity: usize) -> Self {
        let segment_count = segment_count.clamp(1, MAX_SEGMENT_COUNT).next_power_of_two();
        let per_segment = capacity.div_ceil(segment_count);
        let segments = (0..segment_count)
            .map(|_| RwLock::new(HashMap::with_capacity_and_hasher(per_segment, DefaultHashBuilder::default())))
            .collect();
        Self {
            segments,
            hash_builder: DefaultHashBuilder::default(),
            segment_mask: (segment_count - 1) as u64,
            structural_version: AtomicU64::new(0),
            len: AtomicUsize::new(0),
        }
    }

    /// Returns the number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the number of entries.
    ///
    /// Exact when no writer is active; otherwise a value the map held at some
    /// point during the call.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of key-set changes performed so far.
    pub fn structural_version(&self) -> u64 {
        self.structural_version.load(Ordering::Acquire)
    }

    /// Starts a weakly consistent traversal.
    pub fn iter(&self) -> SegmentCursor<'_, K, V> {
        tracing::trace!(segments = self.segments.len(), "segment cursor created");
        SegmentCursor {
            map: self,
            next_segment: 0,
            buffer: Vec::new().into_iter(),
        }
    }

    /// Alias of [`iter`](Self::iter).
    pub fn begin_iteration(&self) -> SegmentCursor<'_, K, V> {
        self.iter()
    }

    /// Must be called while holding the write lock of the changed segment.
    fn record_insertion(&self) {
        self.len.fetch_add(1, Ordering::AcqRel);
        self.structural_version.fetch_add(1, Ordering::AcqRel);
    }

    /// Must be called while holding the write lock of the changed segment.
    fn record_removals(&self, count: usize) {
        self.len.fetch_sub(count, Ordering::AcqRel);
        self.structural_version.fetch_add(1, Ordering::AcqRel);
    }
}

impl<K: Eq + Hash, V> SegmentedMap<K, V> {
    fn segment_for<Q>(&self, key: &Q) -> &Segment<K, V>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        // Bits 32.. route to a segment; the low bits stay free for the
        // segment's own table so keys in one segment do not cluster.
        let hash = self.hash_builder.hash_one(key);
        #[allow(clippy::cast_possible_truncation)]
        let index = ((hash >> 32) & self.segment_mask) as usize;
        &self.segments[index]
    }

    /// Inserts `value` under `key`, returning the previous value if any.
    ///
    /// Structural only when `key` was not present.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let mut segment = self.segment_for(&key).write();
        let previous = segment.insert(key, value);
        if previous.is_none() {
            self.record_insertion();
        }
        previous
    }

    /// Inserts `value` only when `key` is absent.
    ///
    /// Returns a copy of the existing value when the key was already present,
    /// in which case the map is unchanged.
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V>
    where
        V: Clone,
    {
        let mut segment = self.segment_for(&key).write();
        match segment.entry(key) {
            Entry::Occupied(entry) => Some(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(value);
                self.record_insertion();
                None
            }
        }
    }

    /// Combines `value` with the existing value under `key`, or inserts it.
    ///
    /// `remap` runs under the segment's write lock and must not touch this map.
    /// Returns a copy of the value stored afterwards.
    pub fn merge<F>(&self, key: K, value: V, remap: F) -> V
    where
        V: Clone,
        F: FnOnce(&V, V) -> V,
    {
        let mut segment = self.segment_for(&key).write();
        match segment.entry(key) {
            Entry::Occupied(mut entry) => {
                let merged = remap(entry.get(), value);
                entry.insert(merged.clone());
                merged
            }
            Entry::Vacant(entry) => {
                let inserted = entry.insert(value).clone();
                self.record_insertion();
                inserted
            }
        }
    }

    /// Replaces the value under `key` with `update(&current)` if the key exists.
    ///
    /// Not structural. `update` runs under the segment's write lock and must
    /// not touch this map.
    pub fn compute_if_present<Q, F>(&self, key: &Q, update: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
        F: FnOnce(&V) -> V,
    {
        let mut segment = self.segment_for(key).write();
        let slot = segment.get_mut(key)?;
        *slot = update(slot);
        Some(slot.clone())
    }

    /// Removes `key`, returning its value. Structural only when `key` was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut segment = self.segment_for(key).write();
        let removed = segment.remove(key);
        if removed.is_some() {
            self.record_removals(1);
        }
        removed
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.segment_for(key).read().get(key).cloned()
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.segment_for(key).read().contains_key(key)
    }

    /// Removes every entry, one segment at a time.
    ///
    /// Each non-empty segment counts as one structural change. Entries inserted
    /// into an already cleared segment during the call survive.
    pub fn clear(&self) {
        for segment in &self.segments {
            let mut segment = segment.write();
            if !segment.is_empty() {
                let count = segment.len();
                segment.clear();
                self.record_removals(count);
            }
        }
    }
}

impl<K: Clone + Eq + Hash, V: Clone> SegmentedMap<K, V> {
    /// Copies the map, segment by segment, into a standard `HashMap`.
    pub fn to_hash_map(&self) -> HashMap<K, V> {
        self.iter().collect()
    }
}

impl<K, V> Default for SegmentedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for SegmentedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K, V> fmt::Debug for SegmentedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SegmentedMap")
            .field("segments", &self.segments.len())
            .field("len", &self.len())
            .field("structural_version", &self.structural_version())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Weakly consistent cursor over a [`SegmentedMap`].
///
/// Segments are visited in order. Each segment is copied under its read lock
/// the moment the cursor reaches it, then yielded from the copy, so the cursor
/// holds no lock between steps and never fails.
pub struct SegmentCursor<'a, K, V> {
    map: &'a SegmentedMap<K, V>,
    next_segment: usize,
    buffer: std::vec::IntoIter<(K, V)>,
}

impl<K: Clone, V: Clone> SegmentCursor<'_, K, V> {
    /// Returns the next entry, or `None` once every segment was visited.
    pub fn advance(&mut self) -> Option<(K, V)> {
        loop {
            if let Some(entry) = self.buffer.next() {
                return Some(entry);
            }
            let segment = self.map.segments.get(self.next_segment)?;
            self.next_segment += 1;
            let entries: Vec<(K, V)> = segment
                .read()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            self.buffer = entries.into_iter();
        }
    }
}

impl<K, V> SegmentCursor<'_, K, V> {
    /// Returns the number of segments this cursor has started reading.
    pub const fn segments_visited(&self) -> usize {
        self.next_segment
    }
}

impl<K: Clone, V: Clone> Iterator for SegmentCursor<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

impl<K: Clone, V: Clone> FusedIterator for SegmentCursor<'_, K, V> {}

impl<K, V> fmt::Debug for SegmentCursor<'_, K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SegmentCursor")
            .field("next_segment", &self.next_segment)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Mode-tagged map with key-set version tracking.

use std::borrow::Borrow;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::iter::FusedIterator;

use super::DefaultHashBuilder;
use crate::error::CollectionResult;
use crate::tracked::{CursorState, IterationMode, TrackedStore};

/// Entry table plus key index.
///
/// Entries live in slot order in a [`TrackedStore`]; `index` maps each
/// key to its slot. Removal swaps the last entry into the freed slot and
/// repoints its key.
struct MapTable<K, V> {
    entries: TrackedStore<(K, V)>,
    index: HashMap<K, usize, DefaultHashBuilder>,
}

impl<K, V> MapTable<K, V> {
    fn new() -> Self {
        Self {
            entries: TrackedStore::new(),
            index: HashMap::default(),
        }
    }
}

impl<K: Clone + Eq + Hash, V: Clone> MapTable<K, V> {
    fn remove_slot(&mut self, slot: usize) -> CollectionResult<(K, V)> {
        let (key, value) = self.entries.swap_remove_at(slot)?;
        self.index.remove(&key);
        if let Some((moved_key, _)) = self.entries.get(slot)
            && let Some(moved_slot) = self.index.get_mut(moved_key)
        {
            *moved_slot = slot;
        }
        Ok((key, value))
    }
}

/// A key-unique map that tracks structural modification of its key set.
///
/// Inserting a new key or removing an existing one is structural. Replacing
/// the value of an existing key is not, so strict cursors survive it.
///
/// Like [`TrackedSequence`](crate::sequence::TrackedSequence), mutations take
/// `&self` and the map is `Send` but not `Sync`. For a map shared between
/// threads use [`SegmentedMap`](super::SegmentedMap).
///
/// # Examples
///
/// ```rust
/// use itersafe::map::TrackedMap;
/// use itersafe::IterationMode;
///
/// let map = TrackedMap::new(IterationMode::StrictDetection);
/// map.insert(1, "A");
/// map.insert(2, "B");
/// assert_eq!(map.structural_version(), 2);
///
/// // Value-only update
/// assert_eq!(map.insert(1, "a"), Some("A"));
/// assert_eq!(map.structural_version(), 2);
/// ```
pub struct TrackedMap<K, V> {
    mode: IterationMode,
    table: RefCell<MapTable<K, V>>,
}

impl<K, V> TrackedMap<K, V> {
    /// Creates an empty map with the given iteration mode.
    pub fn new(mode: IterationMode) -> Self {
        Self {
            mode,
            table: RefCell::new(MapTable::new()),
        }
    }

    /// Returns the iteration mode fixed at construction.
    #[inline]
    pub const fn mode(&self) -> IterationMode {
        self.mode
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table().entries.is_empty()
    }

    /// Returns the number of key-set changes performed so far.
    pub fn structural_version(&self) -> u64 {
        self.table().entries.structural_version()
    }

    /// Starts a traversal over the entries in slot order.
    pub fn begin_iteration(&self) -> MapCursor<'_, K, V> {
        let state = CursorState::begin(self.mode, &self.table().entries);
        tracing::trace!(mode = %self.mode, "map cursor created");
        MapCursor {
            map: self,
            state,
            fused: false,
        }
    }

    /// Alias of [`begin_iteration`](Self::begin_iteration) for `for` loops.
    pub fn iter(&self) -> MapCursor<'_, K, V> {
        self.begin_iteration()
    }

    fn table(&self) -> Ref<'_, MapTable<K, V>> {
        self.table.borrow()
    }

    fn table_mut(&self) -> RefMut<'_, MapTable<K, V>> {
        self.table.borrow_mut()
    }
}

impl<K: Clone + Eq + Hash, V: Clone> TrackedMap<K, V> {
    /// Builds a map from `entries`. Later duplicates overwrite earlier values.
    ///
    /// The resulting map starts at structural version zero.
    pub fn from_entries<I: IntoIterator<Item = (K, V)>>(mode: IterationMode, entries: I) -> Self {
        let mut contents: Vec<(K, V)> = Vec::new();
        let mut index: HashMap<K, usize, DefaultHashBuilder> = HashMap::default();
        for (key, value) in entries {
            if let Some(&slot) = index.get(&key) {
                contents[slot] = (key, value);
            } else {
                index.insert(key.clone(), contents.len());
                contents.push((key, value));
            }
        }
        Self {
            mode,
            table: RefCell::new(MapTable {
                entries: TrackedStore::from_vec(contents),
                index,
            }),
        }
    }

    /// Inserts `value` under `key`, returning the previous value if any.
    ///
    /// Structural only when `key` was not present.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let mut table = self.table_mut();
        if let Some(&slot) = table.index.get(&key) {
            return table.entries.replace(slot, (key, value)).ok().map(|(_, previous)| previous);
        }
        let slot = table.entries.len();
        table.index.insert(key.clone(), slot);
        table.entries.push((key, value));
        None
    }

    /// Removes `key`, returning its value. Structural only when `key` was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut table = self.table_mut();
        let slot = *table.index.get(key)?;
        table.remove_slot(slot).ok().map(|(_, value)| value)
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let table = self.table();
        let slot = *table.index.get(key)?;
        table.entries.get(slot).map(|(_, value)| value.clone())
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table().index.contains_key(key)
    }

    /// Copies the keys in slot order.
    pub fn keys(&self) -> Vec<K> {
        self.table().entries.as_slice().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Copies the entries in slot order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.table().entries.as_slice().to_vec()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut table = self.table_mut();
        table.entries.clear();
        table.index.clear();
    }
}

impl<K, V> Default for TrackedMap<K, V> {
    fn default() -> Self {
        Self::new(IterationMode::default())
    }
}

impl<K: Clone + Eq + Hash, V: Clone> FromIterator<(K, V)> for TrackedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(IterationMode::default(), iter)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TrackedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table();
        formatter
            .debug_struct("TrackedMap")
            .field("mode", &self.mode)
            .field("structural_version", &table.entries.structural_version())
            .field("entries", &table.entries.as_slice())
            .finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for TrackedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        for (index, (key, value)) in self.table().entries.as_slice().iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}={value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// A traversal handle over a [`TrackedMap`], yielding `(key, value)` copies.
pub struct MapCursor<'a, K, V> {
    map: &'a TrackedMap<K, V>,
    state: CursorState<(K, V)>,
    fused: bool,
}

impl<K, V> MapCursor<'_, K, V> {
    /// Returns the mode of this cursor.
    pub const fn mode(&self) -> IterationMode {
        self.state.mode()
    }

    /// Returns `true` if another entry is available. Does not check the version.
    pub fn has_next(&self) -> bool {
        self.state.has_next(&self.map.table().entries)
    }
}

impl<K: Clone + Eq + Hash, V: Clone> MapCursor<'_, K, V> {
    /// Returns the next entry, or `Ok(None)` once the traversal is complete.
    ///
    /// # Errors
    ///
    /// In strict mode,
    /// [`CollectionError::ConcurrentStructuralChange`](crate::CollectionError::ConcurrentStructuralChange)
    /// when a key was added or removed since the cursor was created.
    pub fn advance(&mut self) -> CollectionResult<Option<(K, V)>> {
        let step = self.state.advance(&self.map.table().entries);
        self.fused |= step.is_err();
        step
    }

    /// Removes the entry most recently returned by [`advance`](Self::advance).
    ///
    /// The entry that was last in the table takes the removed entry's slot;
    /// the cursor visits it next, so no entry is skipped.
    ///
    /// # Errors
    ///
    /// As [`Cursor::remove`](crate::sequence::Cursor::remove).
    pub fn remove(&mut self) -> CollectionResult<(K, V)> {
        let mut table = self.map.table_mut();
        let slot = self.state.removal_index(&table.entries)?;
        let removed = table.remove_slot(slot)?;
        self.state.removal_completed(&table.entries, slot);
        Ok(removed)
    }
}

impl<K: Clone + Eq + Hash, V: Clone> Iterator for MapCursor<'_, K, V> {
    type Item = CollectionResult<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        self.advance().transpose()
    }
}

impl<K: Clone + Eq + Hash, V: Clone> FusedIterator for MapCursor<'_, K, V> {}

// =============================================================================
// Serde
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for TrackedMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let table = self.table();
        let mut map = serializer.serialize_map(Some(table.entries.len()))?;
        for (key, value) in table.entries.as_slice() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct TrackedMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for TrackedMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Eq + Hash,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = TrackedMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut entries = Vec::new();
        while let Some(entry) = access.next_entry()? {
            entries.push(entry);
        }
        Ok(TrackedMap::from_entries(IterationMode::StrictDetection, entries))
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for TrackedMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Eq + Hash,
    V: serde::Deserialize<'de> + Clone,
{
    /// Deserializes into a fresh strict-mode map at version zero.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(TrackedMapVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

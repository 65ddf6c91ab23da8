//! Mutation-tracked maps.
//!
//! - [`TrackedMap`]: single-threaded, mode-tagged map; key insertions and
//!   removals are structural, value replacements are not
//! - [`SegmentedMap`]: thread-safe map partitioned into independently locked
//!   segments, traversed by a weakly consistent [`SegmentCursor`]
//!
//! # Examples
//!
//! ```rust
//! use itersafe::map::{SegmentedMap, TrackedMap};
//! use itersafe::IterationMode;
//!
//! // Fail-fast: adding a key mid-traversal is reported.
//! let map = TrackedMap::from_entries(IterationMode::StrictDetection, [(1, "A"), (2, "B"), (3, "C")]);
//! let outcome: Result<Vec<_>, _> = map
//!     .iter()
//!     .inspect(|entry| {
//!         if matches!(entry, Ok((2, _))) {
//!             map.insert(4, "D");
//!         }
//!     })
//!     .collect();
//! assert!(outcome.is_err());
//! assert_eq!(map.len(), 4);
//!
//! // Fail-safe: the segmented map never reports.
//! let map: SegmentedMap<i32, &str> = [(1, "A"), (2, "B"), (3, "C")].into_iter().collect();
//! for (key, _) in map.iter() {
//!     if key == 2 {
//!         map.insert(4, "D");
//!     }
//! }
//! assert_eq!(map.len(), 4);
//! ```

mod hashing;
mod segmented;
mod tracked;

pub use hashing::DefaultHashBuilder;
pub use segmented::{DEFAULT_SEGMENT_COUNT, MAX_SEGMENT_COUNT, SegmentCursor, SegmentedMap};
pub use tracked::{MapCursor, TrackedMap};

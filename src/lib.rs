//! # itersafe
//!
//! Mutation-tracked collections whose cursors either detect concurrent
//! structural modification (fail-fast) or tolerate it (weakly consistent).
//!
//! ## Overview
//!
//! Every container carries a structural version that advances on each
//! insert or removal. A cursor created in
//! [`IterationMode::StrictDetection`] remembers the version and reports
//! [`CollectionError::ConcurrentStructuralChange`] on the first step after a
//! mismatch. A cursor created in [`IterationMode::WeaklyConsistent`] walks a
//! pinned snapshot instead and never fails.
//!
//! - **Sequences**: [`TrackedSequence`](sequence::TrackedSequence) and its
//!   lock-per-call [`SynchronizedSequence`](sequence::SynchronizedSequence)
//! - **Maps**: [`TrackedMap`](map::TrackedMap) and the segment-locked
//!   [`SegmentedMap`](map::SegmentedMap)
//! - **Queue**: [`BoundedBlockingQueue`](queue::BoundedBlockingQueue) with
//!   blocking, timed and interruptible operations
//!
//! Detection is best-effort. It exists to surface programming errors, not to
//! make unsynchronized sharing safe.
//!
//! ## Feature Flags
//!
//! - `sequence`: tracked and synchronized sequences (default)
//! - `map`: tracked and segmented maps (default)
//! - `queue`: bounded blocking queue (default)
//! - `serde`: `Serialize`/`Deserialize` for sequences and maps
//! - `fxhash`: use `rustc-hash` as the map hasher
//! - `ahash`: use `ahash` as the map hasher
//! - `full`: enable all container features plus `serde`
//!
//! ## Example
//!
//! ```rust
//! use itersafe::prelude::*;
//!
//! let list = TrackedSequence::from_elements(IterationMode::StrictDetection, ["a", "b", "c"]);
//! let mut cursor = list.begin_iteration();
//! assert_eq!(cursor.advance(), Ok(Some("a")));
//! list.remove_at(2).unwrap();
//! assert!(cursor.advance().unwrap_err().is_structural_change());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports the error types, [`IterationMode`] and every enabled container.
///
/// # Usage
///
/// ```rust
/// use itersafe::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CollectionError, CollectionResult, Rejected};
    pub use crate::tracked::IterationMode;

    #[cfg(feature = "sequence")]
    pub use crate::sequence::*;

    #[cfg(feature = "map")]
    pub use crate::map::*;

    #[cfg(feature = "queue")]
    pub use crate::queue::*;
}

pub mod error;
pub mod tracked;

#[cfg(feature = "sequence")]
pub mod sequence;

#[cfg(feature = "map")]
pub mod map;

#[cfg(feature = "queue")]
pub mod queue;

pub use error::{CollectionError, CollectionResult, Rejected};
pub use tracked::IterationMode;

// =============================================================================
// Thread-safety contracts
// =============================================================================

#[cfg(feature = "sequence")]
mod sequence_thread_contracts {
    use crate::sequence::{SynchronizedSequence, TrackedSequence};
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    assert_impl_all!(TrackedSequence<i32>: Send);
    assert_not_impl_any!(TrackedSequence<i32>: Sync);
    assert_impl_all!(SynchronizedSequence<i32>: Send, Sync, Clone);
}

#[cfg(feature = "map")]
mod map_thread_contracts {
    use crate::map::{SegmentedMap, TrackedMap};
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    assert_impl_all!(TrackedMap<i32, i32>: Send);
    assert_not_impl_any!(TrackedMap<i32, i32>: Sync);
    assert_impl_all!(SegmentedMap<i32, i32>: Send, Sync);
}

#[cfg(feature = "queue")]
mod queue_thread_contracts {
    use crate::queue::{BoundedBlockingQueue, InterruptToken};
    use static_assertions::assert_impl_all;

    assert_impl_all!(BoundedBlockingQueue<i32>: Send, Sync, Clone);
    assert_impl_all!(InterruptToken: Send, Sync, Clone);
}

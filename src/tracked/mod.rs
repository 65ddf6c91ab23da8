//! Structural-version tracking shared by every mode-tagged container.
//!
//! A tracked container keeps its elements in a [`TrackedStore`], which pairs
//! a copy-on-write element buffer with a structural version. Cursors are
//! driven by a [`CursorState`] that is either version-bound (strict) or
//! snapshot-bound (weakly consistent), chosen by the container's
//! [`IterationMode`].
//!
//! - **Strict detection**: the cursor captures the structural version when it
//!   is created and compares it before every step. Any insert or removal in
//!   between makes the next step fail with
//!   [`CollectionError::ConcurrentStructuralChange`](crate::CollectionError::ConcurrentStructuralChange).
//! - **Weakly consistent**: the cursor pins the element buffer that was live
//!   when it was created. Later mutations copy the buffer instead of touching
//!   the pinned one, so the cursor never fails and never skips or repeats an
//!   element.
//!
//! Detection is a best-effort diagnostic for misuse, not a synchronization
//! primitive. Code that needs a consistent traversal under concurrent writers
//! must hold a lock for the whole traversal.

#![cfg_attr(not(any(feature = "sequence", feature = "map")), allow(dead_code))]

mod cursor;
mod mode;
mod store;

pub(crate) use cursor::CursorState;
pub use mode::IterationMode;
pub(crate) use store::TrackedStore;

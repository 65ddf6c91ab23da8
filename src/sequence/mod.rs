//! Mutation-tracked sequences.
//!
//! - [`TrackedSequence`]: an ordered, duplicate-friendly sequence whose
//!   cursors are either fail-fast or weakly consistent
//! - [`SynchronizedSequence`]: a lock-per-call view that can be shared
//!   between threads
//!
//! # Examples
//!
//! ## Fail-fast iteration
//!
//! ```rust
//! use itersafe::sequence::TrackedSequence;
//! use itersafe::{CollectionError, IterationMode};
//!
//! let list = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
//! let mut cursor = list.begin_iteration();
//!
//! let mut outcome = Ok(());
//! loop {
//!     match cursor.advance() {
//!         Ok(Some(2)) => list.insert(4),
//!         Ok(Some(_)) => {}
//!         Ok(None) => break,
//!         Err(error) => {
//!             outcome = Err(error);
//!             break;
//!         }
//!     }
//! }
//!
//! assert!(matches!(outcome, Err(CollectionError::ConcurrentStructuralChange { .. })));
//! assert_eq!(list.to_vec(), vec![1, 2, 3, 4]);
//! ```
//!
//! ## Weakly consistent iteration
//!
//! ```rust
//! use itersafe::sequence::TrackedSequence;
//! use itersafe::IterationMode;
//!
//! let list = TrackedSequence::from_elements(IterationMode::WeaklyConsistent, [1, 2, 3]);
//! let mut seen = Vec::new();
//! for element in list.iter() {
//!     let element = element.unwrap();
//!     if element == 2 {
//!         list.insert(4);
//!     }
//!     seen.push(element);
//! }
//!
//! assert_eq!(seen, vec![1, 2, 3]);
//! assert_eq!(list.to_vec(), vec![1, 2, 3, 4]);
//! ```

mod synchronized;
mod tracked;

pub use synchronized::{SequenceGuard, SynchronizedCursor, SynchronizedSequence, synchronized_view};
pub use tracked::{Cursor, TrackedSequence};

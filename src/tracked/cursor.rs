//! Cursor state machine shared by sequence and map cursors.
//!
//! The state is detached from any container borrow: every step is handed the
//! store to read from. That lets the same state drive a cursor that borrows a
//! [`TrackedSequence`](crate::sequence::TrackedSequence) directly and a cursor
//! that re-locks a synchronized view on each step.

use std::sync::Arc;

use super::{IterationMode, TrackedStore};
use crate::error::{CollectionError, CollectionResult};

#[derive(Debug, Clone)]
pub(crate) enum CursorState<E> {
    Strict {
        captured_version: u64,
        position: usize,
        last_returned: Option<usize>,
    },
    WeaklyConsistent {
        snapshot: Arc<Vec<E>>,
        position: usize,
    },
}

impl<E> CursorState<E> {
    pub(crate) fn begin(mode: IterationMode, store: &TrackedStore<E>) -> Self {
        match mode {
            IterationMode::StrictDetection => Self::Strict {
                captured_version: store.structural_version(),
                position: 0,
                last_returned: None,
            },
            IterationMode::WeaklyConsistent => Self::WeaklyConsistent {
                snapshot: store.snapshot(),
                position: 0,
            },
        }
    }

    pub(crate) const fn mode(&self) -> IterationMode {
        match self {
            Self::Strict { .. } => IterationMode::StrictDetection,
            Self::WeaklyConsistent { .. } => IterationMode::WeaklyConsistent,
        }
    }

    pub(crate) const fn position(&self) -> usize {
        match self {
            Self::Strict { position, .. } | Self::WeaklyConsistent { position, .. } => *position,
        }
    }

    /// Element-count comparison only; never checks the version.
    pub(crate) fn has_next(&self, store: &TrackedStore<E>) -> bool {
        match self {
            Self::Strict { position, .. } => *position < store.len(),
            Self::WeaklyConsistent { snapshot, position } => *position < snapshot.len(),
        }
    }

    /// Returns the position of the element to remove through the cursor.
    pub(crate) fn removal_index(&self, store: &TrackedStore<E>) -> CollectionResult<usize> {
        match self {
            Self::Strict {
                captured_version,
                position,
                last_returned,
            } => {
                check_version(*captured_version, store, *position)?;
                last_returned.ok_or(CollectionError::InvalidCursorState)
            }
            Self::WeaklyConsistent { .. } => Err(CollectionError::UnsupportedOperation {
                operation: "remove through a weakly consistent cursor",
            }),
        }
    }

    /// Re-synchronises after the cursor removed the element at `removed_index`.
    ///
    /// Both shifting and swap removal leave the next unvisited element at
    /// `removed_index`, so the position steps back onto it.
    pub(crate) fn removal_completed(&mut self, store: &TrackedStore<E>, removed_index: usize) {
        if let Self::Strict {
            captured_version,
            position,
            last_returned,
        } = self
        {
            *captured_version = store.structural_version();
            *position = removed_index;
            *last_returned = None;
        }
    }
}

impl<E: Clone> CursorState<E> {
    /// Steps the cursor, returning `Ok(None)` at the end of the traversal.
    pub(crate) fn advance(&mut self, store: &TrackedStore<E>) -> CollectionResult<Option<E>> {
        match self {
            Self::Strict {
                captured_version,
                position,
                last_returned,
            } => {
                check_version(*captured_version, store, *position)?;
                let Some(element) = store.get(*position) else {
                    return Ok(None);
                };
                *last_returned = Some(*position);
                *position += 1;
                Ok(Some(element.clone()))
            }
            Self::WeaklyConsistent { snapshot, position } => {
                let element = snapshot.get(*position).cloned();
                if element.is_some() {
                    *position += 1;
                }
                Ok(element)
            }
        }
    }
}

fn check_version<E>(captured_version: u64, store: &TrackedStore<E>, position: usize) -> CollectionResult<()> {
    let found = store.structural_version();
    if found == captured_version {
        return Ok(());
    }
    tracing::debug!(
        expected = captured_version,
        found,
        position,
        "structural change detected during iteration"
    );
    Err(CollectionError::ConcurrentStructuralChange {
        expected: captured_version,
        found,
    })
}

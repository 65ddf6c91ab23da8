//! Error types shared by every collection in this crate.
//!
//! All failures are reported to the immediate caller of the failing
//! operation. None of them is retried internally, and a failed mutation
//! leaves both the backing storage and the structural version exactly as
//! they were before the call.

use thiserror::Error;

/// Errors reported by tracked collections, their cursors and the blocking queue.
///
/// # Examples
///
/// ```rust
/// use itersafe::CollectionError;
///
/// let error = CollectionError::IndexOutOfRange { index: 5, len: 3 };
/// assert_eq!(format!("{error}"), "index 5 out of range for length 3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// A strict cursor observed a structural version different from the one
    /// it captured when it was created.
    ///
    /// The error is local to the cursor. The container stays intact and a
    /// fresh cursor can traverse it immediately.
    #[error("concurrent structural change: cursor expected version {expected}, found {found}")]
    ConcurrentStructuralChange {
        /// Version captured by the cursor.
        expected: u64,
        /// Version the container holds now.
        found: u64,
    },

    /// A positional operation was given a position outside the valid range.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// The rejected position.
        index: usize,
        /// Number of elements at the time of the call.
        len: usize,
    },

    /// A blocking operation was interrupted through its [`InterruptToken`].
    ///
    /// [`InterruptToken`]: crate::queue::InterruptToken
    #[error("operation interrupted")]
    OperationInterrupted,

    /// A removal was attempted on an empty, non-blocking container.
    #[error("collection is empty")]
    EmptyCollection,

    /// A timed operation gave up before it could complete.
    #[error("operation timed out")]
    Timeout,

    /// A non-blocking insert found the container at capacity.
    #[error("capacity of {capacity} exceeded")]
    CapacityExceeded {
        /// The fixed capacity of the container.
        capacity: usize,
    },

    /// A bounded container was constructed with an unusable capacity.
    #[error("invalid capacity {capacity}: must be at least 1")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// A cursor was asked to remove an element, but it has not returned one
    /// since it was created or since its last removal.
    #[error("cursor has no current element")]
    InvalidCursorState,

    /// The operation is not available for this kind of cursor or container.
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation {
        /// Name of the rejected operation.
        operation: &'static str,
    },
}

impl CollectionError {
    /// Returns `true` if this error reports a detected concurrent structural change.
    pub const fn is_structural_change(&self) -> bool {
        matches!(self, Self::ConcurrentStructuralChange { .. })
    }
}

/// Result type for collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// A value that an insert did not consume, handed back with the reason.
///
/// Returned by [`BoundedBlockingQueue::put`] and friends so that a failed
/// insert never drops the caller's value.
///
/// [`BoundedBlockingQueue::put`]: crate::queue::BoundedBlockingQueue::put
///
/// # Examples
///
/// ```rust
/// use itersafe::{CollectionError, Rejected};
///
/// let rejected = Rejected::new(7, CollectionError::Timeout);
/// assert_eq!(rejected.reason(), &CollectionError::Timeout);
/// assert_eq!(rejected.into_inner(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejected<T> {
    value: T,
    reason: CollectionError,
}

impl<T> Rejected<T> {
    /// Wraps a rejected value together with the reason it was rejected.
    pub const fn new(value: T, reason: CollectionError) -> Self {
        Self { value, reason }
    }

    /// Returns the reason the value was rejected.
    pub const fn reason(&self) -> &CollectionError {
        &self.reason
    }

    /// Returns the rejected value.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Splits into the rejected value and the reason.
    pub fn into_parts(self) -> (T, CollectionError) {
        (self.value, self.reason)
    }
}

impl<T> From<Rejected<T>> for CollectionError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        CollectionError::ConcurrentStructuralChange { expected: 3, found: 4 },
        "concurrent structural change: cursor expected version 3, found 4"
    )]
    #[case(CollectionError::IndexOutOfRange { index: 9, len: 2 }, "index 9 out of range for length 2")]
    #[case(CollectionError::OperationInterrupted, "operation interrupted")]
    #[case(CollectionError::EmptyCollection, "collection is empty")]
    #[case(CollectionError::Timeout, "operation timed out")]
    #[case(CollectionError::CapacityExceeded { capacity: 2 }, "capacity of 2 exceeded")]
    #[case(CollectionError::InvalidCapacity { capacity: 0 }, "invalid capacity 0: must be at least 1")]
    #[case(CollectionError::InvalidCursorState, "cursor has no current element")]
    #[case(
        CollectionError::UnsupportedOperation { operation: "remove" },
        "unsupported operation: remove"
    )]
    fn test_display(#[case] error: CollectionError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn test_is_structural_change() {
        assert!(CollectionError::ConcurrentStructuralChange { expected: 0, found: 1 }.is_structural_change());
        assert!(!CollectionError::EmptyCollection.is_structural_change());
    }

    #[rstest]
    fn test_rejected_display_uses_reason() {
        let rejected = Rejected::new("payload", CollectionError::OperationInterrupted);
        assert_eq!(rejected.to_string(), "operation interrupted");
    }

    #[rstest]
    fn test_rejected_into_collection_error() {
        let rejected = Rejected::new(1, CollectionError::CapacityExceeded { capacity: 1 });
        let error: CollectionError = rejected.into();
        assert_eq!(error, CollectionError::CapacityExceeded { capacity: 1 });
    }
}

#![cfg(feature = "sequence")]
//! Integration tests for TrackedSequence.
//!
//! Covers fail-fast detection, weakly consistent traversal, cursor removal
//! and the positional API.

use itersafe::sequence::TrackedSequence;
use itersafe::{CollectionError, IterationMode};
use rstest::rstest;

fn drain_reacting<F>(sequence: &TrackedSequence<i32>, mut react: F) -> (Vec<i32>, Option<CollectionError>)
where
    F: FnMut(&TrackedSequence<i32>, i32),
{
    let mut seen = Vec::new();
    let mut cursor = sequence.begin_iteration();
    loop {
        match cursor.advance() {
            Ok(Some(element)) => {
                seen.push(element);
                react(sequence, element);
            }
            Ok(None) => return (seen, None),
            Err(error) => return (seen, Some(error)),
        }
    }
}

// =============================================================================
// Fail-fast detection
// =============================================================================

#[rstest]
fn test_insert_after_two_fails_next_step_in_strict_mode() {
    let sequence = TrackedSequence::new(IterationMode::StrictDetection);
    sequence.insert(1);
    sequence.insert(2);
    sequence.insert(3);

    let (seen, error) = drain_reacting(&sequence, |sequence, element| {
        if element == 2 {
            sequence.insert(4);
        }
    });

    assert_eq!(seen, vec![1, 2]);
    assert_eq!(
        error,
        Some(CollectionError::ConcurrentStructuralChange { expected: 3, found: 4 })
    );
    assert_eq!(sequence.to_vec(), vec![1, 2, 3, 4]);
}

#[rstest]
#[case::remove_at(|sequence: &TrackedSequence<i32>| { sequence.remove_at(0).unwrap(); })]
#[case::insert_at(|sequence: &TrackedSequence<i32>| sequence.insert_at(1, 9).unwrap())]
#[case::remove_element(|sequence: &TrackedSequence<i32>| { assert!(sequence.remove_element(&3)); })]
#[case::clear(|sequence: &TrackedSequence<i32>| sequence.clear())]
fn test_every_structural_mutation_is_detected(#[case] mutate: fn(&TrackedSequence<i32>)) {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let mut cursor = sequence.begin_iteration();
    assert_eq!(cursor.advance(), Ok(Some(1)));

    mutate(&sequence);

    let error = cursor.advance().unwrap_err();
    assert!(error.is_structural_change());
}

#[rstest]
fn test_same_size_remove_then_insert_is_still_detected() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let mut cursor = sequence.begin_iteration();
    assert_eq!(cursor.advance(), Ok(Some(1)));

    sequence.remove_at(2).unwrap();
    sequence.insert(9);

    assert_eq!(sequence.len(), 3);
    assert_eq!(
        cursor.advance(),
        Err(CollectionError::ConcurrentStructuralChange { expected: 0, found: 2 })
    );
}

#[rstest]
fn test_detection_fires_even_at_the_end_of_traversal() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1]);
    let mut cursor = sequence.begin_iteration();
    assert_eq!(cursor.advance(), Ok(Some(1)));
    sequence.remove_at(0).unwrap();

    assert!(!cursor.has_next());
    assert!(cursor.advance().is_err());
}

#[rstest]
fn test_failed_step_changes_nothing_else() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let mut cursor = sequence.begin_iteration();
    cursor.advance().unwrap();
    sequence.insert(4);
    let version = sequence.structural_version();

    assert!(cursor.advance().is_err());
    assert!(cursor.advance().is_err());

    assert_eq!(sequence.structural_version(), version);
    assert_eq!(sequence.to_vec(), vec![1, 2, 3, 4]);
    assert_eq!(cursor.position(), 1);
}

#[rstest]
fn test_iterator_adapter_yields_error_once_then_stops() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let mut iterator = sequence.iter();
    assert_eq!(iterator.next(), Some(Ok(1)));
    sequence.insert(4);
    assert!(matches!(iterator.next(), Some(Err(_))));
    assert_eq!(iterator.next(), None);
}

#[rstest]
fn test_iterator_stops_after_advance_reported_an_error() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let mut cursor = sequence.begin_iteration();
    cursor.advance().unwrap();
    sequence.remove_at(0).unwrap();

    assert!(cursor.advance().is_err());
    assert_eq!(cursor.next(), None);
    assert!(cursor.advance().is_err());
}

// =============================================================================
// Value overwrites
// =============================================================================

#[rstest]
fn test_overwriting_visited_positions_is_not_structural() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let version = sequence.structural_version();

    let (seen, error) = drain_reacting(&sequence, |sequence, element| {
        let position = usize::try_from(element - 1).unwrap();
        sequence.set(position, element * 10).unwrap();
    });

    assert_eq!(error, None);
    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(sequence.to_vec(), vec![10, 20, 30]);
    assert_eq!(sequence.structural_version(), version);
}

#[rstest]
fn test_set_out_of_range_is_reported() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1]);
    assert_eq!(
        sequence.set(3, 0),
        Err(CollectionError::IndexOutOfRange { index: 3, len: 1 })
    );
}

// =============================================================================
// Weakly consistent traversal
// =============================================================================

#[rstest]
fn test_insert_after_two_never_fails_in_weak_mode() {
    let sequence = TrackedSequence::new(IterationMode::WeaklyConsistent);
    sequence.insert(1);
    sequence.insert(2);
    sequence.insert(3);

    let (seen, error) = drain_reacting(&sequence, |sequence, element| {
        if element == 2 {
            sequence.insert(4);
        }
    });

    assert_eq!(error, None);
    assert_eq!(&seen[..3], &[1, 2, 3]);
    assert!(seen.len() <= 4);
    assert_eq!(sequence.to_vec(), vec![1, 2, 3, 4]);
}

#[rstest]
fn test_weak_cursor_survives_removal_of_unvisited_elements() {
    let sequence = TrackedSequence::from_elements(IterationMode::WeaklyConsistent, [1, 2, 3, 4]);
    let (seen, error) = drain_reacting(&sequence, |sequence, element| {
        if element == 1 {
            sequence.clear();
        }
    });

    assert_eq!(error, None);
    assert_eq!(seen, vec![1, 2, 3, 4]);
    assert!(sequence.is_empty());
}

#[rstest]
fn test_weak_cursor_rejects_remove() {
    let sequence = TrackedSequence::from_elements(IterationMode::WeaklyConsistent, [1, 2]);
    let mut cursor = sequence.begin_iteration();
    cursor.advance().unwrap();
    assert!(matches!(
        cursor.remove(),
        Err(CollectionError::UnsupportedOperation { .. })
    ));
    assert_eq!(sequence.len(), 2);
}

// =============================================================================
// Cursor removal
// =============================================================================

#[rstest]
fn test_cursor_remove_filters_without_tripping_detection() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, 1..=10);
    let mut cursor = sequence.begin_iteration();
    while let Some(element) = cursor.advance().unwrap() {
        if element % 2 == 0 {
            assert_eq!(cursor.remove(), Ok(element));
        }
    }
    assert_eq!(sequence.to_vec(), vec![1, 3, 5, 7, 9]);
    assert_eq!(sequence.structural_version(), 5);
}

#[rstest]
fn test_cursor_remove_requires_a_returned_element() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2]);
    let mut cursor = sequence.begin_iteration();
    assert_eq!(cursor.remove(), Err(CollectionError::InvalidCursorState));
    cursor.advance().unwrap();
    cursor.remove().unwrap();
    assert_eq!(cursor.remove(), Err(CollectionError::InvalidCursorState));
}

#[rstest]
fn test_cursor_remove_after_foreign_change_is_detected() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let mut cursor = sequence.begin_iteration();
    cursor.advance().unwrap();
    sequence.insert(4);
    assert!(cursor.remove().unwrap_err().is_structural_change());
    assert_eq!(sequence.len(), 4);
}

// =============================================================================
// Positional API
// =============================================================================

#[rstest]
fn test_remove_at_on_empty_reports_empty_collection() {
    let sequence: TrackedSequence<i32> = TrackedSequence::default();
    assert_eq!(sequence.remove_at(0), Err(CollectionError::EmptyCollection));
    assert_eq!(sequence.structural_version(), 0);
}

#[rstest]
#[case(0, vec![9, 1, 2])]
#[case(1, vec![1, 9, 2])]
#[case(2, vec![1, 2, 9])]
fn test_insert_at_positions(#[case] position: usize, #[case] expected: Vec<i32>) {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2]);
    sequence.insert_at(position, 9).unwrap();
    assert_eq!(sequence.to_vec(), expected);
}

#[rstest]
fn test_insert_at_past_end_leaves_sequence_untouched() {
    let sequence = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2]);
    assert_eq!(
        sequence.insert_at(5, 9),
        Err(CollectionError::IndexOutOfRange { index: 5, len: 2 })
    );
    assert_eq!(sequence.structural_version(), 0);
    assert_eq!(sequence.to_vec(), vec![1, 2]);
}

#[rstest]
fn test_clear_on_empty_is_not_structural() {
    let sequence: TrackedSequence<i32> = TrackedSequence::new(IterationMode::StrictDetection);
    sequence.clear();
    assert_eq!(sequence.structural_version(), 0);
}

#[rstest]
fn test_display_and_equality() {
    let left = TrackedSequence::from_elements(IterationMode::StrictDetection, [1, 2, 3]);
    let right: TrackedSequence<i32> = [1, 2, 3].into_iter().collect();
    assert_eq!(left, right);
    assert_eq!(left.to_string(), "[1, 2, 3]");
    assert_eq!(left.first(), Some(1));
    assert_eq!(left.last(), Some(3));
    assert!(left.contains(&2));
}

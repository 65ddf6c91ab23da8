#![cfg(feature = "sequence")]
//! Integration tests for the synchronized sequence view.

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use itersafe::sequence::{SynchronizedSequence, TrackedSequence, synchronized_view};
use itersafe::{CollectionError, IterationMode};
use rstest::rstest;

fn shared(mode: IterationMode, elements: impl IntoIterator<Item = i32>) -> SynchronizedSequence<i32> {
    synchronized_view(TrackedSequence::from_elements(mode, elements))
}

// =============================================================================
// Single-call atomicity
// =============================================================================

#[rstest]
fn test_concurrent_inserts_are_all_recorded() {
    let view = shared(IterationMode::StrictDetection, Vec::new());
    let handles: Vec<_> = (0..8)
        .map(|thread_index| {
            let view = view.clone();
            thread::spawn(move || {
                for value in 0..250 {
                    view.insert(thread_index * 1000 + value);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(view.len(), 2000);
    assert_eq!(view.structural_version(), 2000);
}

#[rstest]
fn test_clones_share_storage() {
    let view = shared(IterationMode::StrictDetection, [1]);
    let other = view.clone();
    other.insert(2);
    assert!(view.ptr_eq(&other));
    assert_eq!(view.to_vec(), vec![1, 2]);
    assert_eq!(view.get(1), Some(2));
}

#[rstest]
fn test_positional_errors_pass_through() {
    let view = shared(IterationMode::StrictDetection, Vec::new());
    assert_eq!(view.remove_at(0), Err(CollectionError::EmptyCollection));
    assert_eq!(
        view.insert_at(2, 1),
        Err(CollectionError::IndexOutOfRange { index: 2, len: 0 })
    );
}

// =============================================================================
// Traversal
// =============================================================================

#[rstest]
fn test_lock_per_step_cursor_still_detects_foreign_writes() {
    let view = shared(IterationMode::StrictDetection, [1, 2, 3]);
    let mut cursor = view.begin_iteration();
    assert_eq!(cursor.advance(), Ok(Some(1)));

    let writer = view.clone();
    thread::spawn(move || writer.insert(4)).join().unwrap();

    assert!(cursor.advance().unwrap_err().is_structural_change());
    assert_eq!(cursor.next(), None);
}

#[rstest]
fn test_weak_view_cursor_walks_snapshot() {
    let view = shared(IterationMode::WeaklyConsistent, [1, 2, 3]);
    let mut seen = Vec::new();
    for element in view.begin_iteration() {
        let element = element.unwrap();
        if element == 1 {
            view.remove_at(2).unwrap();
        }
        seen.push(element);
    }
    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(view.to_vec(), vec![1, 2]);
}

#[rstest]
fn test_coarse_lock_excludes_writers_for_whole_traversal() {
    let view = shared(IterationMode::StrictDetection, 0..100);
    let barrier = Arc::new(Barrier::new(2));

    let guard = view.lock();
    let writer = {
        let view = view.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            view.insert(100);
        })
    };
    barrier.wait();

    let total: i32 = guard.iter().map(Result::unwrap).sum();
    assert_eq!(total, (0..100).sum());
    drop(guard);

    writer.join().unwrap();
    assert_eq!(view.len(), 101);
}

#[rstest]
fn test_thread_holding_coarse_lock_can_keep_using_the_view() {
    let view = shared(IterationMode::StrictDetection, [1, 2, 3, 4]);
    let (sender, receiver) = mpsc::channel();

    let worker = {
        let view = view.clone();
        thread::spawn(move || {
            let guard = view.lock();
            let mut observed = Vec::new();
            for element in guard.iter() {
                if element.unwrap() == 3 {
                    observed.push(view.len());
                    observed.push(usize::try_from(view.get(0).unwrap()).unwrap());
                }
            }
            drop(guard);
            view.insert(5);
            sender.send(observed).unwrap();
        })
    };

    let observed = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    worker.join().unwrap();
    assert_eq!(observed, vec![4, 1]);
    assert_eq!(view.len(), 5);
}

#[rstest]
fn test_insert_under_coarse_lock_is_seen_by_the_guard_cursor() {
    let view = shared(IterationMode::StrictDetection, [1, 2]);
    let guard = view.lock();
    let mut cursor = guard.begin_iteration();
    assert_eq!(cursor.advance(), Ok(Some(1)));
    view.insert(3);
    assert!(cursor.advance().unwrap_err().is_structural_change());
    drop(cursor);
    drop(guard);
    assert_eq!(view.to_vec(), vec![1, 2, 3]);
}

#[rstest]
fn test_into_synchronized_keeps_mode() {
    let view = TrackedSequence::from_elements(IterationMode::WeaklyConsistent, [1]).into_synchronized();
    assert_eq!(view.mode(), IterationMode::WeaklyConsistent);
    assert!(!view.is_empty());
    view.clear();
    assert!(view.is_empty());
}

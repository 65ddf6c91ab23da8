#![cfg(all(feature = "serde", feature = "sequence", feature = "map"))]

//! Integration tests for serde support in itersafe.
//!
//! Containers serialize as their plain elements and deserialize into a fresh
//! strict-mode container.

use itersafe::IterationMode;
use itersafe::map::TrackedMap;
use itersafe::sequence::TrackedSequence;
use rstest::rstest;

// =============================================================================
// TrackedSequence
// =============================================================================

#[rstest]
fn test_sequence_serializes_as_json_array() {
    let sequence = TrackedSequence::from_elements(IterationMode::WeaklyConsistent, [1, 2, 3]);
    sequence.insert(4);
    assert_eq!(serde_json::to_string(&sequence).unwrap(), "[1,2,3,4]");
}

#[rstest]
fn test_sequence_deserializes_fresh_and_strict() {
    let sequence: TrackedSequence<String> = serde_json::from_str(r#"["a","b"]"#).unwrap();
    assert_eq!(sequence.to_vec(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(sequence.mode(), IterationMode::StrictDetection);
    assert_eq!(sequence.structural_version(), 0);
}

#[rstest]
fn test_sequence_rejects_non_array() {
    let result: Result<TrackedSequence<i32>, _> = serde_json::from_str(r#"{"a":1}"#);
    assert!(result.is_err());
}

// =============================================================================
// TrackedMap
// =============================================================================

#[rstest]
fn test_map_json_roundtrip() {
    let map = TrackedMap::from_entries(
        IterationMode::WeaklyConsistent,
        [("one".to_string(), 1), ("two".to_string(), 2)],
    );
    map.remove("one");

    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"two":2}"#);

    let restored: TrackedMap<String, i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.entries(), map.entries());
    assert_eq!(restored.mode(), IterationMode::StrictDetection);
    assert_eq!(restored.structural_version(), 0);
}

#[rstest]
fn test_map_duplicate_keys_keep_last_value() {
    let map: TrackedMap<String, i32> = serde_json::from_str(r#"{"k":1,"k":2}"#).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("k"), Some(2));
}

// =============================================================================
// IterationMode
// =============================================================================

#[rstest]
#[case(IterationMode::StrictDetection, r#""StrictDetection""#)]
#[case(IterationMode::WeaklyConsistent, r#""WeaklyConsistent""#)]
fn test_mode_serializes_as_variant_name(#[case] mode: IterationMode, #[case] expected: &str) {
    assert_eq!(serde_json::to_string(&mode).unwrap(), expected);
    let restored: IterationMode = serde_json::from_str(expected).unwrap();
    assert_eq!(restored, mode);
}

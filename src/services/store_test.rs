use super::*;
use crate::state::test_helpers::stroke;

fn ids(shapes: &[Shape]) -> Vec<&str> {
    shapes.iter().map(|s| s.id.as_str()).collect()
}

#[test]
fn snapshot_preserves_insertion_order() {
    let mut store = ShapeStore::new();
    for id in ["c", "a", "b"] {
        store.upsert(stroke(id));
    }
    assert_eq!(ids(&store.snapshot()), ["c", "a", "b"]);
}

#[test]
fn upsert_overrides_client_timestamp() {
    let mut store = ShapeStore::new();
    let mut shape = stroke("s1");
    shape.timestamp = 1;

    let stored = store.upsert_at(shape, 5_000);

    assert_eq!(stored.timestamp, 5_000);
    assert_eq!(store.get("s1").unwrap().timestamp, 5_000);
}

#[test]
fn upsert_existing_id_keeps_position_and_replaces_record() {
    let mut store = ShapeStore::new();
    store.upsert_at(stroke("a"), 1);
    store.upsert_at(stroke("b"), 2);
    store.upsert_at(stroke("a").with_points(vec![1.0, 1.0]), 3);

    assert_eq!(store.len(), 2);
    let snapshot = store.snapshot();
    assert_eq!(ids(&snapshot), ["a", "b"]);
    assert_eq!(snapshot[0].points, vec![1.0, 1.0]);
    assert_eq!(snapshot[0].timestamp, 3);
}

#[test]
fn remove_keeps_remaining_order() {
    let mut store = ShapeStore::new();
    for id in ["a", "b", "c"] {
        store.upsert(stroke(id));
    }

    let removed = store.remove("b").unwrap();

    assert_eq!(removed.id, "b");
    assert!(!store.contains("b"));
    assert_eq!(ids(&store.snapshot()), ["a", "c"]);
}

#[test]
fn remove_unknown_id_is_none() {
    let mut store = ShapeStore::new();
    assert!(store.remove("missing").is_none());
}

#[test]
fn drain_empties_store_in_order() {
    let mut store = ShapeStore::new();
    store.upsert(stroke("a"));
    store.upsert(stroke("b"));

    let drained = store.drain();

    assert_eq!(ids(&drained), ["a", "b"]);
    assert!(store.is_empty());
}

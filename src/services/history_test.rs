use super::*;
use crate::state::test_helpers::stroke;

#[test]
fn record_within_capacity_drops_nothing() {
    let mut history = History::new(2);
    assert!(history.record(HistoryEntry::Draw(stroke("a"))).is_none());
    assert!(history.record(HistoryEntry::Draw(stroke("b"))).is_none());
    assert_eq!(history.len(), 2);
}

#[test]
fn overflow_evicts_oldest_from_front() {
    let mut history = History::new(2);
    history.record(HistoryEntry::Draw(stroke("a")));
    history.record(HistoryEntry::Draw(stroke("b")));

    let dropped = history.record(HistoryEntry::Draw(stroke("c")));

    assert_eq!(dropped, Some(HistoryEntry::Draw(stroke("a"))));
    assert_eq!(history.len(), 2);
}

#[test]
fn pop_is_lifo() {
    let mut history = History::new(2);
    history.record(HistoryEntry::Draw(stroke("a")));
    history.record(HistoryEntry::Delete(stroke("b")));

    assert_eq!(history.pop(), Some(HistoryEntry::Delete(stroke("b"))));
    assert_eq!(history.pop(), Some(HistoryEntry::Draw(stroke("a"))));
    assert_eq!(history.pop(), None);
}

#[test]
fn length_never_exceeds_capacity() {
    let mut history = History::new(2);
    for i in 0..20 {
        let entry = match i % 3 {
            0 => HistoryEntry::Draw(stroke("x")),
            1 => HistoryEntry::Delete(stroke("y")),
            _ => HistoryEntry::Clear(vec![stroke("z")]),
        };
        history.record(entry);
        assert!(history.len() <= 2);
        if i % 4 == 0 {
            history.pop();
        }
    }
}

#[test]
fn zero_capacity_retains_nothing() {
    let mut history = History::new(0);
    let dropped = history.record(HistoryEntry::Clear(Vec::new()));
    assert_eq!(dropped, Some(HistoryEntry::Clear(Vec::new())));
    assert!(history.is_empty());
}

#[test]
fn labels_name_entry_kinds() {
    assert_eq!(HistoryEntry::Draw(stroke("a")).label(), "draw");
    assert_eq!(HistoryEntry::Delete(stroke("a")).label(), "delete");
    assert_eq!(HistoryEntry::Clear(Vec::new()).label(), "clear");
}

#[test]
fn huge_capacity_does_not_preallocate() {
    let mut history = History::new(usize::MAX);
    assert!(history.record(HistoryEntry::Draw(stroke("a"))).is_none());
    assert_eq!(history.len(), 1);
    assert_eq!(history.capacity(), usize::MAX);
    assert_eq!(history.pop(), Some(HistoryEntry::Draw(stroke("a"))));
}

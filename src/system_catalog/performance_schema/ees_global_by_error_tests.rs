use super::*;
use crate::instrument::{ErrorCatalog, ErrorClass, ErrorStat};
use crate::position::DoubleIndexPos;
use crate::row::{field, FieldValue};
use chrono::{DateTime, Utc};
use std::sync::Arc;

const ALL_FIELDS: [usize; 7] = [0, 1, 2, 3, 4, 5, 6];

fn store_with(items: &[u32]) -> SharedErrorStore {
    let classes = items
        .iter()
        .enumerate()
        .map(|(i, n)| ErrorClass { index: i as u32, name: format!("class{}", i), items: *n })
        .collect();
    ErrorStore::new(classes, Arc::new(ErrorCatalog::builtin().clone())).shared()
}

fn opened(store: &SharedErrorStore) -> TableEesGlobalByError {
    let mut t = TableEesGlobalByError::new(Arc::clone(store));
    t.init(true).unwrap();
    t
}

fn scan_positions(t: &mut TableEesGlobalByError) -> Vec<DoubleIndexPos> {
    let mut out = Vec::new();
    loop {
        match t.next() {
            Ok(()) => out.push(t.position().to_pos()),
            Err(TableError::EndOfData) => break,
            Err(e) => panic!("unexpected scan error: {}", e),
        }
    }
    out
}

#[test]
fn three_item_class_without_data() {
    let store = store_with(&[3]);
    let mut t = opened(&store);
    t.reset_position();

    let mut out = OutputRow::new(field::COUNT);
    for item in 0..3u32 {
        t.next().unwrap();
        assert_eq!(t.position().to_pos(), DoubleIndexPos::new(0, item));
        assert_eq!(t.row().row().stat, ErrorStat::default());
        t.read_row_values(&mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
        assert_eq!(out.value(field::SUM_ERROR_RAISED), Some(&FieldValue::UInt(0)));
        // slot 0 is the unmapped bucket; 1 and 2 resolve through the name table
        assert_eq!(out.is_null(field::ERROR_NAME), item == 0);
    }
    assert_eq!(t.next(), Err(TableError::EndOfData));
    assert_eq!(t.state(), ScanState::Exhausted);
    assert!(!t.row_exists());
}

#[test]
fn full_scan_is_class_major_and_skips_empty_classes() {
    let store = store_with(&[2, 0, 3]);
    let mut t = opened(&store);
    let seen = scan_positions(&mut t);
    assert_eq!(
        seen,
        vec![
            DoubleIndexPos::new(0, 0),
            DoubleIndexPos::new(0, 1),
            DoubleIndexPos::new(2, 0),
            DoubleIndexPos::new(2, 1),
            DoubleIndexPos::new(2, 2),
        ]
    );
    // repeated next() after exhaustion stays at end of data
    assert_eq!(t.next(), Err(TableError::EndOfData));
}

#[test]
fn seek_reproduces_row_from_scan() {
    let store = store_with(&[5]);
    store.register_thread(1, Some("app"), Some("db1"));
    store.record_error_at(1, 0, 3, true, 1_000);
    store.record_error_at(42, 0, 3, false, 2_000);

    let mut t = opened(&store);
    let mut token = None;
    let mut expected = ErrorStat::default();
    while t.next().is_ok() {
        if t.position().to_pos().item_index == 3 {
            token = Some(t.position());
            expected = t.row().row().stat;
        }
    }
    assert_eq!(expected, ErrorStat { count: 2, handled_count: 1, first_seen: 1_000, last_seen: 2_000 });

    let token = token.unwrap();
    t.seek_and_fetch(&token).unwrap();
    assert!(t.row_exists());
    assert_eq!(t.row().row().stat, expected);
    assert_eq!(t.row().row().error_index, 3);
}

#[test]
fn seek_past_class_count_is_row_deleted() {
    let store = store_with(&[3]);
    let mut t = opened(&store);
    let token = PositionToken::from_pos(&DoubleIndexPos::new(1, 0));
    assert_eq!(t.seek_and_fetch(&token), Err(TableError::RowDeleted));
    assert!(!t.row_exists());

    let mut out = OutputRow::new(field::COUNT);
    assert_eq!(
        t.read_row_values(&mut out, &ALL_FIELDS, &ColumnMask::none(), true),
        Err(TableError::RowUnavailable)
    );
}

#[test]
fn seek_past_item_bound_is_row_deleted() {
    let store = store_with(&[3]);
    let mut t = opened(&store);
    t.next().unwrap();
    assert!(t.row_exists());
    let token = PositionToken::from_pos(&DoubleIndexPos::new(0, 3));
    assert_eq!(t.seek_and_fetch(&token), Err(TableError::RowDeleted));
    assert!(!t.row_exists());
}

#[test]
fn next_resumes_after_sought_row() {
    let store = store_with(&[4, 2]);
    let mut t = opened(&store);
    t.seek_and_fetch(&PositionToken::from_pos(&DoubleIndexPos::new(0, 2))).unwrap();
    let rest = scan_positions(&mut t);
    assert_eq!(
        rest,
        vec![DoubleIndexPos::new(0, 3), DoubleIndexPos::new(1, 0), DoubleIndexPos::new(1, 1)]
    );
}

#[test]
fn seek_reopens_an_exhausted_scan() {
    let store = store_with(&[2]);
    let mut t = opened(&store);
    scan_positions(&mut t);
    assert_eq!(t.state(), ScanState::Exhausted);
    t.seek_and_fetch(&PositionToken::from_pos(&DoubleIndexPos::new(0, 0))).unwrap();
    assert_eq!(t.state(), ScanState::Scanning);
    assert_eq!(scan_positions(&mut t), vec![DoubleIndexPos::new(0, 1)]);
}

#[test]
fn reset_position_restarts_scan() {
    let store = store_with(&[2]);
    let mut t = opened(&store);
    assert_eq!(scan_positions(&mut t).len(), 2);
    t.reset_position();
    assert_eq!(t.state(), ScanState::Scanning);
    assert_eq!(scan_positions(&mut t).len(), 2);
}

#[test]
fn next_before_init_is_rejected() {
    let store = store_with(&[2]);
    let mut t = TableEesGlobalByError::new(store);
    assert!(matches!(t.next(), Err(TableError::InternalInvariantViolation(_))));
    assert_eq!(t.state(), ScanState::Unopened);
    // init twice is harmless
    t.init(false).unwrap();
    t.init(true).unwrap();
    assert!(t.next().is_ok());
}

#[test]
fn row_count_is_key_space_upper_bound() {
    let store = store_with(&[7, 0, 3]);
    let t = TableEesGlobalByError::new(Arc::clone(&store));
    assert_eq!(t.row_count(), 10);
    assert_eq!((SHARE.row_count)(&store), 10);
}

#[test]
fn truncate_zeroes_counters_and_keeps_cursor() {
    let store = store_with(&[3]);
    store.register_thread(1, Some("u"), Some("h"));
    store.record_error_at(1, 0, 1, false, 10);
    store.register_thread(2, None, Some("h2"));
    store.record_error_at(2, 0, 2, true, 20);
    store.disconnect_thread(2);
    store.record_error_at(77, 0, 2, false, 30);

    let mut t = opened(&store);
    t.next().unwrap();
    let before = t.position();
    t.truncate().unwrap();
    assert_eq!(t.position(), before);

    t.reset_position();
    let mut out = OutputRow::new(field::COUNT);
    while t.next().is_ok() {
        assert_eq!(t.row().row().stat, ErrorStat::default());
        t.read_row_values(&mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
        assert!(!out.is_null(field::FIRST_SEEN));
        assert!(!out.is_null(field::LAST_SEEN));
        assert_eq!(out.value(field::LAST_SEEN), Some(&FieldValue::Timestamp(DateTime::<Utc>::UNIX_EPOCH)));
    }
}

#[test]
fn truncate_is_visible_to_other_instances() {
    let store = store_with(&[2]);
    store.record_error_at(0, 0, 1, false, 10);
    let mut a = opened(&store);
    let mut b = opened(&store);
    a.truncate().unwrap();
    b.seek_and_fetch(&PositionToken::from_pos(&DoubleIndexPos::new(0, 1))).unwrap();
    assert_eq!(b.row().row().stat.count, 0);
}

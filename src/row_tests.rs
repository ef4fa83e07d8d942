use super::*;
use crate::instrument::ErrorCatalog;
use std::sync::Arc;

const ALL_FIELDS: [usize; 7] = [0, 1, 2, 3, 4, 5, 6];

fn store() -> ErrorStore {
    let classes = vec![ErrorClass { index: 0, name: "error".into(), items: ErrorCatalog::builtin().len() as u32 }];
    ErrorStore::new(classes, Arc::new(ErrorCatalog::builtin().clone()))
}

#[test]
fn unavailable_row_writes_nothing() {
    let s = store();
    let buf = RowBuffer::default();
    let mut out = OutputRow::new(field::COUNT);
    out.set(3, FieldValue::UInt(99)).unwrap();
    let before = out.clone();
    let err = buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::all(), true).unwrap_err();
    assert_eq!(err, TableError::RowUnavailable);
    assert_eq!(out, before);
}

#[test]
fn make_row_without_class_leaves_row_absent() {
    let s = store();
    let mut buf = RowBuffer::default();
    assert!(buf.make_row(&s, s.find_error_class(0), 1));
    assert!(buf.exists());
    assert!(!buf.make_row(&s, None, 1));
    assert!(!buf.exists());
}

#[test]
fn renders_mapped_error_with_counters() {
    let s = store();
    let idx = s.catalog().index_of(1213).unwrap();
    s.register_thread(1, Some("app"), Some("db1"));
    s.record_error_at(1, 0, idx, true, 1_700_000_000_000_000);
    s.record_error_at(1, 0, idx, false, 1_700_000_001_000_000);

    let mut buf = RowBuffer::default();
    buf.make_row(&s, s.find_error_class(0), idx as u32);
    let mut out = OutputRow::new(field::COUNT);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();

    assert_eq!(out.value(field::ERROR_NUMBER), Some(&FieldValue::Int(1213)));
    assert_eq!(out.value(field::ERROR_NAME), Some(&FieldValue::Str("ER_LOCK_DEADLOCK".into())));
    assert_eq!(out.value(field::SQL_STATE), Some(&FieldValue::Str("40001".into())));
    assert_eq!(out.value(field::SUM_ERROR_RAISED), Some(&FieldValue::UInt(2)));
    assert_eq!(out.value(field::SUM_ERROR_HANDLED), Some(&FieldValue::UInt(1)));
    let first = DateTime::<Utc>::from_timestamp_micros(1_700_000_000_000_000).unwrap();
    let last = DateTime::<Utc>::from_timestamp_micros(1_700_000_001_000_000).unwrap();
    assert_eq!(out.value(field::FIRST_SEEN), Some(&FieldValue::Timestamp(first)));
    assert_eq!(out.value(field::LAST_SEEN), Some(&FieldValue::Timestamp(last)));
    assert!(out.null_bits().iter().all(|b| *b == 0));
}

#[test]
fn unmapped_index_renders_null_lookups() {
    let s = store();
    let mut buf = RowBuffer::default();
    buf.make_row(&s, s.find_error_class(0), 0);
    let mut out = OutputRow::new(field::COUNT);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
    assert!(out.is_null(field::ERROR_NUMBER));
    assert!(out.is_null(field::ERROR_NAME));
    assert!(out.is_null(field::SQL_STATE));
    assert!(!out.is_null(field::SUM_ERROR_RAISED));
    assert_eq!(out.value(field::SUM_ERROR_RAISED), Some(&FieldValue::UInt(0)));
}

#[test]
fn never_seen_timestamps_render_the_epoch() {
    let s = store();
    let mut buf = RowBuffer::default();
    buf.make_row(&s, s.find_error_class(0), 1);
    let mut out = OutputRow::new(field::COUNT);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
    for f in [field::FIRST_SEEN, field::LAST_SEEN] {
        assert!(!out.is_null(f));
        assert_eq!(out.value(f), Some(&FieldValue::Timestamp(DateTime::<Utc>::UNIX_EPOCH)));
    }
    assert!(out.null_bits().iter().all(|b| *b == 0));
}

#[test]
fn read_set_limits_written_columns() {
    let s = store();
    let mut buf = RowBuffer::default();
    buf.make_row(&s, s.find_error_class(0), 1);
    let mut out = OutputRow::new(field::COUNT);
    let mask = ColumnMask::from_ordinals(&[field::ERROR_NAME, field::SUM_ERROR_RAISED]);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &mask, false).unwrap();
    assert_eq!(out.value(field::ERROR_NAME), Some(&FieldValue::Str("ER_HASHCHK".into())));
    assert_eq!(out.value(field::SUM_ERROR_RAISED), Some(&FieldValue::UInt(0)));
    assert_eq!(out.value(field::ERROR_NUMBER), Some(&FieldValue::Null));
    assert!(out.is_null(field::ERROR_NUMBER));
}

#[test]
fn partial_read_does_not_leak_previous_row() {
    let s = store();
    let mut buf = RowBuffer::default();
    let mut out = OutputRow::new(field::COUNT);
    buf.make_row(&s, s.find_error_class(0), 2);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
    assert!(matches!(out.value(field::ERROR_NAME), Some(FieldValue::Str(_))));

    buf.make_row(&s, s.find_error_class(0), 0);
    let mask = ColumnMask::from_ordinals(&[field::SUM_ERROR_RAISED]);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &mask, false).unwrap();
    assert_eq!(out.value(field::ERROR_NAME), Some(&FieldValue::Null));
    assert!(out.is_null(field::ERROR_NAME));
    assert!(!out.is_null(field::SUM_ERROR_RAISED));
}

#[test]
fn null_region_is_cleared_between_reads() {
    let s = store();
    let mut buf = RowBuffer::default();
    let mut out = OutputRow::new(field::COUNT);
    buf.make_row(&s, s.find_error_class(0), 0);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
    assert!(out.is_null(field::ERROR_NAME));

    buf.make_row(&s, s.find_error_class(0), 2);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
    assert!(!out.is_null(field::ERROR_NAME));
}

#[test]
fn unknown_ordinal_is_an_invariant_violation() {
    let s = store();
    let mut buf = RowBuffer::default();
    buf.make_row(&s, s.find_error_class(0), 1);
    let mut out = OutputRow::new(8);
    let err = buf.read_row_values(s.catalog(), &mut out, &[0, 7], &ColumnMask::none(), true).unwrap_err();
    assert!(matches!(err, TableError::InternalInvariantViolation(_)));
    // unrequested unknown ordinals are skipped
    buf.read_row_values(s.catalog(), &mut out, &[0, 7], &ColumnMask::from_ordinals(&[0]), false).unwrap();
}

#[test]
fn long_names_are_truncated_to_column_width() {
    let catalog = ErrorCatalog::new(vec![ServerError { number: 1, name: "N".repeat(80), sqlstate: "HY000X".into() }]);
    let classes = vec![ErrorClass { index: 0, name: "error".into(), items: 2 }];
    let s = ErrorStore::new(classes, Arc::new(catalog));
    let mut buf = RowBuffer::default();
    buf.make_row(&s, s.find_error_class(0), 1);
    let mut out = OutputRow::new(field::COUNT);
    buf.read_row_values(s.catalog(), &mut out, &ALL_FIELDS, &ColumnMask::none(), true).unwrap();
    assert_eq!(out.value(field::ERROR_NAME), Some(&FieldValue::Str("N".repeat(ERROR_NAME_WIDTH))));
    assert_eq!(out.value(field::SQL_STATE), Some(&FieldValue::Str("HY000".into())));
}

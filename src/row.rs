//! Row buffer and field rendering for the error summary tables.
//!
//! `RowBuffer::make_row` is the only writer of the buffer. `read_row_values`
//! copies the buffered row into a caller-owned `OutputRow`, column by ordinal.

use chrono::{DateTime, Utc};
use tracing::error;

use crate::error::{TableError, TableResult};
use crate::instrument::{ConnectionErrorVisitor, ErrorCatalog, ErrorClass, ErrorStat, ErrorStore, ServerError, VisitFlags};

pub const ERROR_NAME_WIDTH: usize = 64;
pub const SQL_STATE_WIDTH: usize = 5;

/// Ordinals of the error summary columns.
pub mod field {
    pub const ERROR_NUMBER: usize = 0;
    pub const ERROR_NAME: usize = 1;
    pub const SQL_STATE: usize = 2;
    pub const SUM_ERROR_RAISED: usize = 3;
    pub const SUM_ERROR_HANDLED: usize = 4;
    pub const FIRST_SEEN: usize = 5;
    pub const LAST_SEEN: usize = 6;
    pub const COUNT: usize = 7;
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    UInt(u64),
    Str(String),
    Timestamp(DateTime<Utc>),
}

/// Caller-provided output row: one value slot per column plus a null bitmap.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRow {
    values: Vec<FieldValue>,
    null_bits: Vec<u8>,
}

impl OutputRow {
    pub fn new(width: usize) -> Self {
        Self { values: vec![FieldValue::Null; width], null_bits: vec![0; width.div_ceil(8).max(1)] }
    }

    pub fn width(&self) -> usize { self.values.len() }
    pub fn values(&self) -> &[FieldValue] { &self.values }
    pub fn value(&self, ordinal: usize) -> Option<&FieldValue> { self.values.get(ordinal) }
    pub fn null_bits(&self) -> &[u8] { &self.null_bits }

    pub fn is_null(&self, ordinal: usize) -> bool {
        self.null_bits.get(ordinal / 8).is_some_and(|b| b & (1 << (ordinal % 8)) != 0)
    }

    pub fn clear_nulls(&mut self) {
        self.null_bits.iter_mut().for_each(|b| *b = 0);
    }

    /// Drop every value left by a previous read. All slots become NULL until set.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = FieldValue::Null);
        self.clear_nulls();
        for ordinal in 0..self.values.len() {
            self.null_bits[ordinal / 8] |= 1 << (ordinal % 8);
        }
    }

    pub fn set(&mut self, ordinal: usize, value: FieldValue) -> TableResult<()> {
        let Some(slot) = self.values.get_mut(ordinal) else {
            return Err(TableError::internal(format!("output row has no column {}", ordinal)));
        };
        let bit = 1 << (ordinal % 8);
        if value == FieldValue::Null {
            self.null_bits[ordinal / 8] |= bit;
        } else {
            self.null_bits[ordinal / 8] &= !bit;
        }
        *slot = value;
        Ok(())
    }
}

/// Read set over column ordinals (first 64 columns).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnMask(u64);

impl ColumnMask {
    pub const fn none() -> Self { Self(0) }
    pub const fn all() -> Self { Self(u64::MAX) }

    pub fn from_ordinals(ordinals: &[usize]) -> Self {
        let mut m = Self::none();
        ordinals.iter().for_each(|&o| m.set(o));
        m
    }

    pub fn set(&mut self, ordinal: usize) {
        if ordinal < 64 {
            self.0 |= 1 << ordinal;
        }
    }

    pub fn is_set(&self, ordinal: usize) -> bool {
        ordinal < 64 && self.0 & (1 << ordinal) != 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ErrorStatRow {
    pub stat: ErrorStat,
    pub error_index: usize,
}

impl ErrorStatRow {
    pub fn set(&mut self, stat: &ErrorStat, error_index: usize) {
        self.stat = *stat;
        self.error_index = error_index;
    }

    fn set_field(&self, ordinal: usize, lookup: Option<&ServerError>, out: &mut OutputRow) -> TableResult<()> {
        let value = match ordinal {
            field::ERROR_NUMBER => lookup.map_or(FieldValue::Null, |e| FieldValue::Int(i64::from(e.number))),
            field::ERROR_NAME => lookup.map_or(FieldValue::Null, |e| FieldValue::Str(truncate_chars(&e.name, ERROR_NAME_WIDTH))),
            field::SQL_STATE => lookup.map_or(FieldValue::Null, |e| FieldValue::Str(truncate_chars(&e.sqlstate, SQL_STATE_WIDTH))),
            field::SUM_ERROR_RAISED => FieldValue::UInt(self.stat.count),
            field::SUM_ERROR_HANDLED => FieldValue::UInt(self.stat.handled_count),
            field::FIRST_SEEN => timestamp_value(self.stat.first_seen),
            field::LAST_SEEN => timestamp_value(self.stat.last_seen),
            other => return Err(TableError::internal(format!("unknown field ordinal {}", other))),
        };
        out.set(ordinal, value)
    }
}

/// FIRST_SEEN and LAST_SEEN are not nullable: a never-seen error renders the epoch.
fn timestamp_value(micros: u64) -> FieldValue {
    let ts = i64::try_from(micros)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_micros)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    FieldValue::Timestamp(ts)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[derive(Debug, Default)]
pub struct RowBuffer {
    row: ErrorStatRow,
    exists: bool,
}

impl RowBuffer {
    pub fn exists(&self) -> bool { self.exists }
    pub fn row(&self) -> &ErrorStatRow { &self.row }

    pub fn invalidate(&mut self) {
        self.exists = false;
    }

    /// Aggregate `(class, item)` across the shards and buffer the result.
    /// The row is only marked present once every step has succeeded.
    pub fn make_row(&mut self, store: &ErrorStore, class: Option<&ErrorClass>, item: u32) -> bool {
        self.exists = false;
        let Some(class) = class else {
            return false;
        };
        let mut visitor = ConnectionErrorVisitor::new(class, item as usize);
        store.visit_global(VisitFlags::GLOBAL_BY_ERROR, &mut visitor);
        self.row.set(&visitor.stat, item as usize);
        self.exists = true;
        true
    }

    /// Render the buffered row. `fields` lists the ordinals of the host table's
    /// columns; a field is written when `read_all` is set or it is in `read_set`.
    pub fn read_row_values(
        &self,
        catalog: &ErrorCatalog,
        out: &mut OutputRow,
        fields: &[usize],
        read_set: &ColumnMask,
        read_all: bool,
    ) -> TableResult<()> {
        if !self.exists {
            return Err(TableError::RowUnavailable);
        }

        // columns outside the read set come back NULL rather than stale
        out.reset();
        let lookup = catalog.lookup(self.row.error_index);

        for &f in fields {
            if !(read_all || read_set.is_set(f)) {
                continue;
            }
            if f >= field::COUNT {
                error!(target: "perfschema::table", "read_row_values: unknown field ordinal {}", f);
                return Err(TableError::internal(format!("unknown field ordinal {}", f)));
            }
            self.row.set_field(f, lookup, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "row_tests.rs"]
mod row_tests;

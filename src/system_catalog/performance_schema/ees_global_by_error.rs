//! `performance_schema.events_errors_summary_global_by_error`
//!
//! One row per (error class, error item), aggregated over the global, host,
//! account and thread shards. Rows exist for every key whether or not the
//! error was ever raised.

use tracing::debug;

use crate::error::{TableError, TableResult};
use crate::instrument::{ErrorStore, SharedErrorStore};
use crate::position::{KeySpaceCursor, PositionToken};
use crate::row::{ColumnMask, OutputRow, RowBuffer, ERROR_NAME_WIDTH, SQL_STATE_WIDTH};
use crate::system_catalog::registry::{self, ColType, ColumnDef, PerfTable, TableShare};

const COLS: &[ColumnDef] = &[
    ColumnDef { name: "ERROR_NUMBER", coltype: ColType::Integer },
    ColumnDef { name: "ERROR_NAME", coltype: ColType::Varchar(ERROR_NAME_WIDTH) },
    ColumnDef { name: "SQL_STATE", coltype: ColType::Varchar(SQL_STATE_WIDTH) },
    ColumnDef { name: "SUM_ERROR_RAISED", coltype: ColType::BigInt },
    ColumnDef { name: "SUM_ERROR_HANDLED", coltype: ColType::BigInt },
    ColumnDef { name: "FIRST_SEEN", coltype: ColType::Timestamp },
    ColumnDef { name: "LAST_SEEN", coltype: ColType::Timestamp },
];

pub static SHARE: TableShare = TableShare {
    schema: "performance_schema",
    name: "events_errors_summary_global_by_error",
    columns: COLS,
    truncatable: true,
    create: TableEesGlobalByError::create,
    delete_all_rows: TableEesGlobalByError::delete_all_rows,
    row_count: TableEesGlobalByError::get_row_count,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Unopened,
    Scanning,
    Exhausted,
}

pub struct TableEesGlobalByError {
    store: SharedErrorStore,
    cursor: KeySpaceCursor,
    row: RowBuffer,
    state: ScanState,
}

impl TableEesGlobalByError {
    pub fn new(store: SharedErrorStore) -> Self {
        Self { store, cursor: KeySpaceCursor::new(), row: RowBuffer::default(), state: ScanState::Unopened }
    }

    fn create(store: SharedErrorStore) -> Box<dyn PerfTable> {
        Box::new(Self::new(store))
    }

    /// Resets every shard the view reads from. Other views over the same
    /// store see the reset too.
    fn delete_all_rows(store: &ErrorStore) -> TableResult<()> {
        store.reset_all();
        Ok(())
    }

    fn get_row_count(store: &ErrorStore) -> u64 {
        store.key_space_len()
    }

    pub fn state(&self) -> ScanState { self.state }
    pub fn row_exists(&self) -> bool { self.row.exists() }
    pub fn row(&self) -> &RowBuffer { &self.row }
}

impl PerfTable for TableEesGlobalByError {
    fn share(&self) -> &'static TableShare { &SHARE }

    // `scan` is accepted for engines that distinguish ordered starts; row order
    // is always class-major, item-minor.
    fn init(&mut self, _scan: bool) -> TableResult<()> {
        if self.state == ScanState::Unopened {
            self.state = ScanState::Scanning;
            debug!(target: "perfschema::table", "{}: scan opened", SHARE.name);
        }
        Ok(())
    }

    fn next(&mut self) -> TableResult<()> {
        match self.state {
            ScanState::Unopened => return Err(TableError::internal("next() before init()")),
            ScanState::Exhausted => {
                self.row.invalidate();
                return Err(TableError::EndOfData);
            }
            ScanState::Scanning => {}
        }

        self.cursor.begin_step();
        loop {
            let pos = self.cursor.current();
            let Some(class) = self.store.find_error_class(pos.class_index) else {
                self.row.invalidate();
                self.state = ScanState::Exhausted;
                debug!(target: "perfschema::table", "{}: end of data at class {}", SHARE.name, pos.class_index);
                return Err(TableError::EndOfData);
            };
            if pos.has_more_item(class.items) {
                self.row.make_row(&self.store, Some(class), pos.item_index);
                self.cursor.advance();
                return Ok(());
            }
            self.cursor.skip_class();
        }
    }

    fn seek_and_fetch(&mut self, token: &PositionToken) -> TableResult<()> {
        let pos = token.to_pos();
        self.cursor.seek(pos);

        match self.store.find_error_class(pos.class_index) {
            Some(class) if pos.has_more_item(class.items) => {
                self.row.make_row(&self.store, Some(class), pos.item_index);
                // a following next() resumes after the sought row
                self.cursor.advance();
                self.state = ScanState::Scanning;
                Ok(())
            }
            _ => {
                self.row.invalidate();
                debug!(target: "perfschema::table", "{}: seek to ({}, {}) is no longer valid", SHARE.name, pos.class_index, pos.item_index);
                Err(TableError::RowDeleted)
            }
        }
    }

    fn reset_position(&mut self) {
        self.cursor.reset();
        if self.state == ScanState::Exhausted {
            self.state = ScanState::Scanning;
        }
    }

    fn position(&self) -> PositionToken {
        PositionToken::from_pos(&self.cursor.current())
    }

    fn row_count(&self) -> u64 {
        Self::get_row_count(&self.store)
    }

    fn truncate(&mut self) -> TableResult<()> {
        debug!(target: "perfschema::table", "{}: truncate", SHARE.name);
        Self::delete_all_rows(&self.store)
    }

    fn read_row_values(
        &self,
        out: &mut OutputRow,
        fields: &[usize],
        read_set: &ColumnMask,
        read_all: bool,
    ) -> TableResult<()> {
        self.row.read_row_values(self.store.catalog(), out, fields, read_set, read_all)
    }
}

pub fn register() { registry::register(&SHARE); }

#[cfg(test)]
#[path = "ees_global_by_error_tests.rs"]
mod ees_global_by_error_tests;

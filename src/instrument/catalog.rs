//! Server error name table.
//!
//! Item index 0 of the error class is the bucket for errors that have no
//! dedicated slot; it never resolves to a name. Indices past the end of the
//! table do not resolve either.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    pub number: u32,
    pub name: String,
    pub sqlstate: String,
}

#[derive(Clone, Debug, Default)]
pub struct ErrorCatalog {
    // slot 0 is reserved and left empty
    entries: Vec<Option<ServerError>>,
    by_number: HashMap<u32, usize>,
}

const BUILTIN: &[(u32, &str, &str)] = &[
    (1000, "ER_HASHCHK", "HY000"),
    (1045, "ER_ACCESS_DENIED_ERROR", "28000"),
    (1046, "ER_NO_DB_ERROR", "3D000"),
    (1048, "ER_BAD_NULL_ERROR", "23000"),
    (1049, "ER_BAD_DB_ERROR", "42000"),
    (1050, "ER_TABLE_EXISTS_ERROR", "42S01"),
    (1051, "ER_BAD_TABLE_ERROR", "42S02"),
    (1054, "ER_BAD_FIELD_ERROR", "42S22"),
    (1062, "ER_DUP_ENTRY", "23000"),
    (1064, "ER_PARSE_ERROR", "42000"),
    (1146, "ER_NO_SUCH_TABLE", "42S02"),
    (1205, "ER_LOCK_WAIT_TIMEOUT", "HY000"),
    (1213, "ER_LOCK_DEADLOCK", "40001"),
    (1216, "ER_NO_REFERENCED_ROW", "23000"),
    (1264, "ER_WARN_DATA_OUT_OF_RANGE", "22003"),
    (1292, "ER_TRUNCATED_WRONG_VALUE", "22007"),
    (1365, "ER_DIVISION_BY_ZERO", "22012"),
    (1406, "ER_DATA_TOO_LONG", "22001"),
    (1451, "ER_ROW_IS_REFERENCED_2", "23000"),
    (1452, "ER_NO_REFERENCED_ROW_2", "23000"),
];

static BUILTIN_CATALOG: Lazy<ErrorCatalog> = Lazy::new(|| {
    ErrorCatalog::new(
        BUILTIN
            .iter()
            .map(|(number, name, sqlstate)| ServerError {
                number: *number,
                name: (*name).to_string(),
                sqlstate: (*sqlstate).to_string(),
            })
            .collect(),
    )
});

impl ErrorCatalog {
    /// Build a catalog; `errors[i]` is assigned item index `i + 1`.
    pub fn new(errors: Vec<ServerError>) -> Self {
        let mut entries: Vec<Option<ServerError>> = Vec::with_capacity(errors.len() + 1);
        let mut by_number = HashMap::with_capacity(errors.len());
        entries.push(None);
        for e in errors {
            by_number.insert(e.number, entries.len());
            entries.push(Some(e));
        }
        Self { entries, by_number }
    }

    pub fn builtin() -> &'static ErrorCatalog {
        &BUILTIN_CATALOG
    }

    /// Number of item slots, including the reserved slot 0.
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.len() <= 1 }

    pub fn lookup(&self, index: usize) -> Option<&ServerError> {
        if index == 0 {
            return None;
        }
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Item index for an error number; unknown numbers map to `None` and are
    /// accounted in slot 0 by the recorder.
    pub fn index_of(&self, number: u32) -> Option<usize> {
        self.by_number.get(&number).copied()
    }
}

use serde::{Deserialize, Serialize};

use super::{ObjectId, INVALID_OBJECT_ID};
use crate::error::{DdResult, DictionaryError};

/// Field-level access to one dictionary table row.
pub trait RawRecord {
    fn read_int(&self, field: usize) -> DdResult<i64>;
    fn read_str(&self, field: usize) -> DdResult<String>;
    /// Store a primary-key id. `INVALID_OBJECT_ID` stores NULL so that the
    /// engine assigns the next auto-increment value on insert.
    fn store_pk_id(&mut self, field: usize, id: ObjectId) -> DdResult<()>;
    fn store_str(&mut self, field: usize, value: &str) -> DdResult<()>;
}

/// A row that was just inserted and may carry a generated id.
pub trait RawNewRecord: RawRecord {
    /// Generated id of the inserted row, `INVALID_OBJECT_ID` if none was assigned.
    fn insert_id(&self) -> ObjectId;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldCell {
    Null,
    Int(i64),
    Str(String),
}

impl FieldCell {
    fn kind(&self) -> &'static str {
        match self {
            FieldCell::Null => "NULL",
            FieldCell::Int(_) => "integer",
            FieldCell::Str(_) => "string",
        }
    }
}

/// In-memory record used by tests and by callers staging rows before writing
/// them to a dictionary table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemRecord {
    fields: Vec<FieldCell>,
    #[serde(default)]
    insert_id: Option<ObjectId>,
}

impl MemRecord {
    pub fn new(width: usize) -> Self {
        Self { fields: vec![FieldCell::Null; width], insert_id: None }
    }

    pub fn from_cells(fields: Vec<FieldCell>) -> Self {
        Self { fields, insert_id: None }
    }

    /// Simulate the engine assigning `id` on insert.
    pub fn with_insert_id(mut self, id: ObjectId) -> Self {
        self.insert_id = Some(id);
        self
    }

    pub fn cell(&self, field: usize) -> Option<&FieldCell> { self.fields.get(field) }

    fn slot(&mut self, field: usize) -> DdResult<&mut FieldCell> {
        self.fields.get_mut(field).ok_or(DictionaryError::FieldOutOfRange(field))
    }
}

impl RawRecord for MemRecord {
    fn read_int(&self, field: usize) -> DdResult<i64> {
        match self.fields.get(field) {
            None => Err(DictionaryError::FieldOutOfRange(field)),
            Some(FieldCell::Int(v)) => Ok(*v),
            Some(FieldCell::Null) => Err(DictionaryError::NullField(field)),
            Some(other) => Err(DictionaryError::TypeMismatch { field, expected: "integer", found: other.kind() }),
        }
    }

    fn read_str(&self, field: usize) -> DdResult<String> {
        match self.fields.get(field) {
            None => Err(DictionaryError::FieldOutOfRange(field)),
            Some(FieldCell::Str(s)) => Ok(s.clone()),
            Some(FieldCell::Null) => Err(DictionaryError::NullField(field)),
            Some(other) => Err(DictionaryError::TypeMismatch { field, expected: "string", found: other.kind() }),
        }
    }

    fn store_pk_id(&mut self, field: usize, id: ObjectId) -> DdResult<()> {
        let cell = if id == INVALID_OBJECT_ID {
            FieldCell::Null
        } else {
            FieldCell::Int(i64::try_from(id).map_err(|_| DictionaryError::IdOverflow(id))?)
        };
        *self.slot(field)? = cell;
        Ok(())
    }

    fn store_str(&mut self, field: usize, value: &str) -> DdResult<()> {
        *self.slot(field)? = FieldCell::Str(value.to_string());
        Ok(())
    }
}

impl RawNewRecord for MemRecord {
    fn insert_id(&self) -> ObjectId {
        self.insert_id.unwrap_or(INVALID_OBJECT_ID)
    }
}

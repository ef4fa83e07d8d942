//! Base state for dictionary objects identified by a numeric primary key and a name.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::trace;

use super::raw_record::{RawNewRecord, RawRecord};
use super::{ObjectId, INVALID_OBJECT_ID};
use crate::error::{DdResult, DictionaryError};

/// Search key selecting a dictionary row by its id column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrimaryIdKey {
    id: ObjectId,
}

impl PrimaryIdKey {
    pub fn new(id: ObjectId) -> Self { Self { id } }
    pub fn id(&self) -> ObjectId { self.id }

    /// True if the id column `field` of `record` holds this key.
    pub fn matches(&self, record: &dyn RawRecord, field: usize) -> DdResult<bool> {
        let v = record.read_int(field)?;
        Ok(u64::try_from(v).is_ok_and(|v| v == self.id))
    }
}

impl Display for PrimaryIdKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "id={}", self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityObject {
    id: ObjectId,
    name: String,
    has_new_primary_key: bool,
}

impl Default for EntityObject {
    fn default() -> Self {
        Self { id: INVALID_OBJECT_ID, name: String::new(), has_new_primary_key: true }
    }
}

impl EntityObject {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn id(&self) -> ObjectId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn set_name<S: Into<String>>(&mut self, name: S) { self.name = name.into(); }

    /// True until the object has been stored or restored with a real id.
    pub fn has_new_primary_key(&self) -> bool { self.has_new_primary_key }

    /// Take the id generated for a freshly inserted row.
    ///
    /// `has_new_primary_key` is left as is: children stored after their parent
    /// still need to know the parent id is new. Call `fix_has_new_primary_key`
    /// once the whole store is complete.
    pub fn set_primary_key_value(&mut self, record: &dyn RawNewRecord) {
        self.id = record.insert_id();
        trace!(target: "perfschema::dd", "entity '{}' assigned id {}", self.name, self.id);
    }

    pub fn create_primary_key(&self) -> PrimaryIdKey {
        PrimaryIdKey::new(self.id)
    }

    pub fn fix_has_new_primary_key(&mut self) {
        self.has_new_primary_key = self.id == INVALID_OBJECT_ID;
    }

    pub fn restore_id(&mut self, record: &dyn RawRecord, field: usize) -> DdResult<()> {
        let raw = record.read_int(field)?;
        self.id = u64::try_from(raw).map_err(|_| DictionaryError::TypeMismatch {
            field,
            expected: "non-negative id",
            found: "negative integer",
        })?;
        self.fix_has_new_primary_key();
        Ok(())
    }

    pub fn restore_name(&mut self, record: &dyn RawRecord, field: usize) -> DdResult<()> {
        self.name = record.read_str(field)?;
        Ok(())
    }

    pub fn store_id(&self, record: &mut dyn RawRecord, field: usize) -> DdResult<()> {
        record.store_pk_id(field, self.id)
    }

    pub fn store_name(&self, record: &mut dyn RawRecord, field: usize) -> DdResult<()> {
        record.store_str(field, &self.name)
    }
}

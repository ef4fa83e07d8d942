//! Data dictionary object persistence.

pub mod entity_object;
pub mod raw_record;

pub use entity_object::{EntityObject, PrimaryIdKey};
pub use raw_record::{FieldCell, MemRecord, RawNewRecord, RawRecord};

pub type ObjectId = u64;

/// Id of an object that has not been stored yet.
pub const INVALID_OBJECT_ID: ObjectId = u64::MAX;

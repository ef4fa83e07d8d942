//! Runtime error instrumentation: counters, shard storage, visitors and the
//! error name table. Tables read this layer; nothing here knows about rows.

pub mod catalog;
pub mod error_stat;
pub mod store;
pub mod visitor;

pub use catalog::{ErrorCatalog, ServerError};
pub use error_stat::{ErrorStat, ErrorStatArray, ErrorStats};
pub use store::{AccountKey, ErrorClass, ErrorStore, SharedErrorStore, ThreadId};
pub use visitor::{ConnectionErrorVisitor, ConnectionVisitor, VisitFlags};

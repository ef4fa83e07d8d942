// Registry and implementations of instrumentation-backed system tables.

pub mod registry;
pub mod performance_schema;

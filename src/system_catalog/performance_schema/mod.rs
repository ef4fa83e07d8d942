//! Tables of the `performance_schema` namespace.

pub mod ees_global_by_error;

pub use ees_global_by_error::TableEesGlobalByError;

pub fn register_defaults() {
    ees_global_by_error::register();
}

// ABOUTME: PostgreSQL utilities module
// ABOUTME: Exports connection management and schema introspection

pub mod connection;
pub mod introspect;

pub use connection::connect;
pub use introspect::{table_columns, ColumnInfo};

// ABOUTME: Schema introspection for export select lists and import column metadata
// ABOUTME: Reads column names, types, and generated flags from information_schema

use anyhow::{Context, Result};
use tokio_postgres::Client;

/// One column of a table as seen by information_schema
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    /// Postgres internal type name (`int4`, `bytea`, `jsonb`, `_int4` for arrays, ...)
    pub udt_name: String,
    /// True for GENERATED ... STORED and GENERATED ALWAYS AS IDENTITY columns,
    /// neither of which accepts an explicit insert value
    pub generated: bool,
}

impl ColumnInfo {
    pub fn is_json(&self) -> bool {
        self.udt_name == "json" || self.udt_name == "jsonb"
    }

    pub fn is_binary(&self) -> bool {
        self.udt_name == "bytea"
    }
}

/// List the columns of a table in the public schema, in ordinal order
///
/// Returns an empty vector when the table does not exist; callers decide
/// whether that is an error.
pub async fn table_columns(client: &Client, table: &str) -> Result<Vec<ColumnInfo>> {
    let rows = client
        .query(
            "SELECT column_name::text,
                    udt_name::text,
                    (is_generated = 'ALWAYS' OR COALESCE(identity_generation, '') = 'ALWAYS')
             FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1
             ORDER BY ordinal_position",
            &[&table],
        )
        .await
        .with_context(|| {
            format!(
                "Failed to introspect columns for table '{}'",
                crate::utils::sanitize_identifier(table)
            )
        })?;

    let columns = rows
        .iter()
        .map(|row| ColumnInfo {
            name: row.get(0),
            udt_name: row.get(1),
            generated: row.get(2),
        })
        .collect();

    Ok(columns)
}

// ABOUTME: Auto-increment sequence resynchronization after a table load
// ABOUTME: Resets each table's serial counter to MAX(key)+1 so later inserts do not collide

use crate::utils::quote_ident;
use anyhow::{Context, Result};
use tokio_postgres::Client;

/// Auto-increment key column for a table.
///
/// `id` by convention across the schema; the employees table is keyed by
/// `employee_id` instead.
pub fn sequence_key_column(table: &str) -> &'static str {
    if table == "employees" {
        "employee_id"
    } else {
        "id"
    }
}

/// Reset the serial sequence behind `key` to MAX(key)+1, or 1 when the table
/// ended up empty, so the next application-level insert gets the right value.
///
/// `pg_get_serial_sequence` returns NULL when no sequence is attached, which
/// makes `setval` a no-op; tables without a serial key resync to nothing.
pub async fn resync(client: &Client, table: &str, key: &str) -> Result<()> {
    let query = format!(
        "SELECT setval(pg_get_serial_sequence($1, $2), COALESCE(MAX({key}), 0) + 1, false) \
         FROM {table}",
        key = quote_ident(key),
        table = quote_ident(table),
    );

    let row = client
        .query_one(&query, &[&quote_ident(table), &key])
        .await
        .with_context(|| {
            format!(
                "Failed to resync sequence for {}.{}",
                crate::utils::sanitize_identifier(table),
                crate::utils::sanitize_identifier(key)
            )
        })?;

    match row.try_get::<_, Option<i64>>(0)? {
        Some(next) => {
            tracing::debug!("Sequence for {}.{} resynced, next value {}", table, key, next);
        }
        None => {
            tracing::debug!("No sequence attached to {}.{}, nothing to resync", table, key);
        }
    }

    Ok(())
}

// ABOUTME: Target-schema column metadata for adaptive insert construction
// ABOUTME: Tracks existing, generated, and JSON-typed columns per table, recomputed each run

use crate::postgres::introspect::{self, ColumnInfo};
use anyhow::Result;
use std::collections::HashMap;
use tokio_postgres::Client;

/// What the importer knows about one target table.
///
/// Recomputed on every run and never persisted, so schema drift between
/// export and import is seen through the target's current shape.
#[derive(Debug)]
pub struct ColumnMetadata {
    columns: HashMap<String, ColumnInfo>,
}

impl ColumnMetadata {
    pub fn from_columns(columns: Vec<ColumnInfo>) -> Self {
        ColumnMetadata {
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    /// Introspect the target table's current shape
    pub async fn introspect(client: &Client, table: &str) -> Result<Self> {
        Ok(Self::from_columns(introspect::table_columns(client, table).await?))
    }

    /// True when the table does not exist in the target
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn is_generated(&self, name: &str) -> bool {
        self.columns.get(name).map(|c| c.generated).unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, udt: &str, generated: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            udt_name: udt.to_string(),
            generated,
        }
    }

    fn sample() -> ColumnMetadata {
        ColumnMetadata::from_columns(vec![
            col("id", "int4", false),
            col("payload", "bytea", false),
            col("meta", "jsonb", false),
            col("search_vector", "tsvector", true),
        ])
    }

    #[test]
    fn test_missing_table_is_empty() {
        let meta = ColumnMetadata::from_columns(vec![]);
        assert!(meta.is_empty());
        assert!(!meta.has_column("id"));
    }

    #[test]
    fn test_column_classification() {
        let meta = sample();
        assert!(meta.has_column("id"));
        assert!(!meta.has_column("legacy_notes"));
        assert!(meta.is_generated("search_vector"));
        assert!(!meta.is_generated("id"));
        assert!(meta.get("meta").unwrap().is_json());
        assert!(meta.get("payload").unwrap().is_binary());
    }
}

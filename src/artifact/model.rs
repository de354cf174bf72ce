// ABOUTME: Serde data model for the snapshot artifact file
// ABOUTME: Defines table snapshots, row records, and per-column type metadata

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// One row as an ordered mapping of column name to transport value.
///
/// Relies on serde_json's `preserve_order` feature so column order survives
/// the round trip. Binary data is always base64 text here, never raw bytes.
pub type RowRecord = serde_json::Map<String, serde_json::Value>;

/// Transport-level classification of a column, recorded at export time so
/// the importer never has to infer a value's original type from its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Boolean,
    Number,
    Text,
    Binary,
    Json,
    Other,
}

impl ColumnKind {
    pub fn from_udt(udt_name: &str) -> Self {
        match udt_name {
            "bool" => ColumnKind::Boolean,
            "int2" | "int4" | "int8" | "float4" | "float8" | "numeric" => ColumnKind::Number,
            "text" | "varchar" | "bpchar" | "name" => ColumnKind::Text,
            "bytea" => ColumnKind::Binary,
            "json" | "jsonb" => ColumnKind::Json,
            _ => ColumnKind::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

/// One table's worth of snapshot data
#[derive(Debug, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(rename = "table")]
    pub name: String,
    pub rows: Vec<RowRecord>,
    #[serde(rename = "rowCount")]
    pub row_count: u64,
    /// Absent in artifacts written by older exporters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnSpec>,
}

impl TableSnapshot {
    /// Look up recorded column metadata by name, if this artifact carries any
    pub fn column_kind(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.kind)
    }
}

/// The whole artifact: one point-in-time snapshot of all configured tables,
/// parents before children
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotArtifact {
    pub export_timestamp: String,
    pub tables: Vec<TableSnapshot>,
}

impl SnapshotArtifact {
    /// Check structural invariants after parsing
    ///
    /// `rowCount` must equal the number of rows exactly. The exporter omits
    /// empty tables, but an artifact recording one anyway is tolerated here;
    /// the importer skips it with a warning.
    pub fn validate(&self) -> Result<()> {
        for table in &self.tables {
            if table.row_count != table.rows.len() as u64 {
                bail!(
                    "Artifact is corrupt: table '{}' declares {} rows but contains {}",
                    crate::utils::sanitize_identifier(&table.name),
                    table.row_count,
                    table.rows.len()
                );
            }
        }
        Ok(())
    }
}

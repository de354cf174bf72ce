// ABOUTME: Snapshot importer that replays one artifact table into the target
// ABOUTME: Adapts columns to the target schema, denormalizes values, and bulk-inserts

pub mod denormalize;
pub mod schema;
pub mod sequence;

use crate::artifact::model::{ColumnKind, TableSnapshot};
use crate::postgres::introspect::ColumnInfo;
use crate::utils::{quote_ident, sanitize_identifier};
use anyhow::{bail, Context, Result};
use self::schema::ColumnMetadata;
use serde_json::Value;
use std::collections::HashSet;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

/// Upper bound on bind parameters in one statement (PostgreSQL wire limit)
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Result of loading one table
#[derive(Debug, Default)]
pub struct TableLoadReport {
    pub rows_loaded: u64,
    /// Schema-drift and heuristic warnings raised while loading
    pub warnings: Vec<String>,
    /// Set when the table was skipped instead of loaded
    pub skipped_reason: Option<String>,
}

/// Replays artifact tables into a target database handle.
///
/// The handle is injected by the caller; the importer never opens or owns a
/// connection of its own.
pub struct SnapshotImporter<'a> {
    client: &'a Client,
}

impl<'a> SnapshotImporter<'a> {
    pub fn new(client: &'a Client) -> Self {
        SnapshotImporter { client }
    }

    /// Load one table from the artifact.
    ///
    /// Errors here are fatal for the remainder of the import; the
    /// orchestrator aborts the run after restoring integrity enforcement.
    pub async fn load_table(&self, snapshot: &TableSnapshot) -> Result<TableLoadReport> {
        let mut report = TableLoadReport::default();

        // Empty tables are omitted at export; an artifact recording one
        // anyway is skipped rather than treated as corrupt
        if snapshot.rows.is_empty() {
            let reason = format!(
                "artifact records '{}' with zero rows",
                sanitize_identifier(&snapshot.name)
            );
            tracing::warn!("Skipping table: {}", reason);
            report.skipped_reason = Some(reason);
            return Ok(report);
        }

        let metadata = ColumnMetadata::introspect(self.client, &snapshot.name).await?;
        if metadata.is_empty() {
            bail!(
                "Table '{}' does not exist in the target database",
                sanitize_identifier(&snapshot.name)
            );
        }

        // The first row fixes the column set; later rows are assumed homogeneous
        let first_row = snapshot
            .rows
            .first()
            .with_context(|| format!("Artifact table '{}' has no rows", snapshot.name))?;

        let mut insert_columns: Vec<ColumnInfo> = Vec::new();
        for name in first_row.keys() {
            if !metadata.has_column(name) {
                let warning = format!(
                    "Column '{}' of table '{}' is not present in the target schema, dropping it",
                    sanitize_identifier(name),
                    sanitize_identifier(&snapshot.name)
                );
                tracing::warn!("{}", warning);
                report.warnings.push(warning);
                continue;
            }
            if metadata.is_generated(name) {
                tracing::debug!(
                    "Column '{}' of table '{}' is generated, excluding from insert",
                    name,
                    snapshot.name
                );
                continue;
            }
            if let Some(info) = metadata.get(name) {
                insert_columns.push(info.clone());
            }
        }

        if insert_columns.is_empty() {
            let reason = format!(
                "no artifact column of '{}' survives the target schema",
                sanitize_identifier(&snapshot.name)
            );
            tracing::warn!("Skipping table: {}", reason);
            report.skipped_reason = Some(reason);
            return Ok(report);
        }

        let statement = build_insert_statement(&snapshot.name, &insert_columns, snapshot.rows.len())?;
        let params = bind_rows(snapshot, &insert_columns, &mut report.warnings);
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        // One multi-row statement per table: throughput over per-row fault
        // isolation, so a single malformed row fails the whole table
        report.rows_loaded = self
            .client
            .execute(statement.as_str(), &param_refs)
            .await
            .with_context(|| {
                format!(
                    "Failed to bulk-insert {} rows into '{}'",
                    snapshot.rows.len(),
                    sanitize_identifier(&snapshot.name)
                )
            })?;

        tracing::info!(
            "✓ Loaded {} rows into '{}'",
            report.rows_loaded,
            snapshot.name
        );

        // Sequence resync failures degrade the run but never abort it
        let key = sequence::sequence_key_column(&snapshot.name);
        if metadata.has_column(key) {
            if let Err(e) = sequence::resync(self.client, &snapshot.name, key).await {
                let warning = format!(
                    "Sequence resync failed for '{}': {:#}",
                    sanitize_identifier(&snapshot.name),
                    e
                );
                tracing::warn!("{}", warning);
                report.warnings.push(warning);
            }
        }

        Ok(report)
    }
}

/// Build one parameterized multi-row INSERT for the effective column set.
///
/// Every parameter is bound as text and cast back to the target column's
/// type inside the statement, so heterogeneous transport values never fight
/// the driver's type inference. bytea columns decode their base64 transport
/// form server-side.
pub fn build_insert_statement(
    table: &str,
    columns: &[ColumnInfo],
    row_count: usize,
) -> Result<String> {
    let param_count = columns.len() * row_count;
    if param_count > MAX_BIND_PARAMS {
        bail!(
            "Table '{}' needs {} bind parameters ({} rows x {} columns), \
             above the protocol limit of {}",
            sanitize_identifier(table),
            param_count,
            row_count,
            columns.len(),
            MAX_BIND_PARAMS
        );
    }

    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();

    let mut values = Vec::with_capacity(row_count);
    for row_idx in 0..row_count {
        let exprs: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(col_idx, column)| {
                let placeholder = row_idx * columns.len() + col_idx + 1;
                if column.is_binary() {
                    format!("decode(${}, 'base64')", placeholder)
                } else {
                    format!(
                        "(${}::text)::{}",
                        placeholder,
                        quote_ident(&column.udt_name)
                    )
                }
            })
            .collect();
        values.push(format!("({})", exprs.join(", ")));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        column_list.join(", "),
        values.join(", ")
    ))
}

/// Denormalize every row of the snapshot into bind text, row-major order
/// (all columns of row 0, then row 1) matching the statement's placeholder
/// numbering.
fn bind_rows(
    snapshot: &TableSnapshot,
    columns: &[ColumnInfo],
    warnings: &mut Vec<String>,
) -> Vec<Option<String>> {
    let mut params = Vec::with_capacity(snapshot.rows.len() * columns.len());
    let mut sniffed: HashSet<&str> = HashSet::new();

    for row in &snapshot.rows {
        for column in columns {
            let raw = row.get(&column.name).unwrap_or(&Value::Null);
            params.push(bind_value(snapshot, column, raw, warnings, &mut sniffed));
        }
    }

    params
}

fn bind_value<'c>(
    snapshot: &TableSnapshot,
    column: &'c ColumnInfo,
    raw: &Value,
    warnings: &mut Vec<String>,
    sniffed: &mut HashSet<&'c str>,
) -> Option<String> {
    // Repair pass for the legacy double-encoding defect
    let repaired = denormalize::repair_double_encoded(raw);
    let value = repaired.as_ref().unwrap_or(raw);

    if column.is_json() {
        return denormalize::json_column_text(value);
    }

    // The legacy shape heuristic survives as a warning only: base64-looking
    // text headed into a non-binary column may be misclassified binary, but
    // reinterpreting it would corrupt legitimate strings
    if !column.is_binary() {
        if let Value::String(s) = value {
            let recorded_binary =
                snapshot.column_kind(&column.name) == Some(ColumnKind::Binary);
            if (recorded_binary || denormalize::looks_like_base64(s))
                && sniffed.insert(column.name.as_str())
            {
                let warning = format!(
                    "Column '{}' of table '{}' carries base64-shaped text but the target \
                     column is '{}'; loading it as text",
                    sanitize_identifier(&column.name),
                    sanitize_identifier(&snapshot.name),
                    column.udt_name
                );
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    denormalize::bind_text(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::model::{ColumnSpec, RowRecord};
    use serde_json::json;

    fn col(name: &str, udt: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            udt_name: udt.to_string(),
            generated: false,
        }
    }

    fn snapshot_with_rows(name: &str, rows: Vec<RowRecord>) -> TableSnapshot {
        TableSnapshot {
            name: name.to_string(),
            row_count: rows.len() as u64,
            rows,
            columns: vec![],
        }
    }

    fn record(pairs: &[(&str, Value)]) -> RowRecord {
        let mut row = RowRecord::new();
        for (name, value) in pairs {
            row.insert(name.to_string(), value.clone());
        }
        row
    }

    #[test]
    fn test_build_insert_statement_casts_and_numbering() {
        let sql = build_insert_statement(
            "children",
            &[col("id", "int4"), col("payload", "bytea"), col("meta", "jsonb")],
            2,
        )
        .unwrap();

        assert_eq!(
            sql,
            "INSERT INTO \"children\" (\"id\", \"payload\", \"meta\") VALUES \
             (($1::text)::\"int4\", decode($2, 'base64'), ($3::text)::\"jsonb\"), \
             (($4::text)::\"int4\", decode($5, 'base64'), ($6::text)::\"jsonb\")"
        );
    }

    #[test]
    fn test_build_insert_statement_rejects_parameter_overflow() {
        let columns: Vec<ColumnInfo> = (0..10).map(|i| col(&format!("c{}", i), "text")).collect();
        let result = build_insert_statement("big", &columns, 7000);
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_rows_row_major_order() {
        let snapshot = snapshot_with_rows(
            "parents",
            vec![
                record(&[("id", json!(1)), ("name", json!("a"))]),
                record(&[("id", json!(2)), ("name", json!("b"))]),
            ],
        );
        let columns = [col("id", "int4"), col("name", "text")];
        let mut warnings = Vec::new();

        let params = bind_rows(&snapshot, &columns, &mut warnings);
        assert_eq!(
            params,
            vec![
                Some("1".to_string()),
                Some("a".to_string()),
                Some("2".to_string()),
                Some("b".to_string()),
            ]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_bind_rows_missing_column_becomes_null() {
        let snapshot = snapshot_with_rows(
            "parents",
            vec![
                record(&[("id", json!(1)), ("name", json!("a"))]),
                record(&[("id", json!(2))]),
            ],
        );
        let columns = [col("id", "int4"), col("name", "text")];
        let mut warnings = Vec::new();

        let params = bind_rows(&snapshot, &columns, &mut warnings);
        assert_eq!(params[3], None);
    }

    #[test]
    fn test_bind_value_repairs_double_encoded_json() {
        let snapshot = snapshot_with_rows(
            "documents",
            vec![record(&[("meta", json!({"{\"url\":\"http://x\"}": ""}))])],
        );
        let column = col("meta", "jsonb");
        let mut warnings = Vec::new();
        let mut sniffed = HashSet::new();

        let bound = bind_value(
            &snapshot,
            &column,
            &snapshot.rows[0]["meta"],
            &mut warnings,
            &mut sniffed,
        );
        assert_eq!(bound.unwrap(), "{\"url\":\"http://x\"}");
    }

    #[test]
    fn test_bind_value_warns_on_base64_shaped_text() {
        let payload = "QUJD".repeat(32);
        let snapshot = snapshot_with_rows(
            "documents",
            vec![
                record(&[("body", json!(payload))]),
                record(&[("body", json!(payload))]),
            ],
        );
        let columns = [col("body", "text")];
        let mut warnings = Vec::new();

        let params = bind_rows(&snapshot, &columns, &mut warnings);
        // Value is loaded as text, not reinterpreted
        assert_eq!(params[0].as_deref(), Some(payload.as_str()));
        // Warned once per column, not once per row
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("base64-shaped"));
    }

    #[test]
    fn test_bind_value_trusts_recorded_binary_metadata() {
        // Column metadata recorded at export says binary, but the target
        // column drifted to text: warn, load as text
        let mut snapshot = snapshot_with_rows(
            "documents",
            vec![record(&[("body", json!("AAEC"))])],
        );
        snapshot.columns = vec![ColumnSpec {
            name: "body".to_string(),
            kind: ColumnKind::Binary,
        }];
        let columns = [col("body", "text")];
        let mut warnings = Vec::new();

        let params = bind_rows(&snapshot, &columns, &mut warnings);
        assert_eq!(params[0].as_deref(), Some("AAEC"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_bind_value_json_string_scalar_stays_string() {
        let snapshot = snapshot_with_rows(
            "documents",
            vec![record(&[("meta", json!("true"))])],
        );
        let column = col("meta", "jsonb");
        let mut warnings = Vec::new();
        let mut sniffed = HashSet::new();

        let bound = bind_value(
            &snapshot,
            &column,
            &snapshot.rows[0]["meta"],
            &mut warnings,
            &mut sniffed,
        );
        // The JSON string "true" keeps its quotes; the target must not
        // store a boolean
        assert_eq!(bound.unwrap(), "\"true\"");
    }

    #[test]
    fn test_bind_value_json_column_reserializes() {
        let snapshot = snapshot_with_rows(
            "documents",
            vec![record(&[("meta", json!({"a": [1, 2]}))])],
        );
        let column = col("meta", "jsonb");
        let mut warnings = Vec::new();
        let mut sniffed = HashSet::new();

        let bound = bind_value(
            &snapshot,
            &column,
            &snapshot.rows[0]["meta"],
            &mut warnings,
            &mut sniffed,
        );
        assert_eq!(bound.unwrap(), "{\"a\":[1,2]}");
    }
}

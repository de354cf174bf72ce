// ABOUTME: Snapshot exporter that streams ordered table scans into an artifact
// ABOUTME: Skips empty tables, survives per-table failures, and reports per-table outcomes

pub mod normalize;

use crate::artifact::model::{ColumnKind, ColumnSpec, TableSnapshot};
use crate::artifact::writer::ArtifactWriter;
use crate::postgres::introspect::{self, ColumnInfo};
use crate::summary::{RunSummary, TableOutcome};
use crate::utils::quote_ident;
use anyhow::{bail, Context, Result};
use std::io::Write;
use tokio_postgres::Client;

/// Reads the configured tables from a source database and streams their
/// normalized rows into an [`ArtifactWriter`].
///
/// The connection handle is injected, never ambient, so tests can point the
/// exporter at any database.
pub struct SnapshotExporter<'a> {
    client: &'a Client,
}

impl<'a> SnapshotExporter<'a> {
    pub fn new(client: &'a Client) -> Self {
        SnapshotExporter { client }
    }

    /// Export every table in order, one at a time.
    ///
    /// A failing table is logged and recorded in the summary but does not stop
    /// the run; completeness is best-effort on this side. A closed connection
    /// is fatal immediately.
    pub async fn export_tables<W: Write>(
        &self,
        tables: &[String],
        writer: &mut ArtifactWriter<W>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::new();

        for table in tables {
            tracing::info!("Exporting table '{}'...", table);
            match self.export_table(table).await {
                Ok(Some(snapshot)) => {
                    let rows = snapshot.row_count;
                    writer.write_table(&snapshot)?;
                    tracing::info!("✓ Exported {} rows from '{}'", rows, table);
                    summary.record(table, TableOutcome::Completed { rows });
                }
                Ok(None) => {
                    // Empty tables are omitted from the artifact, not recorded
                    // as empty entries
                    tracing::info!("Table '{}' is empty, omitting from artifact", table);
                    summary.record(
                        table,
                        TableOutcome::Skipped {
                            reason: "table is empty".to_string(),
                        },
                    );
                }
                Err(e) => {
                    if self.client.is_closed() {
                        return Err(e.context("Lost connection to source database"));
                    }
                    tracing::warn!("Failed to export table '{}': {:#}", table, e);
                    summary.record(
                        table,
                        TableOutcome::Failed {
                            error: format!("{:#}", e),
                        },
                    );
                }
            }
        }

        Ok(summary)
    }

    async fn export_table(&self, table: &str) -> Result<Option<TableSnapshot>> {
        let columns = introspect::table_columns(self.client, table).await?;
        if columns.is_empty() {
            bail!(
                "Table '{}' does not exist in the source database",
                crate::utils::sanitize_identifier(table)
            );
        }

        let select = build_select(table, &columns);
        let rows = self.client.query(&select, &[]).await.with_context(|| {
            format!(
                "Failed to scan table '{}'",
                crate::utils::sanitize_identifier(table)
            )
        })?;

        if rows.is_empty() {
            return Ok(None);
        }

        let records = rows
            .iter()
            .map(|row| normalize::normalize_row(row, table))
            .collect::<Result<Vec<_>>>()?;

        let specs = columns
            .iter()
            .map(|c| ColumnSpec {
                name: c.name.clone(),
                kind: ColumnKind::from_udt(&c.udt_name),
            })
            .collect();

        Ok(Some(TableSnapshot {
            name: table.to_string(),
            row_count: records.len() as u64,
            rows: records,
            columns: specs,
        }))
    }
}

/// Build the full-scan select list for a table.
///
/// Natively decodable types pass through bare; everything else (timestamps,
/// numeric, uuid, arrays, enums) is cast to text so the scan never hits a
/// type the row decoder cannot handle.
fn build_select(table: &str, columns: &[ColumnInfo]) -> String {
    let select_list: Vec<String> = columns
        .iter()
        .map(|col| {
            let ident = quote_ident(&col.name);
            if normalize::NATIVE_UDTS.contains(&col.udt_name.as_str()) {
                ident
            } else {
                format!("{}::text AS {}", ident, quote_ident(&col.name))
            }
        })
        .collect();

    format!("SELECT {} FROM {}", select_list.join(", "), quote_ident(table))
}

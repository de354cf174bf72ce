// ABOUTME: Load orchestrator sequencing clearing, loading, and integrity restoration
// ABOUTME: Guarantees session_replication_role is restored on every exit path

use crate::artifact::model::SnapshotArtifact;
use crate::import::SnapshotImporter;
use crate::summary::{RunSummary, TableOutcome};
use crate::utils::{quote_ident, sanitize_identifier};
use anyhow::{Context, Result};
use tokio_postgres::Client;

/// Phases of one import run. Any error during `Clearing` or `Loading` moves
/// the run to `Restored` and then `Aborted`; integrity enforcement is always
/// restored before the process terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Init,
    Suspended,
    Clearing,
    Loading,
    Restored,
    Done,
    Aborted,
}

/// Drives one full import run against an injected target handle.
///
/// Strictly sequential: each table's clear, insert, and resync complete
/// before the next begins, and no transaction spans the run. Concurrent
/// readers see the target inconsistent while the run is active, so callers
/// must hold exclusive access (a maintenance window).
pub struct LoadOrchestrator<'a> {
    client: &'a Client,
}

impl<'a> LoadOrchestrator<'a> {
    pub fn new(client: &'a Client) -> Self {
        LoadOrchestrator { client }
    }

    /// Run the whole load: suspend integrity enforcement, clear in reverse
    /// order, load in forward order, restore enforcement, emit the summary.
    pub async fn run(&self, artifact: &SnapshotArtifact) -> Result<RunSummary> {
        tracing::info!(
            "Importing snapshot from {} ({} tables)",
            artifact.export_timestamp,
            artifact.tables.len()
        );

        self.suspend_integrity().await?;
        tracing::debug!("Load phase: {:?}", LoadPhase::Suspended);

        let result = self.clear_and_load(artifact).await;

        // Restoration happens on every exit path. If the process dies before
        // this point, the session is gone and the role setting with it, but a
        // run killed between statements must never skip this on its own.
        let restored = self.restore_integrity().await;
        tracing::debug!("Load phase: {:?}", LoadPhase::Restored);

        match result {
            Ok(summary) => {
                restored?;
                tracing::debug!("Load phase: {:?}", LoadPhase::Done);
                Ok(summary)
            }
            Err(e) => {
                if let Err(restore_err) = restored {
                    tracing::error!(
                        "Failed to restore integrity enforcement after abort: {:#}",
                        restore_err
                    );
                }
                tracing::debug!("Load phase: {:?}", LoadPhase::Aborted);
                Err(e)
            }
        }
    }

    async fn clear_and_load(&self, artifact: &SnapshotArtifact) -> Result<RunSummary> {
        let mut summary = RunSummary::new();

        // Clearing in reverse dependency order first is what makes repeated
        // imports of the same artifact idempotent
        tracing::debug!("Load phase: {:?}", LoadPhase::Clearing);
        for table in artifact.tables.iter().rev() {
            // Zero-row entries are skipped at load, so leave their target
            // tables untouched here as well
            if table.rows.is_empty() {
                continue;
            }
            self.clear_table(&table.name).await?;
        }

        tracing::debug!("Load phase: {:?}", LoadPhase::Loading);
        let importer = SnapshotImporter::new(self.client);
        for table in &artifact.tables {
            tracing::info!("Loading table '{}'...", table.name);
            match importer.load_table(table).await {
                Ok(report) => {
                    for warning in report.warnings {
                        summary.warn(warning);
                    }
                    match report.skipped_reason {
                        Some(reason) => {
                            summary.record(&table.name, TableOutcome::Skipped { reason })
                        }
                        None => summary.record(
                            &table.name,
                            TableOutcome::Completed {
                                rows: report.rows_loaded,
                            },
                        ),
                    }
                }
                Err(e) => {
                    summary.record(
                        &table.name,
                        TableOutcome::Failed {
                            error: format!("{:#}", e),
                        },
                    );
                    // Tables loaded before this point stay loaded; there is
                    // no cross-table rollback
                    summary.log("Import (aborted)");
                    return Err(e.context(format!(
                        "Import aborted at table '{}'",
                        sanitize_identifier(&table.name)
                    )));
                }
            }
        }

        Ok(summary)
    }

    /// Suspend referential-integrity enforcement for this session
    async fn suspend_integrity(&self) -> Result<()> {
        self.client
            .batch_execute("SET session_replication_role = 'replica'")
            .await
            .context("Failed to suspend referential-integrity enforcement")?;
        tracing::info!("Referential-integrity enforcement suspended for this session");
        Ok(())
    }

    async fn restore_integrity(&self) -> Result<()> {
        self.client
            .batch_execute("SET session_replication_role = 'origin'")
            .await
            .context("Failed to restore referential-integrity enforcement")?;
        tracing::info!("Referential-integrity enforcement restored");
        Ok(())
    }

    /// Cascade-clear one table, dependents included
    async fn clear_table(&self, table: &str) -> Result<()> {
        tracing::info!("Clearing table '{}'...", table);
        self.client
            .batch_execute(&format!("TRUNCATE TABLE {} CASCADE", quote_ident(table)))
            .await
            .with_context(|| {
                format!("Failed to clear table '{}'", sanitize_identifier(table))
            })?;
        Ok(())
    }
}

// ABOUTME: Export command wiring connection, exporter, and artifact files
// ABOUTME: Writes a timestamped artifact plus the canonical snapshot-latest.json

use crate::artifact::ArtifactWriter;
use crate::export::SnapshotExporter;
use crate::{postgres, utils};
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::path::Path;

/// Latest-artifact filename downstream tooling watches
pub const LATEST_ARTIFACT_NAME: &str = "snapshot-latest.json";

/// Export a snapshot of the configured tables to `output_dir`.
///
/// Per-table failures are recorded in the summary but do not fail the run;
/// the exit status is zero whenever the artifact itself was written.
pub async fn export(source_url: &str, output_dir: &Path, tables: &[String]) -> Result<()> {
    utils::validate_connection_string(source_url)?;

    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    tracing::info!("Connecting to source database...");
    let client = postgres::connect(source_url).await?;

    let now = Utc::now();
    let export_timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let artifact_path = output_dir.join(format!(
        "snapshot-{}.json",
        now.format("%Y%m%dT%H%M%SZ")
    ));

    tracing::info!(
        "Exporting {} tables to {}",
        tables.len(),
        artifact_path.display()
    );

    // One file handle for the whole run, flushed and closed by finish()
    let mut writer = ArtifactWriter::create(&artifact_path, &export_timestamp)?;
    let exporter = SnapshotExporter::new(&client);
    let summary = exporter.export_tables(tables, &mut writer).await?;
    writer.finish()?;

    let latest_path = output_dir.join(LATEST_ARTIFACT_NAME);
    std::fs::copy(&artifact_path, &latest_path).with_context(|| {
        format!(
            "Failed to copy artifact to latest path: {}",
            latest_path.display()
        )
    })?;

    summary.log("Export");
    if summary.is_degraded() {
        tracing::warn!("Export finished with gaps - check the summary above");
    }
    tracing::info!(
        "✅ Snapshot written to {} (latest: {})",
        artifact_path.display(),
        latest_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_export_rejects_invalid_connection_string() {
        let dir = tempfile::tempdir().unwrap();
        let result = export("not-a-url", dir.path(), &["parents".to_string()]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_export_writes_timestamped_and_latest_artifacts() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let dir = tempfile::tempdir().unwrap();

        export(&url, dir.path(), &["parents".to_string(), "children".to_string()])
            .await
            .unwrap();

        assert!(dir.path().join(LATEST_ARTIFACT_NAME).exists());
        let timestamped: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with("snapshot-2") && name.ends_with(".json")
            })
            .collect();
        assert_eq!(timestamped.len(), 1);
    }
}

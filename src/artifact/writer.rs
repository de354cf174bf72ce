// ABOUTME: Streaming artifact writer that emits one table at a time
// ABOUTME: Owns structural punctuation so the file is valid JSON for any table count

use crate::artifact::model::TableSnapshot;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Incremental writer for the snapshot artifact.
///
/// The artifact can be large, so tables are serialized one at a time rather
/// than buffering the whole snapshot. Separator commas are tracked here, not
/// by callers: `finish` must be called to close the document, otherwise the
/// file is left syntactically incomplete.
pub struct ArtifactWriter<W: Write> {
    out: W,
    tables_written: usize,
}

impl ArtifactWriter<BufWriter<File>> {
    /// Create the artifact file and write the document head
    pub fn create(path: &Path, export_timestamp: &str) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create artifact file: {}", path.display()))?;
        Self::new(BufWriter::new(file), export_timestamp)
    }
}

impl<W: Write> ArtifactWriter<W> {
    pub fn new(mut out: W, export_timestamp: &str) -> Result<Self> {
        let timestamp_json = serde_json::to_string(export_timestamp)?;
        write!(out, "{{\"export_timestamp\":{},\"tables\":[", timestamp_json)
            .context("Failed to write artifact header")?;
        Ok(ArtifactWriter {
            out,
            tables_written: 0,
        })
    }

    /// Append one table snapshot, emitting the separator if needed
    pub fn write_table(&mut self, snapshot: &TableSnapshot) -> Result<()> {
        if self.tables_written > 0 {
            self.out
                .write_all(b",")
                .context("Failed to write table separator")?;
        }
        serde_json::to_writer(&mut self.out, snapshot).with_context(|| {
            format!(
                "Failed to serialize snapshot of table '{}'",
                crate::utils::sanitize_identifier(&snapshot.name)
            )
        })?;
        self.tables_written += 1;
        Ok(())
    }

    pub fn tables_written(&self) -> usize {
        self.tables_written
    }

    /// Close the document and flush, returning the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.out
            .write_all(b"]}")
            .context("Failed to write artifact trailer")?;
        self.out.flush().context("Failed to flush artifact file")?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::model::{RowRecord, SnapshotArtifact};
    use serde_json::json;

    fn snapshot(name: &str, n_rows: usize) -> TableSnapshot {
        let rows: Vec<RowRecord> = (0..n_rows)
            .map(|i| {
                let mut row = RowRecord::new();
                row.insert("id".to_string(), json!(i as i64 + 1));
                row
            })
            .collect();
        TableSnapshot {
            name: name.to_string(),
            row_count: rows.len() as u64,
            rows,
            columns: vec![],
        }
    }

    fn write_and_parse(snapshots: &[TableSnapshot]) -> SnapshotArtifact {
        let mut writer = ArtifactWriter::new(Vec::new(), "2026-01-02T03:04:05Z").unwrap();
        for snap in snapshots {
            writer.write_table(snap).unwrap();
        }
        let bytes = writer.finish().unwrap();
        serde_json::from_slice(&bytes).expect("writer output must be valid JSON")
    }

    #[test]
    fn test_empty_artifact_is_valid_json() {
        let artifact = write_and_parse(&[]);
        assert_eq!(artifact.export_timestamp, "2026-01-02T03:04:05Z");
        assert!(artifact.tables.is_empty());
    }

    #[test]
    fn test_single_table_has_no_trailing_separator() {
        let artifact = write_and_parse(&[snapshot("parents", 3)]);
        assert_eq!(artifact.tables.len(), 1);
        assert_eq!(artifact.tables[0].row_count, 3);
    }

    #[test]
    fn test_multiple_tables_preserve_order() {
        let artifact = write_and_parse(&[snapshot("parents", 3), snapshot("children", 5)]);
        assert_eq!(artifact.tables.len(), 2);
        assert_eq!(artifact.tables[0].name, "parents");
        assert_eq!(artifact.tables[1].name, "children");
    }

    #[test]
    fn test_timestamp_is_escaped() {
        let mut writer = ArtifactWriter::new(Vec::new(), "odd\"stamp").unwrap();
        let snap = snapshot("parents", 1);
        writer.write_table(&snap).unwrap();
        let bytes = writer.finish().unwrap();

        let artifact: SnapshotArtifact = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(artifact.export_timestamp, "odd\"stamp");
    }
}

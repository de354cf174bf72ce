// ABOUTME: Artifact file reader and structural validation
// ABOUTME: Parses a snapshot artifact and checks its row-count invariants

use crate::artifact::model::SnapshotArtifact;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read and validate a snapshot artifact file.
///
/// A missing path is reported here, before any database contact, so a typoed
/// path never reaches the target.
pub fn read_artifact(path: &Path) -> Result<SnapshotArtifact> {
    if !path.is_file() {
        bail!(
            "Artifact not found: {}\n\
             Usage: postgres-snapshot-migrator import --target <url> <ARTIFACT>",
            path.display()
        );
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open artifact file: {}", path.display()))?;
    let artifact: SnapshotArtifact = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse artifact file: {}", path.display()))?;

    artifact.validate()?;

    tracing::debug!(
        "Parsed artifact from {} ({} tables, exported {})",
        path.display(),
        artifact.tables.len(),
        artifact.export_timestamp
    );

    Ok(artifact)
}

// ABOUTME: Snapshot artifact module
// ABOUTME: Data model plus streaming writer and reader for the artifact file

pub mod model;
pub mod reader;
pub mod writer;

pub use model::{ColumnKind, ColumnSpec, RowRecord, SnapshotArtifact, TableSnapshot};
pub use reader::read_artifact;
pub use writer::ArtifactWriter;

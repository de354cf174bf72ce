// ABOUTME: Table-order configuration for snapshot runs
// ABOUTME: Resolves the ordered table list from CLI flags, a TOML file, or built-in defaults

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Default table order for the application schema.
///
/// Order encodes foreign-key dependencies: parent tables precede child
/// tables. Export writes tables in this order, import loads in this order
/// and clears in reverse. The order is configured, never discovered.
pub const DEFAULT_TABLE_ORDER: &[&str] = &[
    "companies",
    "departments",
    "employees",
    "projects",
    "assignments",
    "documents",
    "form_submissions",
];

#[derive(Debug, Deserialize)]
struct SnapshotConfig {
    tables: Vec<String>,
}

/// Resolve the ordered table list for a run
///
/// Precedence: explicit CLI list, then TOML config file, then the built-in
/// default order. The resulting list must be non-empty and free of
/// duplicates (a duplicate would be cleared and loaded twice).
pub fn resolve_table_order(
    cli_tables: Option<Vec<String>>,
    config_path: Option<&str>,
) -> Result<Vec<String>> {
    let tables = if let Some(tables) = cli_tables {
        tables
    } else if let Some(path) = config_path {
        load_table_order_from_file(path)?
    } else {
        DEFAULT_TABLE_ORDER.iter().map(|t| t.to_string()).collect()
    };

    validate_table_order(&tables)?;
    Ok(tables)
}

/// Load the table order from a TOML file with a top-level `tables = [...]` key
pub fn load_table_order_from_file(path: &str) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;
    let config: SnapshotConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path))?;
    Ok(config.tables)
}

fn validate_table_order(tables: &[String]) -> Result<()> {
    if tables.is_empty() {
        bail!("Table list is empty - nothing to snapshot");
    }

    for (idx, table) in tables.iter().enumerate() {
        if table.trim().is_empty() {
            bail!("Table list entry {} is empty", idx + 1);
        }
        if tables[..idx].contains(table) {
            bail!(
                "Table '{}' appears more than once in the table order",
                crate::utils::sanitize_identifier(table)
            );
        }
    }

    Ok(())
}

// ABOUTME: Per-row value normalization for the export path
// ABOUTME: Maps Postgres values to transport-safe JSON (base64 binary, truncated text)

use crate::artifact::model::RowRecord;
use anyhow::{Context, Result};
use base64::Engine;
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::Row;

/// Text scalars above this size are truncated before transport (lossy by design)
pub const MAX_TEXT_BYTES: usize = 10 * 1024 * 1024;

/// Sentinel appended to truncated text so the loss is detectable downstream
pub const TRUNCATION_SUFFIX: &str = "...[truncated]";

/// Types the exporter decodes natively; everything else is cast to text in
/// the select list and arrives through the text branch
pub const NATIVE_UDTS: &[&str] = &[
    "bool", "int2", "int4", "int8", "float4", "float8", "text", "varchar", "bpchar", "name",
    "bytea", "json", "jsonb",
];

/// Normalize one result row into its transport form
pub fn normalize_row(row: &Row, table: &str) -> Result<RowRecord> {
    let mut record = RowRecord::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = normalize_column(row, idx, table).with_context(|| {
            format!(
                "Failed to normalize column '{}' of table '{}'",
                column.name(),
                crate::utils::sanitize_identifier(table)
            )
        })?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn normalize_column(row: &Row, idx: usize, table: &str) -> Result<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();

    let value = match ty {
        t if *t == Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)?
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        t if *t == Type::INT2 => integer_value(row.try_get::<_, Option<i16>>(idx)?.map(i64::from)),
        t if *t == Type::INT4 => integer_value(row.try_get::<_, Option<i32>>(idx)?.map(i64::from)),
        t if *t == Type::INT8 => integer_value(row.try_get::<_, Option<i64>>(idx)?),
        t if *t == Type::FLOAT4 => {
            float_value(row.try_get::<_, Option<f32>>(idx)?.map(f64::from))
        }
        t if *t == Type::FLOAT8 => float_value(row.try_get::<_, Option<f64>>(idx)?),
        t if *t == Type::BYTEA => binary_value(row.try_get::<_, Option<Vec<u8>>>(idx)?),
        t if *t == Type::JSON || *t == Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)?
            .unwrap_or(Value::Null),
        // TEXT, VARCHAR, BPCHAR, NAME, and every exotic type the select
        // list already cast to text
        _ => match row.try_get::<_, Option<String>>(idx)? {
            Some(s) => {
                let (text, truncated) = truncate_text(s);
                if truncated {
                    tracing::warn!(
                        "Truncated oversized text in {}.{} to {} bytes",
                        crate::utils::sanitize_identifier(table),
                        column.name(),
                        MAX_TEXT_BYTES
                    );
                }
                Value::String(text)
            }
            None => Value::Null,
        },
    };

    Ok(value)
}

fn integer_value(value: Option<i64>) -> Value {
    value.map(|i| Value::Number(i.into())).unwrap_or(Value::Null)
}

/// Non-finite floats have no JSON number form and are carried as strings
pub fn float_value(value: Option<f64>) -> Value {
    match value {
        Some(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        None => Value::Null,
    }
}

fn binary_value(value: Option<Vec<u8>>) -> Value {
    match value {
        Some(bytes) => Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)),
        None => Value::Null,
    }
}

/// Cap text at MAX_TEXT_BYTES on a char boundary, appending the sentinel
pub fn truncate_text(mut text: String) -> (String, bool) {
    if text.len() <= MAX_TEXT_BYTES {
        return (text, false);
    }
    let mut end = MAX_TEXT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push_str(TRUNCATION_SUFFIX);
    (text, true)
}

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Row, Table};
use crate::error::BridgeError;

/// Extensions accepted by [`load_table`]; `.arff` is handled by the trainer.
pub const TABLE_EXTENSIONS: &[&str] = &["csv", "json", "parquet", "pq"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Lower-cased extension of `path`, or an empty string.
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Load an input table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, one record per line
/// * `.json`    – `[{ "Age": "25-34", "Current_brand": "Apple", ... }, ...]`
/// * `.parquet` – flat columns of strings, integers, floats or booleans
///
/// Files larger than `max_bytes` are rejected before any parsing.
pub fn load_table(path: &Path, max_bytes: u64) -> crate::error::Result<Table> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(BridgeError::InputTooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_bytes,
        });
    }

    let loaded = match extension(path).as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => {
            return Err(BridgeError::UnsupportedInput {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported file extension .{other}, expected one of {}",
                    TABLE_EXTENSIONS.join(", ")
                ),
            });
        }
    };

    let table = loaded.map_err(|source| BridgeError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Parsed {} row(s) from {} with columns {:?}",
        table.len(),
        path.display(),
        table.column_names
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, every other row is a record.
/// A UTF-8 byte-order mark on the first header is dropped and header names
/// are trimmed. Short records simply lack the trailing columns.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(Table::new(headers, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "Age": "25-34", "Income": 30000, "Current_brand": "Apple" },
///   ...
/// ]
/// ```
///
/// Numbers and booleans are kept as their text form; `null` is missing.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut row = Row::new();
        for (key, val) in obj {
            if !column_names.iter().any(|c| c == key) {
                column_names.push(key.clone());
            }
            if let Some(text) = json_to_text(val) {
                row.insert(key.clone(), text);
            }
        }
        rows.push(row);
    }

    Ok(Table::new(column_names, rows))
}

fn json_to_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Null cells are left out of the row.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        for row_idx in 0..batch.num_rows() {
            let mut row = Row::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = extract_text(batch.column(col_idx), row_idx)
                    .with_context(|| format!("Row {row_idx}: column '{}'", field.name()))?;
                if let Some(value) = value {
                    row.insert(field.name().clone(), value);
                }
            }
            rows.push(row);
        }
    }

    Ok(Table::new(column_names, rows))
}

// -- Parquet / Arrow helpers --

fn downcast<'a, T: 'static>(col: &'a Arc<dyn Array>) -> Result<&'a T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array layout for {:?}", col.data_type()))
}

/// Extract a single cell from an Arrow column as text.
fn extract_text(col: &Arc<dyn Array>, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let text = match col.data_type() {
        DataType::Utf8 => downcast::<StringArray>(col)?.value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Int32 => downcast::<Int32Array>(col)?.value(row).to_string(),
        DataType::Int64 => downcast::<Int64Array>(col)?.value(row).to_string(),
        DataType::Float32 => downcast::<Float32Array>(col)?.value(row).to_string(),
        DataType::Float64 => downcast::<Float64Array>(col)?.value(row).to_string(),
        DataType::Boolean => downcast::<BooleanArray>(col)?.value(row).to_string(),
        other => bail!("Unsupported column type {other:?}"),
    };
    Ok(Some(text))
}

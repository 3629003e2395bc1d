use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array,
    Int32Array, Int64Array, StringArray, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Dataset, Record};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a shipment table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat columns of text, numbers, booleans, dates or timestamps
/// * `.json`    – `[{ "TRANSPORTER": "...", "INV DATE": "...", ... }, ...]`
/// * `.csv`     – header row followed by one row per shipment
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!(
        "Loaded {} rows with columns {:?}",
        dataset.len(),
        dataset.columns()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "TRANSPORTER": "Acme", "INV DATE": "2025-03-01", "INV -QNT-KG": 2000, ... },
///   ...
/// ]
/// ```
///
/// Columns are taken in first-seen key order; a key missing from a record is null.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            let cells = columns
                .iter()
                .map(|col| obj.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect();
            Record::new(cells)
        })
        .collect();

    Ok(Dataset::new(columns, rows)?)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one shipment per row.
/// Cell types are guessed per cell.
fn load_csv(path: &Path) -> Result<Dataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Dataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(Record::new(record.iter().map(guess_cell_type).collect()));
    }

    Ok(Dataset::new(headers, rows)?)
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one shipment per row.
///
/// Every column is read as a flat value (strings, ints, floats, bools,
/// Date32/Date64 and timestamps). Narrow or unsigned integers, half floats,
/// decimals, string views and dictionary-encoded columns (pandas categoricals)
/// are cast to one of those first. Any other column type is an error. Works
/// with files written by both **Pandas** (`df.to_parquet()`) and **Polars**
/// (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let mut columns = Vec::new();
    let mut targets = Vec::new();
    for field in builder.schema().fields() {
        let (name, dt) = (field.name(), field.data_type());
        let target = readable_type(dt)
            .ok_or_else(|| anyhow!("column '{name}': unsupported parquet type {dt:?}"))?;
        if &target != dt {
            debug!("Reading parquet column '{name}' ({dt:?}) as {target:?}");
        }
        columns.push(name.clone());
        targets.push(target);
    }
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let arrays = batch
            .columns()
            .iter()
            .zip(&targets)
            .zip(&columns)
            .map(|((col, target), name)| {
                if col.data_type() == target {
                    Ok(Arc::clone(col))
                } else {
                    cast(col, target).with_context(|| format!("casting column '{name}'"))
                }
            })
            .collect::<Result<Vec<ArrayRef>>>()?;
        for row in 0..batch.num_rows() {
            let cells = arrays
                .iter()
                .map(|col| extract_cell_value(col, row))
                .collect();
            rows.push(Record::new(cells));
        }
    }

    Ok(Dataset::new(columns, rows)?)
}

// -- Parquet / Arrow helpers --

/// The Arrow type a column of type `dt` is read as, or `None` when it has no
/// cell representation.
fn readable_type(dt: &DataType) -> Option<DataType> {
    match dt {
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Boolean
        | DataType::Date32
        | DataType::Date64
        | DataType::Timestamp(_, _) => Some(dt.clone()),
        DataType::Int8
        | DataType::Int16
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => Some(DataType::Int64),
        DataType::Float16 | DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => {
            Some(DataType::Float64)
        }
        DataType::Utf8View => Some(DataType::Utf8),
        DataType::Dictionary(_, value) => readable_type(value),
        _ => None,
    }
}

/// Extract a single cell from an Arrow column at a given row.
///
/// The column must already hold one of the types [`readable_type`] returns
/// unchanged.
fn extract_cell_value(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| CellValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => Some(CellValue::String(
            col.as_string::<i64>().value(row).to_string(),
        )),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row))),
        DataType::Date32 => any
            .downcast_ref::<Date32Array>()
            .and_then(|a| date32_to_datetime(a.value(row)))
            .map(CellValue::DateTime),
        DataType::Date64 => any
            .downcast_ref::<Date64Array>()
            .and_then(|a| DateTime::from_timestamp_millis(a.value(row)))
            .map(|d| CellValue::DateTime(d.naive_utc())),
        DataType::Timestamp(unit, _) => timestamp_value(any, unit, row).map(CellValue::DateTime),
        _ => None,
    };
    value.unwrap_or(CellValue::Null)
}

fn date32_to_datetime(days: i32) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    epoch
        .checked_add_signed(chrono::Duration::days(days as i64))
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
}

fn timestamp_value(any: &dyn std::any::Any, unit: &TimeUnit, row: usize) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Second => any
            .downcast_ref::<TimestampSecondArray>()
            .and_then(|a| DateTime::from_timestamp(a.value(row), 0)),
        TimeUnit::Millisecond => any
            .downcast_ref::<TimestampMillisecondArray>()
            .and_then(|a| DateTime::from_timestamp_millis(a.value(row))),
        TimeUnit::Microsecond => any
            .downcast_ref::<TimestampMicrosecondArray>()
            .and_then(|a| DateTime::from_timestamp_micros(a.value(row))),
        TimeUnit::Nanosecond => any
            .downcast_ref::<TimestampNanosecondArray>()
            .map(|a| DateTime::from_timestamp_nanos(a.value(row))),
    };
    dt.map(|d| d.naive_utc())
}

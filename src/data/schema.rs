//! Column names and heuristic schema resolution.
//!
//! Most columns of a shipment table are fixed literal names the loader must
//! provide. Two are found heuristically because their exact spelling varies
//! between exports: the quantity-in-kilograms column and the primary date
//! column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use serde::Serialize;

use super::model::{CellValue, Dataset};
use crate::error::{PipelineError, Result};

// ── Literal columns ─────────────────────────────────────────────────────────
pub mod columns {
    pub const TRANSPORTER: &str = "TRANSPORTER";
    pub const LOADING_LOCATION: &str = "LOADING LOCATION";
    pub const INVOICE_LOCATION: &str = "INV LOCATION";
    pub const PAYMENT_BY: &str = "PAYMENT BY";
    pub const VEHICLE_NUMBER: &str = "VEHICLE NUMBER";
    pub const INVOICE_VALUE: &str = "INV -VALUE";

    /// Derived column holding quantity in metric tons.
    pub const QUANTITY_MT: &str = "INV -QNT-MT";
}

// ── Heuristic markers ───────────────────────────────────────────────────────
const QUANTITY_MARKERS: [&str; 2] = ["QNT", "KG"];
const DATE_MARKER: &str = "DATE";

/// Concrete column names discovered for the quantity and date roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSchema {
    pub quantity: String,
    pub date: String,
}

/// Resolve the quantity and date columns from an ordered list of names.
///
/// The first trimmed name whose uppercase form contains both `QNT` and `KG`
/// is the quantity column; the first containing `DATE` is the date column.
/// Later matches are ignored.
pub fn resolve<S: AsRef<str>>(columns: &[S]) -> Result<ResolvedSchema> {
    let trimmed: Vec<&str> = columns.iter().map(|c| c.as_ref().trim()).collect();

    let quantity = trimmed
        .iter()
        .find(|name| {
            let upper = name.to_uppercase();
            QUANTITY_MARKERS.iter().all(|m| upper.contains(m))
        })
        .ok_or(PipelineError::MissingQuantityColumn)?;

    let date = trimmed
        .iter()
        .find(|name| name.to_uppercase().contains(DATE_MARKER))
        .ok_or(PipelineError::MissingDateColumn)?;

    debug!("Resolved quantity column '{quantity}' and date column '{date}'");
    Ok(ResolvedSchema {
        quantity: quantity.to_string(),
        date: date.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Date normalization
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%m/%d/%Y"];

/// Parse a textual date or date-time. Date-only text lands on midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Convert every cell of the resolved date column into a timestamp.
///
/// Nulls and blank text stay null. Anything that does not parse fails with
/// [`PipelineError::DateParse`].
pub fn normalize_date_column(mut dataset: Dataset, schema: &ResolvedSchema) -> Result<Dataset> {
    let idx = dataset.require_column(&schema.date)?;
    for (row, record) in dataset.records_mut().iter_mut().enumerate() {
        let cell = &mut record.cells[idx];
        let normalized = match &*cell {
            CellValue::DateTime(_) | CellValue::Null => continue,
            CellValue::String(s) if s.trim().is_empty() => CellValue::Null,
            CellValue::String(s) => match parse_timestamp(s) {
                Some(ts) => CellValue::DateTime(ts),
                None => return Err(date_parse_error(schema, row, s.clone())),
            },
            other => return Err(date_parse_error(schema, row, other.to_string())),
        };
        *cell = normalized;
    }
    Ok(dataset)
}

fn date_parse_error(schema: &ResolvedSchema, row: usize, value: String) -> PipelineError {
    PipelineError::DateParse {
        column: schema.date.clone(),
        row,
        value,
    }
}

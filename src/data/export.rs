use std::io::Write;
use std::path::Path;

use log::info;

use super::filter::FilteredDataset;
use super::model::{format_timestamp, CellValue};
use crate::error::Result;

/// File name offered for the filtered-data download.
pub const EXPORT_FILE_NAME: &str = "Filtered_Data.csv";

/// Write the filtered rows as UTF-8 CSV: trimmed source columns, then the
/// derived metric-ton column. A source that already has `INV -QNT-MT` gets
/// that column overwritten instead.
pub fn write_csv<W: Write>(filtered: &FilteredDataset<'_>, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(filtered.columns())?;
    let mt_position = filtered.quantity_mt_position();
    for row in filtered.rows() {
        let mut fields: Vec<String> = row.record.cells.iter().map(csv_field).collect();
        let mt = row.quantity_mt.map(format_float).unwrap_or_default();
        match fields.get_mut(mt_position) {
            Some(field) => *field = mt,
            None => fields.push(mt),
        }
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}

/// In-memory CSV payload, e.g. for a download button.
pub fn to_csv_bytes(filtered: &FilteredDataset<'_>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(filtered, &mut buf)?;
    Ok(buf)
}

pub fn export_to_path(filtered: &FilteredDataset<'_>, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(filtered, std::io::BufWriter::new(file))?;
    info!("Exported {} rows to {}", filtered.len(), path.display());
    Ok(())
}

fn csv_field(value: &CellValue) -> String {
    match value {
        CellValue::String(s) => s.clone(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Float(v) => format_float(*v),
        CellValue::Bool(b) => b.to_string(),
        CellValue::DateTime(d) => format_timestamp(d),
        CellValue::Null => String::new(),
    }
}

// Keep a decimal point on whole numbers so the column still reads as float.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v:?}")
    }
}

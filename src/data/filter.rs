use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use log::debug;
use serde::Serialize;

use super::model::{CellValue, Dataset, Record};
use super::schema::{columns, parse_timestamp, ResolvedSchema};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Categorical fields exposed as filters
// ---------------------------------------------------------------------------

/// The four categorical columns a user can narrow by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CategoricalField {
    Transporter,
    LoadingLocation,
    InvoiceLocation,
    PaymentBy,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 4] = [
        CategoricalField::Transporter,
        CategoricalField::LoadingLocation,
        CategoricalField::InvoiceLocation,
        CategoricalField::PaymentBy,
    ];

    /// Literal column name backing this field.
    pub fn column(self) -> &'static str {
        match self {
            CategoricalField::Transporter => columns::TRANSPORTER,
            CategoricalField::LoadingLocation => columns::LOADING_LOCATION,
            CategoricalField::InvoiceLocation => columns::INVOICE_LOCATION,
            CategoricalField::PaymentBy => columns::PAYMENT_BY,
        }
    }

    /// Human-readable label for selection widgets and reports.
    pub fn label(self) -> &'static str {
        match self {
            CategoricalField::Transporter => "Logistics Partner",
            CategoricalField::LoadingLocation => "Loading Location",
            CategoricalField::InvoiceLocation => "Invoice Location",
            CategoricalField::PaymentBy => "Payment Mode",
        }
    }
}

// ---------------------------------------------------------------------------
// Filter criteria
// ---------------------------------------------------------------------------

/// Per-field selection state: maps field → set of selected values.
/// If a field is absent or its set is empty, it means "no filter" (match all).
/// Clearing a selection therefore widens the result; it never hides every row.
pub type Selections = BTreeMap<CategoricalField, BTreeSet<CellValue>>;

/// Closed timestamp interval, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        DateRange { start, end }
    }

    /// `start <= ts <= end`. An inverted range contains nothing.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Categorical selections plus an optional date interval.
/// A missing interval means the date column is not constrained at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub selections: Selections,
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    /// Criteria that keep every row.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection<I, V>(mut self, field: CategoricalField, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.selections
            .insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Whether this field currently restricts anything.
    pub fn is_active(&self, field: CategoricalField) -> bool {
        self.selections
            .get(&field)
            .is_some_and(|selected| !selected.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Column positions used by filtering and aggregation
// ---------------------------------------------------------------------------

/// Positions of every column the pipeline reads, looked up once per dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub quantity: usize,
    pub date: usize,
    pub transporter: usize,
    pub loading_location: usize,
    pub invoice_location: usize,
    pub payment_by: usize,
    pub vehicle: usize,
    pub invoice_value: usize,
}

impl ColumnIndex {
    /// Locate the resolved and literal columns, failing with `MissingColumn`.
    pub fn resolve(dataset: &Dataset, schema: &ResolvedSchema) -> Result<Self> {
        Ok(ColumnIndex {
            quantity: dataset.require_column(&schema.quantity)?,
            date: dataset.require_column(&schema.date)?,
            transporter: dataset.require_column(CategoricalField::Transporter.column())?,
            loading_location: dataset.require_column(CategoricalField::LoadingLocation.column())?,
            invoice_location: dataset.require_column(CategoricalField::InvoiceLocation.column())?,
            payment_by: dataset.require_column(CategoricalField::PaymentBy.column())?,
            vehicle: dataset.require_column(columns::VEHICLE_NUMBER)?,
            invoice_value: dataset.require_column(columns::INVOICE_VALUE)?,
        })
    }

    pub fn field(&self, field: CategoricalField) -> usize {
        match field {
            CategoricalField::Transporter => self.transporter,
            CategoricalField::LoadingLocation => self.loading_location,
            CategoricalField::InvoiceLocation => self.invoice_location,
            CategoricalField::PaymentBy => self.payment_by,
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return indices of records that pass all active filters, in source order.
///
/// A record passes when:
/// * every field with a non-empty selection holds one of the selected values
/// * its date lies inside `date_range`, if one is set (a null date fails)
///
/// Date cells still holding text are parsed on the fly; text that does not
/// parse fails the date predicate like a null.
pub fn filtered_indices(
    dataset: &Dataset,
    index: &ColumnIndex,
    criteria: &FilterCriteria,
) -> Vec<usize> {
    let active: Vec<(usize, &BTreeSet<CellValue>)> = criteria
        .selections
        .iter()
        .filter(|(_, selected)| !selected.is_empty())
        .map(|(field, selected)| (index.field(*field), selected))
        .collect();

    if let Some(range) = &criteria.date_range {
        if range.is_inverted() {
            debug!("Inverted date range {} > {}, nothing matches", range.start, range.end);
            return Vec::new();
        }
    }

    dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            for (col, selected) in &active {
                if !selected.contains(record.get(*col)) {
                    return false;
                }
            }
            match &criteria.date_range {
                Some(range) => {
                    row_timestamp(record.get(index.date)).is_some_and(|ts| range.contains(ts))
                }
                None => true,
            }
        })
        .map(|(i, _)| i)
        .collect()
}

fn row_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(ts) => Some(*ts),
        CellValue::String(text) => parse_timestamp(text),
        _ => None,
    }
}

/// Narrow `dataset` by `criteria` and attach the derived metric-ton quantity.
pub fn filter<'a>(
    dataset: &'a Dataset,
    schema: &ResolvedSchema,
    criteria: &FilterCriteria,
) -> Result<FilteredDataset<'a>> {
    let index = ColumnIndex::resolve(dataset, schema)?;
    let indices = filtered_indices(dataset, &index, criteria);
    debug!("Filter kept {} of {} rows", indices.len(), dataset.len());
    Ok(FilteredDataset::from_indices(dataset, index, indices))
}

// ---------------------------------------------------------------------------
// FilteredDataset – non-destructive view over the source rows
// ---------------------------------------------------------------------------

/// Retained rows of a source dataset plus their derived metric-ton quantity.
#[derive(Debug, Clone)]
pub struct FilteredDataset<'a> {
    source: &'a Dataset,
    index: ColumnIndex,
    indices: Vec<usize>,
    quantity_mt: Vec<Option<f64>>,
    /// Position of an existing `INV -QNT-MT` source column, overwritten on output.
    mt_column: Option<usize>,
}

/// One retained row.
#[derive(Debug, Clone, Copy)]
pub struct FilteredRow<'a> {
    pub record: &'a Record,
    /// Quantity in metric tons; `None` when the kg cell is not numeric.
    pub quantity_mt: Option<f64>,
}

impl<'a> FilteredDataset<'a> {
    /// Every index must be a valid record position in `source`.
    pub(crate) fn from_indices(
        source: &'a Dataset,
        index: ColumnIndex,
        indices: Vec<usize>,
    ) -> Self {
        let quantity_mt = indices
            .iter()
            .map(|&i| source.records()[i].get(index.quantity).as_f64().map(kg_to_mt))
            .collect();
        FilteredDataset {
            source,
            index,
            indices,
            quantity_mt,
            mt_column: source.column_index(columns::QUANTITY_MT),
        }
    }

    pub fn column_index(&self) -> &ColumnIndex {
        &self.index
    }

    /// Positions of the retained rows in the source dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Source columns followed by the derived metric-ton column, unless the
    /// source already carries one.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = self.source.columns().to_vec();
        if self.mt_column.is_none() {
            cols.push(columns::QUANTITY_MT.to_string());
        }
        cols
    }

    /// Where the derived metric-ton value sits in an output row: the source's
    /// own `INV -QNT-MT` column, or one past the last source column.
    pub fn quantity_mt_position(&self) -> usize {
        self.mt_column.unwrap_or(self.source.columns().len())
    }

    pub fn rows(&self) -> impl Iterator<Item = FilteredRow<'a>> + '_ {
        let source = self.source;
        self.indices
            .iter()
            .zip(&self.quantity_mt)
            .map(move |(&i, &quantity_mt)| FilteredRow {
                record: &source.records()[i],
                quantity_mt,
            })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Copy the retained rows into a standalone dataset with the source columns.
    pub fn materialize(&self) -> Dataset {
        let records = self.rows().map(|row| row.record.clone()).collect();
        self.source.with_records(records)
    }
}

pub fn kg_to_mt(kg: f64) -> f64 {
    kg / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn row(transporter: &str, loading: &str, payment: &str, vehicle: &str, kg: i64, date: NaiveDateTime) -> Record {
        Record::new(vec![
            CellValue::from(transporter),
            CellValue::from(loading),
            CellValue::from("HUB"),
            CellValue::from(payment),
            CellValue::from(vehicle),
            CellValue::Integer(kg),
            CellValue::Float(100.0),
            CellValue::DateTime(date),
        ])
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                "TRANSPORTER".into(),
                "LOADING LOCATION".into(),
                "INV LOCATION".into(),
                "PAYMENT BY".into(),
                "VEHICLE NUMBER".into(),
                "INV -QNT-KG".into(),
                "INV -VALUE".into(),
                "INV DATE".into(),
            ],
            vec![
                row("A", "North", "Cash", "V1", 2000, day(1, 5)),
                row("A", "South", "Credit", "V2", 1000, day(1, 10)),
                row("B", "North", "Credit", "V1", 500, day(2, 1)),
            ],
        )
        .unwrap()
    }

    fn schema() -> ResolvedSchema {
        ResolvedSchema {
            quantity: "INV -QNT-KG".into(),
            date: "INV DATE".into(),
        }
    }

    #[test]
    fn test_empty_criteria_keeps_everything() {
        let ds = dataset();
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        assert_eq!(f.indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_empty_selection_is_no_restriction() {
        let ds = dataset();
        let criteria =
            FilterCriteria::new().with_selection(CategoricalField::Transporter, Vec::<&str>::new());
        assert!(!criteria.is_active(CategoricalField::Transporter));
        let f = filter(&ds, &schema(), &criteria).unwrap();
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn test_selections_combine_with_and() {
        let ds = dataset();
        let criteria = FilterCriteria::new()
            .with_selection(CategoricalField::LoadingLocation, ["North"])
            .with_selection(CategoricalField::PaymentBy, ["Credit"]);
        let f = filter(&ds, &schema(), &criteria).unwrap();
        assert_eq!(f.indices(), &[2]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let ds = dataset();
        let criteria = FilterCriteria::new().with_date_range(DateRange::new(day(1, 5), day(1, 10)));
        let f = filter(&ds, &schema(), &criteria).unwrap();
        assert_eq!(f.indices(), &[0, 1]);
    }

    #[test]
    fn test_date_range_keeps_time_of_day() {
        let mut ds = dataset();
        ds.records_mut()[1].cells[7] = CellValue::DateTime(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap().and_hms_opt(9, 0, 0).unwrap(),
        );
        let criteria = FilterCriteria::new().with_date_range(DateRange::new(day(1, 1), day(1, 10)));
        let f = filter(&ds, &schema(), &criteria).unwrap();
        assert_eq!(f.indices(), &[0]);
    }

    #[test]
    fn test_inverted_range_is_empty_not_error() {
        let ds = dataset();
        let criteria = FilterCriteria::new().with_date_range(DateRange::new(day(2, 1), day(1, 1)));
        let f = filter(&ds, &schema(), &criteria).unwrap();
        assert!(f.is_empty());
    }

    #[test]
    fn test_null_date_fails_date_predicate() {
        let mut ds = dataset();
        ds.records_mut()[0].cells[7] = CellValue::Null;
        let all = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        assert_eq!(all.len(), 3);
        let criteria = FilterCriteria::new().with_date_range(DateRange::new(day(1, 1), day(12, 31)));
        let f = filter(&ds, &schema(), &criteria).unwrap();
        assert_eq!(f.indices(), &[1, 2]);
    }

    #[test]
    fn test_derived_metric_tons() {
        let ds = dataset();
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let mt: Vec<Option<f64>> = f.rows().map(|r| r.quantity_mt).collect();
        assert_eq!(mt, vec![Some(2.0), Some(1.0), Some(0.5)]);
        assert_eq!(f.columns().last().map(String::as_str), Some("INV -QNT-MT"));
        // The source keeps its own columns.
        assert_eq!(ds.columns().len(), 8);
    }

    #[test]
    fn test_missing_literal_column() {
        let ds = Dataset::new(vec!["INV -QNT-KG".into(), "INV DATE".into()], vec![]).unwrap();
        let err = filter(&ds, &schema(), &FilterCriteria::new()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(name) if name == "TRANSPORTER"));
    }

    #[test]
    fn test_materialize_then_refilter_is_idempotent() {
        let ds = dataset();
        let criteria = FilterCriteria::new().with_selection(CategoricalField::Transporter, ["A"]);
        let once = filter(&ds, &schema(), &criteria).unwrap().materialize();
        let twice = filter(&once, &schema(), &criteria).unwrap().materialize();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_text_dates_are_parsed_for_the_range() {
        let columns = [
            "TRANSPORTER",
            "LOADING LOCATION",
            "INV LOCATION",
            "PAYMENT BY",
            "VEHICLE NUMBER",
            "INV -QNT-KG",
            "INV -VALUE",
            "INV DATE",
        ];
        let text_row = |date: &str| {
            Record::new(vec![
                CellValue::from("A"),
                CellValue::from("North"),
                CellValue::from("HUB"),
                CellValue::from("Cash"),
                CellValue::from("V1"),
                CellValue::Integer(2000),
                CellValue::Float(100.0),
                CellValue::from(date),
            ])
        };
        let ds = Dataset::new(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![text_row("2025-01-05"), text_row("2025-02-05"), text_row("soon")],
        )
        .unwrap();
        let schema = crate::data::schema::resolve(ds.columns()).unwrap();
        let criteria = FilterCriteria::new().with_date_range(DateRange::new(day(1, 1), day(1, 31)));
        let f = filter(&ds, &schema, &criteria).unwrap();
        assert_eq!(f.indices(), &[0]);
    }

    #[test]
    fn test_existing_metric_ton_column_is_reused() {
        let mut columns: Vec<String> = dataset().columns().to_vec();
        columns.push("INV -QNT-MT".into());
        let records = dataset()
            .records()
            .iter()
            .map(|r| {
                let mut cells = r.cells.clone();
                cells.push(CellValue::Float(99.0));
                Record::new(cells)
            })
            .collect();
        let ds = Dataset::new(columns, records).unwrap();
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        assert_eq!(f.columns().len(), 9);
        assert_eq!(f.quantity_mt_position(), 8);
        assert_eq!(f.rows().next().and_then(|r| r.quantity_mt), Some(2.0));
    }
}

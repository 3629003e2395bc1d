use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::data::filter::{
    filtered_indices, CategoricalField, ColumnIndex, DateRange, FilterCriteria, FilteredDataset,
};
use crate::data::model::{CellValue, Dataset};
use crate::data::schema::{self, ResolvedSchema};
use crate::data::summary::{summarize, AggregateSummary};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Everything one user interaction needs, independent of rendering.
///
/// A session owns its dataset; nothing is shared between sessions.
#[derive(Debug, Clone)]
pub struct Session {
    /// Loaded dataset with its date column normalized.
    dataset: Dataset,

    schema: ResolvedSchema,

    /// Column positions resolved once at load.
    index: ColumnIndex,

    /// Distinct values offered for each categorical field.
    options: BTreeMap<CategoricalField, BTreeSet<CellValue>>,

    /// Earliest and latest date present, if any row has one.
    date_bounds: Option<DateRange>,

    criteria: FilterCriteria,

    /// Indices of records passing the current criteria (cached).
    visible_indices: Vec<usize>,
}

impl Session {
    /// Ingest a newly loaded dataset: resolve the schema, normalize dates,
    /// check the literal columns and start with every row visible.
    pub fn new(dataset: Dataset) -> Result<Self> {
        let schema = schema::resolve(dataset.columns())?;
        let dataset = schema::normalize_date_column(dataset, &schema)?;
        let index = ColumnIndex::resolve(&dataset, &schema)?;

        let options = CategoricalField::ALL
            .iter()
            .map(|&field| (field, dataset.unique_values(index.field(field))))
            .collect();

        let date_bounds = date_bounds(&dataset, index.date);
        let criteria = FilterCriteria {
            selections: BTreeMap::new(),
            date_range: date_bounds,
        };

        let mut session = Session {
            dataset,
            schema,
            index,
            options,
            date_bounds,
            criteria,
            visible_indices: Vec::new(),
        };
        session.refilter();
        Ok(session)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Full date span of the data; the default date range.
    pub fn date_bounds(&self) -> Option<DateRange> {
        self.date_bounds
    }

    pub fn options(&self, field: CategoricalField) -> &BTreeSet<CellValue> {
        &self.options[&field]
    }

    /// Find the option of `field` whose display text is `text`.
    pub fn lookup_option(&self, field: CategoricalField, text: &str) -> Option<&CellValue> {
        self.options(field).iter().find(|v| v.to_string() == text)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_indices.len()
    }

    /// Recompute `visible_indices` after a criteria change.
    pub fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.dataset, &self.index, &self.criteria);
        debug!(
            "{} of {} rows visible",
            self.visible_indices.len(),
            self.dataset.len()
        );
    }

    /// Toggle a single value in a field's selection.
    pub fn toggle_filter_value(&mut self, field: CategoricalField, value: &CellValue) {
        let selected = self.criteria.selections.entry(field).or_default();
        if selected.contains(value) {
            selected.remove(value);
        } else {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Select every value of a field.
    pub fn select_all(&mut self, field: CategoricalField) {
        let all_vals = self.options(field).clone();
        self.criteria.selections.insert(field, all_vals);
        self.refilter();
    }

    /// Drop a field's selection, lifting its restriction.
    pub fn clear_selection(&mut self, field: CategoricalField) {
        self.criteria.selections.remove(&field);
        self.refilter();
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.criteria.date_range = range;
        self.refilter();
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refilter();
    }

    /// View of the currently visible rows with the derived MT column.
    pub fn filtered(&self) -> FilteredDataset<'_> {
        FilteredDataset::from_indices(&self.dataset, self.index, self.visible_indices.clone())
    }

    /// Aggregates over the currently visible rows.
    pub fn summary(&self) -> AggregateSummary {
        summarize(&self.filtered())
    }
}

fn date_bounds(dataset: &Dataset, date_col: usize) -> Option<DateRange> {
    let mut dates = dataset
        .records()
        .iter()
        .filter_map(|r| r.get(date_col).as_datetime());
    let first = dates.next()?;
    let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange::new(start, end))
}

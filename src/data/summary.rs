use std::collections::BTreeMap;

use serde::Serialize;

use super::filter::{CategoricalField, FilteredDataset};
use super::model::CellValue;

/// How many vehicles the ranking keeps.
pub const TOP_VEHICLES: usize = 5;

// ---------------------------------------------------------------------------
// Summary types handed to the rendering layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub trip_count: usize,
    pub total_cargo_mt: f64,
    pub total_invoice_value: f64,
}

/// Cargo and invoice sums for one transporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransporterTotals {
    pub transporter: CellValue,
    pub cargo_mt: f64,
    pub invoice_value: f64,
}

/// Row count of one categorical value and its share (0–100) of all rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub value: CellValue,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleCargo {
    pub vehicle: CellValue,
    pub cargo_mt: f64,
}

/// Everything the dashboard shows for one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub totals: Totals,
    pub by_transporter: Vec<TransporterTotals>,
    pub loading_locations: Vec<CategoryShare>,
    pub payment_modes: Vec<CategoryShare>,
    pub top_vehicles: Vec<VehicleCargo>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Compute every summary section over the whole filtered view.
pub fn summarize(filtered: &FilteredDataset<'_>) -> AggregateSummary {
    AggregateSummary {
        totals: totals(filtered),
        by_transporter: by_transporter(filtered),
        loading_locations: distribution(filtered, CategoricalField::LoadingLocation),
        payment_modes: distribution(filtered, CategoricalField::PaymentBy),
        top_vehicles: top_vehicles(filtered, TOP_VEHICLES),
    }
}

/// Trip count, total cargo in MT and total invoice value. Missing or
/// non-numeric cells count as zero.
pub fn totals(filtered: &FilteredDataset<'_>) -> Totals {
    let invoice_col = filtered.column_index().invoice_value;
    let mut total_cargo_mt = 0.0;
    let mut total_invoice_value = 0.0;
    for row in filtered.rows() {
        total_cargo_mt += row.quantity_mt.unwrap_or(0.0);
        total_invoice_value += row.record.get(invoice_col).as_f64().unwrap_or(0.0);
    }
    Totals {
        trip_count: filtered.len(),
        total_cargo_mt,
        total_invoice_value,
    }
}

/// One entry per transporter present, sorted by transporter value.
/// Rows with no transporter are grouped under `Null`.
pub fn by_transporter(filtered: &FilteredDataset<'_>) -> Vec<TransporterTotals> {
    let index = filtered.column_index();
    let mut groups: BTreeMap<&CellValue, (f64, f64)> = BTreeMap::new();
    for row in filtered.rows() {
        let entry = groups.entry(row.record.get(index.transporter)).or_default();
        entry.0 += row.quantity_mt.unwrap_or(0.0);
        entry.1 += row.record.get(index.invoice_value).as_f64().unwrap_or(0.0);
    }
    groups
        .into_iter()
        .map(|(transporter, (cargo_mt, invoice_value))| TransporterTotals {
            transporter: transporter.clone(),
            cargo_mt,
            invoice_value,
        })
        .collect()
}

/// Row count and percentage per distinct value of `field`, sorted by value.
pub fn distribution(filtered: &FilteredDataset<'_>, field: CategoricalField) -> Vec<CategoryShare> {
    let col = filtered.column_index().field(field);
    let mut counts: BTreeMap<&CellValue, usize> = BTreeMap::new();
    for row in filtered.rows() {
        *counts.entry(row.record.get(col)).or_default() += 1;
    }
    let total = filtered.len() as f64;
    counts
        .into_iter()
        .map(|(value, count)| CategoryShare {
            value: value.clone(),
            count,
            percent: count as f64 * 100.0 / total,
        })
        .collect()
}

/// The `n` vehicles carrying the most cargo, heaviest first.
///
/// Equal totals are ordered by vehicle identifier so the ranking never
/// depends on row order.
pub fn top_vehicles(filtered: &FilteredDataset<'_>, n: usize) -> Vec<VehicleCargo> {
    let vehicle_col = filtered.column_index().vehicle;
    let mut groups: BTreeMap<&CellValue, f64> = BTreeMap::new();
    for row in filtered.rows() {
        *groups.entry(row.record.get(vehicle_col)).or_default() += row.quantity_mt.unwrap_or(0.0);
    }
    let mut ranked: Vec<(&CellValue, f64)> = groups.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(vehicle, cargo_mt)| VehicleCargo {
            vehicle: vehicle.clone(),
            cargo_mt,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, FilterCriteria};
    use crate::data::model::{Dataset, Record};
    use crate::data::schema::ResolvedSchema;
    use chrono::NaiveDate;

    fn row(transporter: &str, loading: &str, payment: &str, vehicle: &str, kg: CellValue, value: f64) -> Record {
        Record::new(vec![
            CellValue::from(transporter),
            CellValue::from(loading),
            CellValue::from("HUB"),
            CellValue::from(payment),
            CellValue::from(vehicle),
            kg,
            CellValue::Float(value),
            CellValue::DateTime(
                NaiveDate::from_ymd_opt(2025, 3, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
        ])
    }

    fn dataset(records: Vec<Record>) -> Dataset {
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
            records,
        )
        .unwrap()
    }

    fn schema() -> ResolvedSchema {
        ResolvedSchema {
            quantity: "INV -QNT-KG".into(),
            date: "INV DATE".into(),
        }
    }

    fn kg(v: i64) -> CellValue {
        CellValue::Integer(v)
    }

    #[test]
    fn test_totals() {
        let ds = dataset(vec![
            row("A", "North", "Cash", "V1", kg(2000), 500.0),
            row("B", "South", "Cash", "V2", kg(1500), 250.5),
        ]);
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let t = totals(&f);
        assert_eq!(t.trip_count, 2);
        assert!((t.total_cargo_mt - 3.5).abs() < 1e-9);
        assert!((t.total_invoice_value - 750.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_numeric_quantity_counts_as_zero() {
        let ds = dataset(vec![
            row("A", "North", "Cash", "V1", kg(2000), 1.0),
            row("A", "North", "Cash", "V1", CellValue::Null, 1.0),
            row("A", "North", "Cash", "V1", CellValue::from("n/a"), 1.0),
        ]);
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let t = totals(&f);
        assert_eq!(t.trip_count, 3);
        assert!((t.total_cargo_mt - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_by_transporter_sorted_and_summed() {
        let ds = dataset(vec![
            row("B", "North", "Cash", "V1", kg(1000), 10.0),
            row("A", "North", "Cash", "V2", kg(2000), 20.0),
            row("B", "South", "Credit", "V3", kg(3000), 30.0),
        ]);
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let groups = by_transporter(&f);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].transporter, CellValue::from("A"));
        assert!((groups[0].cargo_mt - 2.0).abs() < 1e-9);
        assert_eq!(groups[1].transporter, CellValue::from("B"));
        assert!((groups[1].cargo_mt - 4.0).abs() < 1e-9);
        assert!((groups[1].invoice_value - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_percentages() {
        let ds = dataset(vec![
            row("A", "North", "Cash", "V1", kg(1), 0.0),
            row("A", "North", "Credit", "V1", kg(1), 0.0),
            row("A", "North", "Cash", "V1", kg(1), 0.0),
            row("A", "South", "Cash", "V1", kg(1), 0.0),
        ]);
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let loading = distribution(&f, CategoricalField::LoadingLocation);
        assert_eq!(loading.len(), 2);
        assert_eq!(loading[0].value, CellValue::from("North"));
        assert_eq!(loading[0].count, 3);
        assert!((loading[0].percent - 75.0).abs() < 1e-9);
        let payment = distribution(&f, CategoricalField::PaymentBy);
        assert_eq!(payment[1].value, CellValue::from("Credit"));
        assert_eq!(payment[1].count, 1);
    }

    #[test]
    fn test_top_vehicles_limits_and_orders() {
        let ds = dataset(
            (1..=7)
                .map(|i| row("A", "N", "Cash", &format!("V{i}"), kg(i * 1000), 0.0))
                .collect(),
        );
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let top = top_vehicles(&f, TOP_VEHICLES);
        let names: Vec<String> = top.iter().map(|v| v.vehicle.to_string()).collect();
        assert_eq!(names, vec!["V7", "V6", "V5", "V4", "V3"]);
    }

    #[test]
    fn test_top_vehicles_ties_break_on_vehicle_id() {
        let ds = dataset(vec![
            row("A", "N", "Cash", "V9", kg(1000), 0.0),
            row("A", "N", "Cash", "V2", kg(1000), 0.0),
            row("A", "N", "Cash", "V5", kg(1000), 0.0),
        ]);
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let names: Vec<String> = top_vehicles(&f, 5).iter().map(|v| v.vehicle.to_string()).collect();
        assert_eq!(names, vec!["V2", "V5", "V9"]);
    }

    #[test]
    fn test_empty_view_summarizes_to_zero() {
        let ds = dataset(vec![]);
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let s = summarize(&f);
        assert_eq!(s.totals.trip_count, 0);
        assert_eq!(s.totals.total_cargo_mt, 0.0);
        assert_eq!(s.totals.total_invoice_value, 0.0);
        assert!(s.by_transporter.is_empty());
        assert!(s.loading_locations.is_empty());
        assert!(s.payment_modes.is_empty());
        assert!(s.top_vehicles.is_empty());
    }

    #[test]
    fn test_summary_serializes_plain_values() {
        let ds = dataset(vec![row("A", "North", "Cash", "V1", kg(2000), 10.0)]);
        let f = filter(&ds, &schema(), &FilterCriteria::new()).unwrap();
        let json = serde_json::to_value(summarize(&f)).unwrap();
        assert_eq!(json["totals"]["trip_count"], 1);
        assert_eq!(json["by_transporter"][0]["transporter"], "A");
        assert_eq!(json["top_vehicles"][0]["cargo_mt"], 2.0);
    }
}

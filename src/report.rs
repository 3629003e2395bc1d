//! Plain-text rendering of an [`AggregateSummary`], laid out in the same
//! sections as the dashboard.

use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::data::filter::{CategoricalField, FilterCriteria};
use crate::data::model::format_timestamp;
use crate::data::summary::{AggregateSummary, CategoryShare};

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

pub fn render(summary: &AggregateSummary, criteria: &FilterCriteria) -> String {
    let mut out = String::new();
    write_report(&mut out, summary, criteria).expect("writing to a String cannot fail");
    out
}

/// Open ends of a half-open range print as `*`.
fn bound_label(ts: &NaiveDateTime) -> String {
    if *ts == NaiveDateTime::MIN || *ts == NaiveDateTime::MAX {
        "*".to_string()
    } else {
        format_timestamp(ts)
    }
}

fn write_report(
    out: &mut String,
    summary: &AggregateSummary,
    criteria: &FilterCriteria,
) -> std::fmt::Result {
    writeln!(out, "== Filter Selection ==")?;
    for field in CategoricalField::ALL {
        let selected = criteria
            .selections
            .get(&field)
            .filter(|s| !s.is_empty())
            .map(|s| s.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
            .unwrap_or_else(|| "all".to_string());
        writeln!(out, "{:<20} {selected}", field.label())?;
    }
    match &criteria.date_range {
        Some(range) => writeln!(
            out,
            "{:<20} {} .. {}",
            "Dates",
            bound_label(&range.start),
            bound_label(&range.end)
        )?,
        None => writeln!(out, "{:<20} all", "Dates")?,
    }

    let totals = &summary.totals;
    writeln!(out, "\n== Operational Overview ==")?;
    writeln!(out, "{:<20} {}", "Total Trips", totals.trip_count)?;
    writeln!(out, "{:<20} {:.2} MT", "Total Cargo", totals.total_cargo_mt)?;
    writeln!(out, "{:<20} ₹{:.2}", "Total Invoice Value", totals.total_invoice_value)?;

    writeln!(out, "\n== Transporter Insights ==")?;
    writeln!(out, "{:<24} {:>12} {:>16}", "TRANSPORTER", "CARGO (MT)", "INVOICE VALUE")?;
    for group in &summary.by_transporter {
        writeln!(
            out,
            "{:<24} {:>12.2} {:>16.2}",
            group.transporter.to_string(),
            group.cargo_mt,
            group.invoice_value
        )?;
    }

    writeln!(out, "\n== Location & Payment Insights ==")?;
    write_shares(out, CategoricalField::LoadingLocation.label(), &summary.loading_locations)?;
    write_shares(out, CategoricalField::PaymentBy.label(), &summary.payment_modes)?;

    writeln!(out, "\n== Vehicle Performance ==")?;
    writeln!(out, "{:<24} {:>12}", "VEHICLE NUMBER", "CARGO (MT)")?;
    for vehicle in &summary.top_vehicles {
        writeln!(out, "{:<24} {:>12.2}", vehicle.vehicle.to_string(), vehicle.cargo_mt)?;
    }
    Ok(())
}

fn write_shares(out: &mut String, title: &str, shares: &[CategoryShare]) -> std::fmt::Result {
    writeln!(out, "{title}")?;
    for share in shares {
        writeln!(
            out,
            "  {:<22} {:>6} {:>7.1}%",
            share.value.to_string(),
            share.count,
            share.percent
        )?;
    }
    Ok(())
}

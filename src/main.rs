mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use args::{Args, Format};
use cargoflow::data::filter::{CategoricalField, DateRange, FilterCriteria};
use cargoflow::data::model::CellValue;
use cargoflow::data::summary::{summarize, top_vehicles, TOP_VEHICLES};
use cargoflow::data::{export, loader};
use cargoflow::{report, Session};
use chrono::NaiveDateTime;
use clap::Parser;
use log::{debug, error, warn, LevelFilter};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.log_level);
    debug!("{args:?}");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let dataset = loader::load_file(&args.file)?;
    let mut session = Session::new(dataset)
        .with_context(|| format!("preparing {}", args.file.display()))?;

    let criteria = criteria_from_args(&session, args);
    session.set_criteria(criteria);

    let filtered = session.filtered();
    let mut summary = summarize(&filtered);
    if args.top != TOP_VEHICLES {
        summary.top_vehicles = top_vehicles(&filtered, args.top);
    }

    match args.format {
        Format::Text => print!("{}", report::render(&summary, session.criteria())),
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if let Some(path) = &args.export {
        export::export_to_path(&filtered, path)
            .with_context(|| format!("exporting to {}", path.display()))?;
    }
    Ok(())
}

/// Turn the selection flags into criteria, matching each value against the
/// options actually present so numeric identifiers select correctly.
fn criteria_from_args(session: &Session, args: &Args) -> FilterCriteria {
    let flags = [
        (CategoricalField::Transporter, &args.transporters),
        (CategoricalField::LoadingLocation, &args.loading_locations),
        (CategoricalField::InvoiceLocation, &args.invoice_locations),
        (CategoricalField::PaymentBy, &args.payment_modes),
    ];

    let mut criteria = FilterCriteria::new();
    for (field, texts) in flags {
        let values = texts.iter().map(|text| match session.lookup_option(field, text) {
            Some(value) => value.clone(),
            None => {
                warn!("{} '{text}' does not occur in the data", field.label());
                CellValue::String(text.clone())
            }
        });
        criteria = criteria.with_selection(field, values);
    }

    criteria.date_range = date_range_from(args.from, args.to, session.date_bounds());
    criteria
}

/// Fill a missing `--from`/`--to` from the data's own bounds. With no dated
/// rows the missing side stays open.
fn date_range_from(
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    bounds: Option<DateRange>,
) -> Option<DateRange> {
    let start = from.or(bounds.map(|b| b.start));
    let end = to.or(bounds.map(|b| b.end));
    match (start, end) {
        (None, None) => None,
        (start, end) => Some(DateRange::new(
            start.unwrap_or(NaiveDateTime::MIN),
            end.unwrap_or(NaiveDateTime::MAX),
        )),
    }
}

/// Initializes env_logger at `level` unless RUST_LOG is set.
fn init_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    match std::env::var("RUST_LOG").ok() {
        // RUST_LOG exists; use it.
        Some(filters) => builder.parse_filters(&filters),
        // RUST_LOG does not exist; use the requested level for this crate only.
        None => builder
            .filter_level(LevelFilter::Warn)
            .filter_module(env!("CARGO_CRATE_NAME"), level),
    };
    builder.target(env_logger::Target::Stderr).init();
}

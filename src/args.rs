//! Command-line interface of the `cargoflow` binary.

use std::path::PathBuf;

use cargoflow::data::schema::parse_timestamp;
use cargoflow::data::summary::TOP_VEHICLES;
use chrono::NaiveDateTime;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// cargoflow: logistics and cargo analytics over a shipment table.
///
/// Loads a table, narrows it by transporter, location, payment mode and date,
/// then prints the operational overview, transporter breakdown, location and
/// payment distributions and the top vehicles by cargo. Repeat a selection flag
/// to select several values; leaving a flag out selects everything.
#[derive(Debug, Parser, Clone)]
#[command(name = "cargoflow", version)]
pub struct Args {
    /// Shipment table to analyse (.csv, .json or .parquet).
    pub file: PathBuf,

    /// Keep only these transporters (logistics partners).
    #[arg(long = "transporter", value_name = "NAME")]
    pub transporters: Vec<String>,

    /// Keep only these loading locations.
    #[arg(long = "loading-location", value_name = "LOCATION")]
    pub loading_locations: Vec<String>,

    /// Keep only these invoice locations.
    #[arg(long = "invoice-location", value_name = "LOCATION")]
    pub invoice_locations: Vec<String>,

    /// Keep only these payment modes.
    #[arg(long = "payment-by", value_name = "MODE")]
    pub payment_modes: Vec<String>,

    /// Start of the date range, inclusive. Defaults to the earliest date in the file.
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDateTime>,

    /// End of the date range, inclusive. Defaults to the latest date in the file.
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDateTime>,

    /// How many vehicles to rank.
    #[arg(long, default_value_t = TOP_VEHICLES)]
    pub top: usize,

    /// Also write the filtered rows to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the env_logger crate for instructions.
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn parse_date_arg(s: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(s).ok_or_else(|| format!("'{s}' is not a recognised date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_selections_and_dates() {
        let args = Args::try_parse_from([
            "cargoflow",
            "march.csv",
            "--transporter",
            "A",
            "--transporter",
            "B",
            "--from",
            "2025-01-01",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.transporters, vec!["A", "B"]);
        assert!(args.loading_locations.is_empty());
        assert_eq!(args.from.map(|d| d.to_string()), Some("2025-01-01 00:00:00".into()));
        assert_eq!(args.to, None);
        assert_eq!(args.top, 5);
        assert_eq!(args.format, Format::Json);
        assert_eq!(args.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Args::try_parse_from(["cargoflow", "march.csv", "--to", "someday"]).is_err());
    }
}

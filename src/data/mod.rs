/// Data layer: core types, loading, schema resolution, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  find quantity / date columns, normalize dates
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  categorical + date predicates → FilteredDataset (+ MT)
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  summary  │   │  export   │
///   └──────────┘   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
pub mod summary;

use thiserror::Error;

/// Errors raised by the resolve → filter → summarize pipeline and the CSV export.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Quantity column (KG) not found in dataset")]
    MissingQuantityColumn,

    #[error("Date column not found in dataset")]
    MissingDateColumn,

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row {row}: cannot parse '{value}' in column '{column}' as a date")]
    DateParse {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Row {row} has {found} cells but the dataset has {expected} columns")]
    RaggedRecord {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

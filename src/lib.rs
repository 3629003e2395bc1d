//! Filter-and-aggregate core of the CargoFlow logistics dashboard.
//!
//! A shipment table is loaded into a [`data::model::Dataset`], its quantity and
//! date columns are found heuristically, rows are narrowed by categorical and
//! date criteria, and the remaining rows are summarized for display or
//! exported as CSV. [`Session`] ties the stages together for one loaded file.

pub mod data;
pub mod error;
pub mod report;
pub mod session;

pub use error::{PipelineError, Result};
pub use session::Session;

//! campaign-ingest - tabular ingestion for campaign synthesis
//!
//! Parses an uploaded CSV or workbook into a [`RowSource`] before any run
//! starts, and writes the CSV artefacts offered for download.

pub mod error;
pub mod export;
pub mod source;

pub use error::{IngestError, Result};
pub use export::{sample_template_csv, write_report_csv, SAMPLE_TEMPLATE_HEADER};
pub use source::{RowSource, SourceFormat};

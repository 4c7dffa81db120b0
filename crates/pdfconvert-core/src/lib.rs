//! PDF conversion and merge operations
//!
//! This crate turns selected PDFs into spreadsheets or editable documents
//! and merges several PDFs into one with normalized page sizes, using lopdf.
//!
//! - [`session::Session`] executes [`command::Command`]s against a
//!   [`selection::FileSelection`]
//! - [`merge::merge_files`]: page-size standardizing merge
//! - [`extract::extract`] + [`spreadsheet::write_spreadsheet`]: tables to `.xlsx`
//! - [`convert::DocxConverter`]: page text to `.docx`

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod merge;
pub mod output;
pub mod page_box;
pub mod selection;
pub mod session;
pub mod spreadsheet;
pub mod table;
pub mod text;

pub use command::{Action, Command, Outcome, OutputTarget, ProcessMetrics};
pub use config::ConvertConfig;
pub use convert::{DocumentConverter, DocxConverter};
pub use error::ConvertError;
pub use extract::{extract, TableExtractor, TextTableExtractor};
pub use merge::{merge_documents, merge_files, MergeReport};
pub use page_box::{scale_factor, PageSize, TargetSize};
pub use selection::FileSelection;
pub use session::Session;
pub use spreadsheet::{write_spreadsheet, FormattedCell, HeaderRow, NumberFormat};
pub use table::ExtractedTable;

use lopdf::Document;
use std::path::Path;

/// Read and parse a PDF file.
///
/// A file that cannot be read is an `IoError`; bytes that are not a PDF
/// are a `ParseError` naming the path.
pub fn load_document(path: &Path) -> Result<Document, ConvertError> {
    let bytes = std::fs::read(path)?;
    Document::load_mem(&bytes).map_err(|e| ConvertError::parse(path, e))
}

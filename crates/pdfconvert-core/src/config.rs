use crate::extract::DEFAULT_MIN_COLUMNS;
use crate::spreadsheet::HeaderRow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for a conversion session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Minimum cells per line for table detection
    pub min_columns: usize,
    pub header_row: HeaderRow,
    /// Where batch outputs go when no directory is given
    pub output_dir: Option<PathBuf>,
    /// Retry pages without a table using pdf-extract's text
    pub fallback: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            min_columns: DEFAULT_MIN_COLUMNS,
            header_row: HeaderRow::default(),
            output_dir: None,
            fallback: true,
        }
    }
}

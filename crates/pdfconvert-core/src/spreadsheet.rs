//! Spreadsheet writer
//!
//! Writes an [`ExtractedTable`] to an `.xlsx` workbook. Every cell below the
//! header row that reads as a number once thousands separators and percent
//! signs are stripped is stored as a number, formatted `0` when whole and
//! `0.00` otherwise. Anything else is written unchanged.

use crate::error::ConvertError;
use crate::output::write_atomically;
use crate::table::{Cell, ExtractedTable};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const SPREADSHEET_EXTENSION: &str = "xlsx";

/// Display format attached to a numeric cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumberFormat {
    Integer,
    TwoDecimal,
}

impl NumberFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            NumberFormat::Integer => "0",
            NumberFormat::TwoDecimal => "0.00",
        }
    }

    fn for_value(value: f64) -> Self {
        if value.fract() == 0.0 {
            NumberFormat::Integer
        } else {
            NumberFormat::TwoDecimal
        }
    }
}

/// A cell after numeric coercion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FormattedCell {
    Empty,
    Text(String),
    Number { value: f64, format: NumberFormat },
}

/// Which row of the sheet is the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderRow {
    /// The table's first row is the header and is never coerced
    #[default]
    FirstRow,
    /// A synthetic `0, 1, 2, ...` header is written above the table and
    /// every table row is coerced
    ColumnIndex,
}

impl FromStr for HeaderRow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-row" => Ok(HeaderRow::FirstRow),
            "column-index" => Ok(HeaderRow::ColumnIndex),
            other => Err(format!(
                "Unknown header row mode '{}'. Use 'first-row' or 'column-index'",
                other
            )),
        }
    }
}

/// Summary of a written sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SheetReport {
    /// Rows written, header included
    pub rows: usize,
    pub numeric_cells: usize,
}

/// Parse a cell as a number after stripping `,` and `%`
pub fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| !matches!(c, ',' | '%')).collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Coerce a data cell. Values that do not parse are kept as text.
pub fn format_cell(cell: Option<&str>) -> FormattedCell {
    match cell {
        None => FormattedCell::Empty,
        Some(text) => match parse_numeric(text) {
            Some(value) => FormattedCell::Number {
                value,
                format: NumberFormat::for_value(value),
            },
            None => FormattedCell::Text(text.to_string()),
        },
    }
}

/// Write `table` to `output` as a single-sheet workbook
pub fn write_spreadsheet(
    table: &ExtractedTable,
    output: &Path,
    header: HeaderRow,
) -> Result<SheetReport, ConvertError> {
    let (bytes, report) = build_workbook(table, header).map_err(xlsx_error)?;
    write_atomically(output, &bytes)?;

    tracing::info!(
        output = %output.display(),
        rows = report.rows,
        numeric_cells = report.numeric_cells,
        "wrote spreadsheet"
    );
    Ok(report)
}

/// Render the workbook in memory
pub fn build_workbook(
    table: &ExtractedTable,
    header: HeaderRow,
) -> Result<(Vec<u8>, SheetReport), XlsxError> {
    let integer = Format::new().set_num_format(NumberFormat::Integer.pattern());
    let two_decimal = Format::new().set_num_format(NumberFormat::TwoDecimal.pattern());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let mut report = SheetReport {
        rows: 0,
        numeric_cells: 0,
    };

    let mut rows = table.rows().iter();
    let mut row_num: u32 = 0;

    match header {
        HeaderRow::FirstRow => {
            if let Some(first) = rows.next() {
                write_header(worksheet, row_num, first)?;
                row_num += 1;
            }
        }
        HeaderRow::ColumnIndex => {
            if !table.is_empty() {
                for col in 0..table.width() {
                    worksheet.write_number(row_num, column(col)?, col as f64)?;
                }
                row_num += 1;
            }
        }
    }

    for row in rows {
        for (col, cell) in row.iter().enumerate() {
            match format_cell(cell.as_deref()) {
                FormattedCell::Empty => {}
                FormattedCell::Text(text) => {
                    worksheet.write_string(row_num, column(col)?, text)?;
                }
                FormattedCell::Number { value, format } => {
                    let format = match format {
                        NumberFormat::Integer => &integer,
                        NumberFormat::TwoDecimal => &two_decimal,
                    };
                    worksheet.write_number_with_format(row_num, column(col)?, value, format)?;
                    report.numeric_cells += 1;
                }
            }
        }
        row_num += 1;
    }

    report.rows = row_num as usize;
    let bytes = workbook.save_to_buffer()?;
    Ok((bytes, report))
}

fn write_header(worksheet: &mut Worksheet, row_num: u32, cells: &[Cell]) -> Result<(), XlsxError> {
    for (col, cell) in cells.iter().enumerate() {
        if let Some(text) = cell {
            worksheet.write_string(row_num, column(col)?, text)?;
        }
    }
    Ok(())
}

fn column(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

fn xlsx_error(err: XlsxError) -> ConvertError {
    ConvertError::OperationError(format!("Failed to write spreadsheet: {}", err))
}

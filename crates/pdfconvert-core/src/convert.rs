//! Document conversion
//!
//! [`DocumentConverter`] is the seam to an external PDF-to-document
//! renderer. [`DocxConverter`] rebuilds an editable `.docx` from each page's
//! text layout: column-aligned runs of lines become tables, everything else
//! becomes paragraphs, and pages are separated by page breaks.

use crate::error::ConvertError;
use crate::load_document;
use crate::output::write_atomically;
use crate::table::split_line_into_cells;
use crate::text::document_lines;
use docx_rs::{BreakType, Docx, Paragraph, Run, Table, TableCell, TableRow};
use std::io::Cursor;
use std::path::Path;

pub const DOCUMENT_EXTENSION: &str = "docx";

/// Renders a PDF into an editable document
pub trait DocumentConverter {
    /// Extension of the files this converter produces, without the dot
    fn extension(&self) -> &str;

    /// Convert `input`, replacing `output` if it exists
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// A run of lines on a page
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(String),
    Table(Vec<Vec<String>>),
}

/// Bundled `.docx` converter
#[derive(Debug, Clone, Default)]
pub struct DocxConverter;

impl DocumentConverter for DocxConverter {
    fn extension(&self) -> &str {
        DOCUMENT_EXTENSION
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let doc = load_document(input)?;
        let pages = document_lines(&doc)?;
        drop(doc);

        let bytes = render_docx(&pages)?;
        write_atomically(output, &bytes)?;

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            pages = pages.len(),
            "converted to document"
        );
        Ok(())
    }
}

/// Group page lines into paragraphs and tables.
///
/// Two or more consecutive lines with at least two cells each form a table.
pub fn segment_blocks(lines: &[String]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<(String, Vec<String>)> = Vec::new();

    for line in lines {
        let cells = split_line_into_cells(line);
        if cells.len() >= 2 {
            pending.push((line.clone(), cells));
        } else {
            flush_pending(&mut pending, &mut blocks);
            blocks.push(Block::Text(line.clone()));
        }
    }
    flush_pending(&mut pending, &mut blocks);

    blocks
}

fn flush_pending(pending: &mut Vec<(String, Vec<String>)>, blocks: &mut Vec<Block>) {
    if pending.len() >= 2 {
        blocks.push(Block::Table(
            pending.drain(..).map(|(_, cells)| cells).collect(),
        ));
    } else {
        blocks.extend(pending.drain(..).map(|(line, _)| Block::Text(line)));
    }
}

/// Build the `.docx` bytes for a document's page lines
pub fn render_docx(pages: &[Vec<String>]) -> Result<Vec<u8>, ConvertError> {
    let mut docx = Docx::new();

    for (index, lines) in pages.iter().enumerate() {
        if index > 0 {
            docx = docx.add_paragraph(
                Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            );
        }

        for block in segment_blocks(lines) {
            docx = match block {
                Block::Text(text) => docx.add_paragraph(text_paragraph(&text)),
                Block::Table(rows) => docx.add_table(build_table(&rows)),
            };
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| ConvertError::OperationError(format!("Failed to write document: {}", e)))?;
    Ok(buffer.into_inner())
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn build_table(rows: &[Vec<String>]) -> Table {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let rows = rows
        .iter()
        .map(|row| {
            let cells = (0..width)
                .map(|col| {
                    let text = row.get(col).map(String::as_str).unwrap_or("");
                    TableCell::new().add_paragraph(text_paragraph(text))
                })
                .collect();
            TableRow::new(cells)
        })
        .collect();
    Table::new(rows)
}

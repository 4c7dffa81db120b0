//! Table extraction
//!
//! The [`TableExtractor`] trait is the seam to whatever detects tables in a
//! PDF. [`TextTableExtractor`] is the bundled best-effort implementation:
//! it lays out each page's text and looks for runs of column-aligned lines.

use crate::error::ConvertError;
use crate::load_document;
use crate::table::{detect_table, ExtractedTable};
use crate::text::page_lines;
use lopdf::Document;
use std::path::Path;

/// Minimum cells per line for a line to count as a table row
pub const DEFAULT_MIN_COLUMNS: usize = 2;

/// Source of per-page tables
pub trait TableExtractor {
    /// One entry per page, in page order; `None` when a page has no table.
    fn page_tables(&self, path: &Path) -> Result<Vec<Option<ExtractedTable>>, ConvertError>;
}

/// Extract every page's table from `path` and flatten them into one row
/// sequence. Page boundaries are not kept.
pub fn extract(
    extractor: &dyn TableExtractor,
    path: &Path,
) -> Result<ExtractedTable, ConvertError> {
    let pages = extractor.page_tables(path)?;
    let page_count = pages.len();

    let mut combined = ExtractedTable::new();
    for (index, table) in pages.into_iter().enumerate() {
        match table {
            Some(table) => {
                tracing::debug!(page = index + 1, rows = table.len(), "table found");
                combined.append(table);
            }
            None => tracing::debug!(page = index + 1, "no table on page"),
        }
    }

    tracing::info!(
        path = %path.display(),
        pages = page_count,
        rows = combined.len(),
        "extracted tables"
    );
    Ok(combined)
}

/// Text-layout table detection
#[derive(Debug, Clone)]
pub struct TextTableExtractor {
    pub min_columns: usize,
    /// Retry pages without a table using pdf-extract's text
    pub fallback: bool,
}

impl Default for TextTableExtractor {
    fn default() -> Self {
        Self {
            min_columns: DEFAULT_MIN_COLUMNS,
            fallback: true,
        }
    }
}

impl TextTableExtractor {
    pub fn new(min_columns: usize) -> Self {
        Self {
            min_columns,
            ..Self::default()
        }
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback = false;
        self
    }

    /// Tables from already-loaded document
    pub fn document_tables(&self, doc: &Document) -> Vec<Option<ExtractedTable>> {
        doc.get_pages()
            .iter()
            .map(|(page_no, &page_id)| match page_lines(doc, page_id) {
                Ok(lines) => detect_table(&lines.join("\n"), self.min_columns),
                Err(e) => {
                    // Unreadable content counts as a page without a table
                    tracing::warn!(page = page_no, error = %e, "skipping page content");
                    None
                }
            })
            .collect()
    }
}

impl TableExtractor for TextTableExtractor {
    fn page_tables(&self, path: &Path) -> Result<Vec<Option<ExtractedTable>>, ConvertError> {
        let doc = load_document(path)?;
        let mut tables = self.document_tables(&doc);

        if self.fallback && tables.iter().any(Option::is_none) {
            if let Some(fallback) = fallback_page_texts(path, tables.len()) {
                for (table, text) in tables.iter_mut().zip(fallback) {
                    if table.is_none() {
                        *table = detect_table(&text, self.min_columns);
                    }
                }
            }
        }

        Ok(tables)
    }
}

/// Page texts from pdf-extract, used when the content-stream walk finds no
/// table. `None` unless the extracted page count matches the document.
fn fallback_page_texts(path: &Path, page_count: usize) -> Option<Vec<String>> {
    // pdf-extract panics on some malformed fonts
    let text = match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::debug!(path = %path.display(), error = %e, "pdf-extract fallback failed");
            return None;
        }
        Err(_) => {
            tracing::warn!(path = %path.display(), "pdf-extract panicked, skipping fallback");
            return None;
        }
    };

    let pages = split_text_into_pages(&text);
    if pages.len() == page_count {
        Some(pages)
    } else {
        tracing::debug!(
            expected = page_count,
            found = pages.len(),
            "pdf-extract page count mismatch, ignoring fallback"
        );
        None
    }
}

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

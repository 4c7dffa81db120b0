//! Extracted tabular data

use serde::Serialize;

/// A single cell; `None` when the source cell was empty
pub type Cell = Option<String>;

/// Ordered rows of optional cell values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedTable {
    rows: Vec<Vec<Cell>>,
}

impl ExtractedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from raw strings, normalizing empty cells to `None`
    /// and padding every row to the widest one.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rows: Vec<Vec<Cell>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| normalize_cell(c.into())).collect())
            .collect();

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, None);
        }

        Self { rows }
    }

    /// Append another table's rows after this one's
    pub fn append(&mut self, other: ExtractedTable) {
        self.rows.extend(other.rows);
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns of the widest row
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

pub fn normalize_cell(value: String) -> Cell {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Split a text line into cells at tabs or runs of two or more spaces
pub fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in trimmed.chars() {
        if ch == '\t' {
            if !current.trim().is_empty() {
                cells.push(current.trim().to_string());
                current.clear();
            }
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                if !current.trim().is_empty() {
                    cells.push(current.trim().to_string());
                    current.clear();
                }
                continue;
            }
            current.push(' ');
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }

    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }

    cells
}

/// Find the largest table in a page of text.
///
/// Consecutive lines that split into at least `min_columns` cells form a
/// candidate; candidates need two or more rows. The candidate with the most
/// rows wins, the earliest one on ties.
pub fn detect_table(text: &str, min_columns: usize) -> Option<ExtractedTable> {
    let min_columns = min_columns.max(2);
    let mut best: Option<Vec<Vec<String>>> = None;
    let mut current: Vec<Vec<String>> = Vec::new();

    let mut flush = |rows: &mut Vec<Vec<String>>| {
        if rows.len() >= 2 && best.as_ref().map_or(true, |b| rows.len() > b.len()) {
            best = Some(std::mem::take(rows));
        } else {
            rows.clear();
        }
    };

    for line in text.lines() {
        let cells = split_line_into_cells(line);
        if cells.len() >= min_columns {
            current.push(cells);
        } else {
            flush(&mut current);
        }
    }
    flush(&mut current);

    best.map(ExtractedTable::from_rows)
}

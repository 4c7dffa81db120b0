//! Page text layout
//!
//! Walks a page's content stream and rebuilds its text lines from the text
//! positioning operators. Fragments sharing a baseline are joined with two
//! spaces so column gaps survive as cell separators.

use crate::error::ConvertError;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Text shown at one position
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    x: f64,
    y: f64,
    text: String,
}

/// Text-state cursor tracking line starts in text space
#[derive(Debug, Default)]
struct Cursor {
    line_x: f64,
    line_y: f64,
    leading: f64,
    /// Set by any positioning operator; cleared once text is shown
    moved: bool,
}

impl Cursor {
    fn begin(&mut self) {
        self.line_x = 0.0;
        self.line_y = 0.0;
        self.moved = true;
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.line_x += tx;
        self.line_y += ty;
        self.moved = true;
    }

    fn set(&mut self, x: f64, y: f64) {
        self.line_x = x;
        self.line_y = y;
        self.moved = true;
    }

    fn next_line(&mut self) {
        self.line_y -= self.leading;
        self.moved = true;
    }
}

/// Text lines of a page, top to bottom
pub fn page_lines(doc: &Document, page_id: ObjectId) -> Result<Vec<String>, ConvertError> {
    let raw = match doc.get_page_content(page_id) {
        Ok(raw) => raw,
        Err(_) => return Ok(Vec::new()),
    };
    let content = Content::decode(&raw)
        .map_err(|e| ConvertError::ParseError(format!("Invalid content stream: {}", e)))?;

    let mut cursor = Cursor::default();
    let mut fragments: Vec<Fragment> = Vec::new();

    for operation in &content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "BT" => cursor.begin(),
            "Td" => {
                if let (Some(tx), Some(ty)) = (number_at(operands, 0), number_at(operands, 1)) {
                    cursor.translate(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number_at(operands, 0), number_at(operands, 1)) {
                    cursor.leading = -ty;
                    cursor.translate(tx, ty);
                }
            }
            "Tm" => {
                if let (Some(e), Some(f)) = (number_at(operands, 4), number_at(operands, 5)) {
                    cursor.set(e, f);
                }
            }
            "TL" => {
                if let Some(leading) = number_at(operands, 0) {
                    cursor.leading = leading;
                }
            }
            "T*" => cursor.next_line(),
            "Tj" | "TJ" => show(&mut cursor, &mut fragments, operands),
            "'" => {
                cursor.next_line();
                show(&mut cursor, &mut fragments, operands);
            }
            "\"" => {
                cursor.next_line();
                show(&mut cursor, &mut fragments, operands.get(2..).unwrap_or(&[]));
            }
            _ => {}
        }
    }

    Ok(layout_lines(fragments))
}

/// Text lines of every page, in page order
pub fn document_lines(doc: &Document) -> Result<Vec<Vec<String>>, ConvertError> {
    doc.get_pages()
        .values()
        .map(|&page_id| page_lines(doc, page_id))
        .collect()
}

fn show(cursor: &mut Cursor, fragments: &mut Vec<Fragment>, operands: &[Object]) {
    let mut text = String::new();
    collect_text(&mut text, operands);
    if text.is_empty() {
        return;
    }

    match fragments.last_mut() {
        Some(last) if !cursor.moved => last.text.push_str(&text),
        _ => fragments.push(Fragment {
            x: cursor.line_x,
            y: cursor.line_y,
            text,
        }),
    }
    cursor.moved = false;
}

fn collect_text(text: &mut String, operands: &[Object]) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
            Object::Array(items) => collect_text(text, items),
            Object::Integer(value) if *value < -100 => text.push(' '),
            Object::Real(value) if *value < -100.0 => text.push(' '),
            _ => {}
        }
    }
}

/// Decode a PDF string: UTF-16BE when it carries a BOM, else byte-per-char
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn number_at(operands: &[Object], index: usize) -> Option<f64> {
    match operands.get(index)? {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(*n as f64),
        _ => None,
    }
}

/// Group fragments by baseline (half-point buckets), top to bottom, left to right
fn layout_lines(fragments: Vec<Fragment>) -> Vec<String> {
    let mut lines: BTreeMap<i64, Vec<Fragment>> = BTreeMap::new();
    for fragment in fragments {
        let key = -(fragment.y * 2.0).round() as i64;
        lines.entry(key).or_default().push(fragment);
    }

    lines
        .into_values()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.iter()
                .map(|f| f.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("  ")
        })
        .filter(|line| !line.is_empty())
        .collect()
}

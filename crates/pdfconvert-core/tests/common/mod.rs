//! Builders for small PDFs used by the integration tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use std::path::{Path, PathBuf};

/// Text drawn at an absolute position
pub struct Text<'a> {
    pub x: i64,
    pub y: i64,
    pub value: &'a str,
}

pub fn text(x: i64, y: i64, value: &str) -> Text<'_> {
    Text { x, y, value }
}

/// One page of the given size with text runs on it
pub struct PageSpec<'a> {
    pub width: i64,
    pub height: i64,
    pub texts: Vec<Text<'a>>,
}

pub fn page<'a>(width: i64, height: i64, texts: Vec<Text<'a>>) -> PageSpec<'a> {
    PageSpec {
        width,
        height,
        texts,
    }
}

/// Build a PDF whose font resources live on the Pages node, so pages
/// only see them through inheritance.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for spec in pages {
        let mut operations = Vec::new();
        for run in &spec.texts {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![run.x.into(), run.y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(run.value.as_bytes().to_vec(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), spec.width.into(), spec.height.into()],
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn write_pdf(dir: &Path, name: &str, pages: &[PageSpec]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages)).unwrap();
    path
}

/// Width and height of every page's own MediaBox
pub fn media_sizes(doc: &Document) -> Vec<(f64, f64)> {
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).unwrap();
            let values: Vec<f64> = page
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|o| match o {
                    Object::Integer(n) => *n as f64,
                    Object::Real(n) => *n as f64,
                    other => panic!("unexpected box entry {:?}", other),
                })
                .collect();
            (values[2] - values[0], values[3] - values[1])
        })
        .collect()
}

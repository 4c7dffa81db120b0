//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document whose pages share a
//! common target size.

use crate::error::ConvertError;
use crate::load_document;
use crate::output::write_atomically;
use crate::page_box::{
    inherited_attribute, page_size, parse_box_array, resolve, scale_box, TargetSize,
    INHERITABLE_KEYS,
};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Boxes that are rescaled along with the MediaBox when present on a page
const PAGE_BOXES: [&[u8]; 5] = [b"MediaBox", b"CropBox", b"BleedBox", b"TrimBox", b"ArtBox"];

/// Summary of a completed merge
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub page_count: u32,
    pub target: TargetSize,
    pub output_bytes: usize,
}

/// Merge PDF files into `destination`.
///
/// The algorithm:
/// 1. Require at least two inputs
/// 2. Load every document
/// 3. Pass 1: compute the target size over all pages
/// 4. Pass 2: rescale every page to fit the target
/// 5. Append pages in input order, then page order
/// 6. Write to a temporary file and rename it over the destination
pub fn merge_files<P: AsRef<Path>>(
    paths: &[P],
    destination: &Path,
) -> Result<MergeReport, ConvertError> {
    if paths.len() < 2 {
        return Err(ConvertError::ValidationError(
            "Please select at least two PDF files to merge".into(),
        ));
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading document for merge");
        let doc = load_document(path)?;
        documents.push(doc);
    }

    let (mut merged, target) = merge_standardized(documents)?;
    let page_count = merged.get_pages().len() as u32;

    let mut buffer = Vec::new();
    merged
        .save_to(&mut buffer)
        .map_err(|e| ConvertError::OperationError(format!("Failed to save merged PDF: {}", e)))?;
    write_atomically(destination, &buffer)?;

    tracing::info!(
        pages = page_count,
        width = target.width,
        height = target.height,
        output = %destination.display(),
        "merged documents"
    );

    Ok(MergeReport {
        page_count,
        target,
        output_bytes: buffer.len(),
    })
}

/// Merge loaded documents into one, normalizing page sizes.
///
/// Every page is scaled by `min(target.width / width, target.height / height)`
/// where the target is the largest width and largest height over all pages.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document, ConvertError> {
    merge_standardized(documents).map(|(doc, _)| doc)
}

fn merge_standardized(
    mut documents: Vec<Document>,
) -> Result<(Document, TargetSize), ConvertError> {
    if documents.len() < 2 {
        return Err(ConvertError::ValidationError(
            "Please select at least two PDF files to merge".into(),
        ));
    }

    let target = target_size(&documents)?;
    for doc in documents.iter_mut() {
        standardize_pages(doc, target)?;
    }

    // Start with the first document as the base
    let mut dest = documents.remove(0);
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = get_page_references(&dest);

    for source in documents.into_iter() {
        let source_pages = get_page_references(&source);

        // Offset object IDs to avoid conflicts
        let id_offset = dest_max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.objects.extend(remapped_objects);

        for old_page_ref in source_pages {
            dest_page_refs.push((old_page_ref.0 + id_offset, old_page_ref.1));
        }

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;

    dest.prune_objects();
    dest.compress();

    Ok((dest, target))
}

/// Largest width and largest height over every page of every document
pub fn target_size(documents: &[Document]) -> Result<TargetSize, ConvertError> {
    let mut target = TargetSize::default();
    for doc in documents {
        for &page_id in doc.get_pages().values() {
            target.include(page_size(doc, page_id)?);
        }
    }
    Ok(target)
}

/// Rescale every page of a document to fit `target`, returning the page count
pub fn standardize_pages(doc: &mut Document, target: TargetSize) -> Result<usize, ConvertError> {
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    for &page_id in &page_ids {
        materialize_inherited(doc, page_id)?;
        let scale = target.scale_for(page_size(doc, page_id)?);
        tracing::debug!(?page_id, scale, "standardizing page");
        scale_page(doc, page_id, scale)?;
    }

    Ok(page_ids.len())
}

/// Copy inheritable attributes onto the page so it can be reparented
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), ConvertError> {
    let mut inherited = Vec::new();
    for key in INHERITABLE_KEYS {
        if let Some(value) = inherited_attribute(doc, page_id, key) {
            inherited.push((key, value.clone()));
        }
    }

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in inherited {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

/// Scale a page's geometry uniformly.
///
/// Page boxes are multiplied coordinate-wise, the content is wrapped in a
/// `cm` transform and annotation rectangles follow. A scale of exactly 1.0
/// leaves the page untouched.
pub fn scale_page(doc: &mut Document, page_id: ObjectId, scale: f64) -> Result<(), ConvertError> {
    if scale == 1.0 {
        return Ok(());
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ConvertError::OperationError(format!(
            "Invalid scale factor {} for page {:?}",
            scale, page_id
        )));
    }

    let mut boxes = Vec::new();
    let existing = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|_| ConvertError::ParseError(format!("Page {:?} not found", page_id)))?;
        for key in PAGE_BOXES {
            if let Ok(value) = page.get(key) {
                let array = resolve(doc, value).as_array().map_err(|_| {
                    ConvertError::ParseError(format!("Page box {:?} is not an array", key))
                })?;
                boxes.push((key, parse_box_array(doc, array)?));
            }
        }

        // Contents may be an indirect reference to an array of streams
        match page.get(b"Contents").map(|value| (value, resolve(doc, value))) {
            Ok((_, Object::Array(items))) => items.clone(),
            Ok((value, _)) => vec![value.clone()],
            Err(_) => Vec::new(),
        }
    };

    let prefix_id = doc.add_object(Stream::new(
        Dictionary::new(),
        encode_content(vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(scale as f32),
                    0.into(),
                    0.into(),
                    Object::Real(scale as f32),
                    0.into(),
                    0.into(),
                ],
            ),
        ])?,
    ));
    let suffix_id = doc.add_object(Stream::new(
        Dictionary::new(),
        encode_content(vec![Operation::new("Q", vec![])])?,
    ));

    let annotation_ids = annotation_ids(doc, page_id);

    let page = page_dict_mut(doc, page_id)?;
    for (key, page_box) in boxes {
        page.set(key.to_vec(), scale_box(page_box, scale));
    }

    if !existing.is_empty() {
        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(prefix_id));
        contents.extend(existing);
        contents.push(Object::Reference(suffix_id));
        page.set("Contents", Object::Array(contents));
    }

    for annot_id in annotation_ids {
        scale_annotation_rect(doc, annot_id, scale);
    }

    Ok(())
}

fn encode_content(operations: Vec<Operation>) -> Result<Vec<u8>, ConvertError> {
    Content { operations }
        .encode()
        .map_err(|e| ConvertError::OperationError(format!("Failed to encode content: {}", e)))
}

/// References of the annotations attached to a page
fn annotation_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Some(annots) = doc
        .objects
        .get(&page_id)
        .and_then(|obj| obj.as_dict().ok())
        .and_then(|dict| dict.get(b"Annots").ok())
    else {
        return Vec::new();
    };

    resolve(doc, annots)
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_reference().ok())
                .collect()
        })
        .unwrap_or_default()
}

fn scale_annotation_rect(doc: &mut Document, annot_id: ObjectId, scale: f64) {
    let rect = doc
        .objects
        .get(&annot_id)
        .and_then(|obj| obj.as_dict().ok())
        .and_then(|dict| dict.get(b"Rect").ok())
        .and_then(|rect| rect.as_array().ok())
        .and_then(|array| parse_box_array(doc, array).ok());

    if let (Some(rect), Some(Object::Dictionary(annot))) = (rect, doc.objects.get_mut(&annot_id)) {
        annot.set("Rect", scale_box(rect, scale));
    }
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, ConvertError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| ConvertError::ParseError(format!("Page {:?} is not a dictionary", page_id)))
}

/// Get all page object references from a document, in page order
fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the root Pages node at `page_refs` and reparent every page to it
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), ConvertError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| ConvertError::ParseError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| ConvertError::ParseError("No Pages in catalog".into()))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs
                .iter()
                .map(|&id| Object::Reference(id))
                .collect::<Vec<_>>();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => {
            return Err(ConvertError::ParseError(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    for &page_id in page_refs {
        page_dict_mut(doc, page_id)?.set("Parent", Object::Reference(pages_id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_box::{media_box, page_sizes, PageSize};
    use lopdf::{dictionary, Document, Object};

    /// Build a document whose pages have the given MediaBox sizes
    fn create_test_doc(sizes: &[(i64, i64)], content_prefix: &str) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for (page_num, &(width, height)) in sizes.iter().enumerate() {
            let content = format!(
                "BT /F1 12 Tf 50 50 Td ({}-Page-{}) Tj ET",
                content_prefix,
                page_num + 1
            );
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            });
            page_ids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => sizes.len() as i64,
                "Kids" => page_ids,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn merged_sizes(doc: &Document) -> Vec<PageSize> {
        page_sizes(doc).unwrap()
    }

    fn page_text(doc: &Document, page_id: ObjectId) -> String {
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    #[test]
    fn test_merge_requires_two_documents() {
        let result = merge_documents(vec![create_test_doc(&[(612, 792)], "Only")]);
        assert!(matches!(result, Err(ConvertError::ValidationError(_))));

        let result = merge_documents(vec![]);
        assert!(matches!(result, Err(ConvertError::ValidationError(_))));
    }

    #[test]
    fn test_merge_two_documents_combines_pages() {
        let doc_a = create_test_doc(&[(612, 792), (612, 792)], "DocA");
        let doc_b = create_test_doc(&[(612, 792); 3], "DocB");

        let merged = merge_documents(vec![doc_a, doc_b]).unwrap();
        assert_eq!(merged.get_pages().len(), 5);
    }

    #[test]
    fn test_merge_preserves_page_order() {
        let doc1 = create_test_doc(&[(612, 792), (612, 792)], "First");
        let doc2 = create_test_doc(&[(612, 792)], "Second");
        let doc3 = create_test_doc(&[(612, 792), (612, 792)], "Third");

        let merged = merge_documents(vec![doc1, doc2, doc3]).unwrap();

        let texts: Vec<String> = merged
            .get_pages()
            .values()
            .map(|&id| page_text(&merged, id))
            .collect();
        let expected = ["First-Page-1", "First-Page-2", "Second-Page-1", "Third-Page-1", "Third-Page-2"];
        assert_eq!(texts.len(), expected.len());
        for (text, label) in texts.iter().zip(expected) {
            assert!(text.contains(label), "expected {} in {}", label, text);
        }
    }

    #[test]
    fn test_scale_page_splices_indirect_contents_array() {
        let mut doc = create_test_doc(&[(100, 100)], "Indirect");
        let page_id = *doc.get_pages().values().next().unwrap();
        let content_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_reference()
            .unwrap();
        let array_id = doc.add_object(Object::Array(vec![Object::Reference(content_id)]));
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Contents", Object::Reference(array_id));

        scale_page(&mut doc, page_id, 2.0).unwrap();

        let contents = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].as_reference().unwrap(), content_id);

        let text = page_text(&doc, page_id);
        assert!(text.contains("Indirect-Page-1"), "content lost: {}", text);
        assert!(text.contains("cm"));
    }

    #[test]
    fn test_merge_keeps_sizes_when_each_page_binds_one_dimension() {
        let doc1 = create_test_doc(&[(100, 200)], "Tall");
        let doc2 = create_test_doc(&[(300, 100)], "Wide");

        let merged = merge_documents(vec![doc1, doc2]).unwrap();
        assert_eq!(
            merged_sizes(&merged),
            vec![PageSize::new(100.0, 200.0), PageSize::new(300.0, 100.0)]
        );
    }

    #[test]
    fn test_merge_enlarges_small_page() {
        let doc1 = create_test_doc(&[(400, 200)], "Big");
        let doc2 = create_test_doc(&[(100, 100)], "Small");

        let merged = merge_documents(vec![doc1, doc2]).unwrap();
        assert_eq!(
            merged_sizes(&merged),
            vec![PageSize::new(400.0, 200.0), PageSize::new(200.0, 200.0)]
        );

        let small_page = *merged.get_pages().get(&2).unwrap();
        let text = page_text(&merged, small_page);
        assert!(text.contains("cm"), "scaled page should carry a transform: {}", text);
        assert!(text.contains("Small-Page-1"));
    }

    #[test]
    fn test_merge_scales_by_binding_ratio() {
        let doc1 = create_test_doc(&[(600, 800)], "A");
        let doc2 = create_test_doc(&[(300, 300), (800, 400)], "B");

        let merged = merge_documents(vec![doc1, doc2]).unwrap();
        let sizes = merged_sizes(&merged);
        // target is (800, 800)
        assert_eq!(sizes[0], PageSize::new(600.0, 800.0));
        assert_eq!(sizes[1], PageSize::new(800.0, 800.0));
        assert_eq!(sizes[2], PageSize::new(800.0, 400.0));
    }

    #[test]
    fn test_pages_are_reparented_to_root() {
        let doc1 = create_test_doc(&[(612, 792)], "A");
        let doc2 = create_test_doc(&[(612, 792)], "B");

        let merged = merge_documents(vec![doc1, doc2]).unwrap();
        let catalog = merged.catalog().unwrap();
        let pages_id = catalog.get(b"Pages").unwrap().as_reference().unwrap();

        for &page_id in merged.get_pages().values() {
            let page = merged.get_object(page_id).unwrap().as_dict().unwrap();
            assert_eq!(page.get(b"Parent").unwrap().as_reference().unwrap(), pages_id);
        }
    }

    #[test]
    fn test_scale_page_scales_offset_boxes() {
        let mut doc = create_test_doc(&[(100, 100)], "Offset");
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("CropBox", vec![10.into(), 10.into(), 90.into(), 90.into()]);

        scale_page(&mut doc, page_id, 2.0).unwrap();

        assert_eq!(media_box(&doc, page_id).unwrap(), [0.0, 0.0, 200.0, 200.0]);
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let crop = parse_box_array(&doc, page.get(b"CropBox").unwrap().as_array().unwrap()).unwrap();
        assert_eq!(crop, [20.0, 20.0, 180.0, 180.0]);
    }

    #[test]
    fn test_scale_page_identity_is_untouched() {
        let mut doc = create_test_doc(&[(100, 100)], "Same");
        let page_id = *doc.get_pages().get(&1).unwrap();
        let before = doc.get_object(page_id).unwrap().clone();

        scale_page(&mut doc, page_id, 1.0).unwrap();
        assert_eq!(format!("{:?}", doc.get_object(page_id).unwrap()), format!("{:?}", before));
    }

    #[test]
    fn test_scale_page_rejects_invalid_scale() {
        let mut doc = create_test_doc(&[(100, 100)], "Bad");
        let page_id = *doc.get_pages().get(&1).unwrap();
        assert!(scale_page(&mut doc, page_id, 0.0).is_err());
        assert!(scale_page(&mut doc, page_id, f64::NAN).is_err());
    }

    #[test]
    fn test_inherited_media_box_survives_reparenting() {
        let mut doc1 = create_test_doc(&[(500, 500)], "Inherit");
        let page_id = *doc1.get_pages().get(&1).unwrap();
        let pages_id = doc1
            .get_object(page_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Parent")
            .unwrap()
            .as_reference()
            .unwrap();
        // Move the MediaBox from the page up to its parent
        doc1.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .remove(b"MediaBox");
        doc1.get_object_mut(pages_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("MediaBox", vec![0.into(), 0.into(), 500.into(), 500.into()]);

        let doc2 = create_test_doc(&[(250, 250)], "Plain");
        let merged = merge_documents(vec![doc2, doc1]).unwrap();

        assert_eq!(
            merged_sizes(&merged),
            vec![PageSize::new(500.0, 500.0), PageSize::new(500.0, 500.0)]
        );
    }

    #[test]
    fn test_merged_document_round_trips() {
        let doc1 = create_test_doc(&[(612, 792), (842, 595)], "Valid1");
        let doc2 = create_test_doc(&[(300, 300)], "Valid2");

        let mut merged = merge_documents(vec![doc1, doc2]).unwrap();
        let mut buffer = Vec::new();
        merged.save_to(&mut buffer).unwrap();

        let reloaded = Document::load_mem(&buffer).unwrap();
        assert_eq!(reloaded.get_pages().len(), 3);
    }
}

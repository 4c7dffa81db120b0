//! Page geometry
//!
//! Reads page boxes from a document and computes the common target size
//! and per-page scale used when merging.

use crate::error::ConvertError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

/// US Letter, used when a page has no MediaBox anywhere in its tree
pub const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Attributes a page may inherit from its ancestors in the page tree
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Width and height of a page box, in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn from_box(media_box: [f64; 4]) -> Self {
        Self {
            width: (media_box[2] - media_box[0]).abs(),
            height: (media_box[3] - media_box[1]).abs(),
        }
    }

    pub fn scaled(&self, scale: f64) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }
}

/// Maximum width and maximum height over a set of pages.
///
/// The two maxima are tracked independently and need not come from the
/// same page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TargetSize {
    pub width: f64,
    pub height: f64,
}

impl TargetSize {
    pub fn include(&mut self, page: PageSize) {
        self.width = self.width.max(page.width);
        self.height = self.height.max(page.height);
    }

    /// Uniform scale that fits `page` inside the target
    pub fn scale_for(&self, page: PageSize) -> f64 {
        scale_factor(page, *self)
    }
}

impl FromIterator<PageSize> for TargetSize {
    fn from_iter<I: IntoIterator<Item = PageSize>>(iter: I) -> Self {
        let mut target = TargetSize::default();
        for page in iter {
            target.include(page);
        }
        target
    }
}

/// `min(target.width / page.width, target.height / page.height)`
pub fn scale_factor(page: PageSize, target: TargetSize) -> f64 {
    let width_scale = target.width / page.width;
    let height_scale = target.height / page.height;
    width_scale.min(height_scale)
}

/// Size of a page's MediaBox, following inheritance
pub fn page_size(doc: &Document, page_id: ObjectId) -> Result<PageSize, ConvertError> {
    let media_box = media_box(doc, page_id)?;
    let size = PageSize::from_box(media_box);

    if size.width <= 0.0 || size.height <= 0.0 {
        return Err(ConvertError::ParseError(format!(
            "Page {:?} has an empty MediaBox",
            page_id
        )));
    }

    Ok(size)
}

/// Page sizes of every page of a document, in page order
pub fn page_sizes(doc: &Document) -> Result<Vec<PageSize>, ConvertError> {
    doc.get_pages()
        .values()
        .map(|&page_id| page_size(doc, page_id))
        .collect()
}

/// MediaBox of a page as `[x1, y1, x2, y2]`
pub fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f64; 4], ConvertError> {
    match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(obj) => {
            let array = resolve(doc, obj)
                .as_array()
                .map_err(|_| ConvertError::ParseError("MediaBox is not an array".into()))?;
            parse_box_array(doc, array)
        }
        None => {
            tracing::warn!(?page_id, "page has no MediaBox, assuming US Letter");
            Ok(DEFAULT_MEDIA_BOX)
        }
    }
}

/// Look up a page attribute, walking up the `Parent` chain if necessary
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict(doc, page_id)?;
    // Depth guard against cyclic Parent links
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = page_dict(doc, parent_id)?;
    }
    None
}

fn page_dict(doc: &Document, id: ObjectId) -> Option<&Dictionary> {
    doc.objects.get(&id)?.as_dict().ok()
}

/// Follow a single indirect reference
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.objects.get(id).unwrap_or(obj),
        other => other,
    }
}

/// Parse a box array [x1, y1, x2, y2]
pub fn parse_box_array(doc: &Document, array: &[Object]) -> Result<[f64; 4], ConvertError> {
    if array.len() != 4 {
        return Err(ConvertError::ParseError(
            "Page box must have 4 elements".to_string(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match resolve(doc, obj) {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(ConvertError::ParseError(format!(
                    "Page box element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

/// Box array scaled coordinate-wise
pub fn scale_box(page_box: [f64; 4], scale: f64) -> Object {
    Object::Array(
        page_box
            .iter()
            .map(|v| Object::Real((v * scale) as f32))
            .collect(),
    )
}

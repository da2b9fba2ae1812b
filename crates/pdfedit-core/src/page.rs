//! Page-level helpers over the lopdf object model
//!
//! Page attributes such as `Resources`, `MediaBox` and `Rotate` may be
//! inherited from ancestor `Pages` nodes; these helpers resolve that chain.

use crate::coords::PdfRect;
use crate::error::EditError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// US Letter, used when a page has no usable MediaBox
pub const DEFAULT_PAGE_BOX: PdfRect = PdfRect {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Attributes a page inherits from its parent chain
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Read an Integer or Real as f64
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Follow a reference (one level of indirection chain at a time) to the object
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    // Bounded to avoid looping on reference cycles
    for _ in 0..16 {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

pub fn name_of(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}

/// Look up a page attribute, walking up `Parent` links when it is inherited
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node_id = page_id;
    for _ in 0..64 {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        node_id = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Effective MediaBox of a page in points
pub fn page_box(doc: &Document, page_id: ObjectId) -> PdfRect {
    let Some(media_box) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return DEFAULT_PAGE_BOX;
    };
    let Object::Array(values) = resolve(doc, &media_box) else {
        return DEFAULT_PAGE_BOX;
    };
    let coords: Vec<f64> = values
        .iter()
        .filter_map(|v| number(resolve(doc, v)))
        .collect();
    if coords.len() != 4 {
        return DEFAULT_PAGE_BOX;
    }
    let (x0, x1) = (coords[0].min(coords[2]), coords[0].max(coords[2]));
    let (y0, y1) = (coords[1].min(coords[3]), coords[1].max(coords[3]));
    if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
        return DEFAULT_PAGE_BOX;
    }
    PdfRect::new(x0, y0, x1 - x0, y1 - y0)
}

/// Effective `/Rotate` of a page normalized to 0, 90, 180 or 270
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|r| number(resolve(doc, &r)))
        .map(|r| (r as i64).rem_euclid(360))
        .unwrap_or(0)
}

/// Copy inherited attributes onto the page itself so it no longer depends
/// on its ancestors
pub fn push_down_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), EditError> {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
        .iter()
        .filter_map(|key| inherited_attribute(doc, page_id, key).map(|v| (*key, v)))
        .collect();
    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(EditError::operation)?;
    for (key, value) in inherited {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

/// Register `value` under `/category/name` in the page's resources.
///
/// Inherited or shared resource dictionaries are copied inline onto the page
/// first, so other pages never see the new entry.
pub fn add_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    value: Object,
) -> Result<(), EditError> {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|r| resolve_dict(doc, &r).cloned())
        .unwrap_or_default();

    let mut entries = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|c| resolve_dict(doc, c).cloned())
        .unwrap_or_default();
    entries.set(name, value);
    resources.set(category, Object::Dictionary(entries));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(EditError::operation)?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Decoded content of a page, all content streams concatenated
pub fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, EditError> {
    doc.get_page_content(page_id).map_err(EditError::operation)
}

/// Replace the page's content with a single fresh stream
pub fn replace_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), EditError> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(EditError::operation)?;
    page.set("Contents", Object::Reference(stream_id));
    Ok(())
}

/// Append a content stream after the existing ones.
///
/// The existing content is bracketed in `q`/`Q` so graphics state it leaves
/// behind (transforms, colors) cannot leak into the appended stream.
pub fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), EditError> {
    let existing = doc
        .get_dictionary(page_id)
        .map_err(EditError::operation)?
        .get(b"Contents")
        .ok()
        .cloned();

    let appended_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let mut contents = Vec::new();
    match existing {
        Some(Object::Reference(id)) => {
            contents.push(Object::Reference(
                doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
            ));
            contents.push(Object::Reference(id));
            contents.push(Object::Reference(
                doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec())),
            ));
        }
        Some(Object::Array(items)) if !items.is_empty() => {
            contents.push(Object::Reference(
                doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
            ));
            contents.extend(items);
            contents.push(Object::Reference(
                doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec())),
            ));
        }
        _ => {}
    }
    contents.push(Object::Reference(appended_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(EditError::operation)?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Serialize a document to bytes
pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, EditError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| EditError::OperationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

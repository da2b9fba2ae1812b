//! Build fresh documents out of pages from existing ones
//!
//! Split, merge and unlock all produce a brand-new document instead of
//! editing the source in place: only the page tree and what the imported
//! pages reference survive, so catalog-level state of the sources (outlines,
//! forms, encryption) is never carried forward.

use crate::error::EditError;
use crate::page::{push_down_inherited, save_document};
use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

/// Parse `bytes`, opening documents encrypted with an empty user password
pub(crate) fn load_source(bytes: &[u8]) -> Result<Document, EditError> {
    let mut doc = Document::load_mem(bytes).map_err(EditError::malformed)?;
    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|e| EditError::PasswordRequired(e.to_string()))?;
    }
    Ok(doc)
}

/// Shift every reference inside `obj` by `offset`
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
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

pub(crate) struct Assembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Assembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append `pages` (1-based, in the given order) of `source`
    pub fn import_pages(&mut self, mut source: Document, pages: &[u32]) -> Result<(), EditError> {
        let source_pages = source.get_pages();
        let selected = pages
            .iter()
            .map(|number| {
                source_pages.get(number).copied().ok_or_else(|| {
                    EditError::InvalidPageSpec(format!(
                        "Page {} does not exist (document has {} pages)",
                        number,
                        source_pages.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for &page_id in &selected {
            push_down_inherited(&mut source, page_id)?;
        }

        // Offset every source id past anything already in the destination
        let offset = self.doc.max_id;
        let source_max = source
            .objects
            .keys()
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
            .max(source.max_id);
        for (old_id, object) in std::mem::take(&mut source.objects) {
            self.doc
                .objects
                .insert((old_id.0 + offset, old_id.1), remap_object_refs(object, offset));
        }
        self.doc.max_id = offset + source_max;

        for (old_id, number) in selected.into_iter().zip(pages) {
            let new_id = (old_id.0 + offset, old_id.1);
            let page = self
                .doc
                .get_dictionary_mut(new_id)
                .map_err(|e| EditError::OperationError(format!("Page {} is unreadable: {}", number, e)))?;
            page.set("Parent", Object::Reference(self.pages_id));
            self.kids.push(new_id);
        }
        debug!(imported = pages.len(), total = self.kids.len(), "Imported pages");
        Ok(())
    }

    /// Mutable access to an imported page, by 0-based position in the output
    pub fn page_mut(&mut self, index: usize) -> Option<&mut lopdf::Dictionary> {
        let id = *self.kids.get(index)?;
        self.doc.get_dictionary_mut(id).ok()
    }

    /// Write the page tree and catalog, drop unreachable objects and serialize
    pub fn finish(mut self) -> Result<Vec<u8>, EditError> {
        if self.kids.is_empty() {
            return Err(EditError::InvalidPageSpec("No pages selected".into()));
        }
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer = dictionary! { "Root" => Object::Reference(catalog_id) };

        self.doc.prune_objects();
        self.doc.compress();
        save_document(&mut self.doc)
    }
}

//! Document editing over in-memory PDF buffers
//!
//! This crate applies non-destructive edits (form values, text, signatures,
//! highlights, strikethroughs, redactions) to a base document and runs
//! page-level batch operations, all using lopdf. Every operation takes bytes
//! and returns a fresh buffer; nothing is patched in place.
//!
//! - [`MutationEngine`]: bake annotations into a document, optionally
//!   rasterizing the result through a [`PageRenderer`]
//! - [`split_document`], [`merge_documents`], [`rotate_pages`],
//!   [`unlock_document`], [`compress_document`]: batch page operations

pub mod annotations;
pub mod apply;
mod assemble;
pub mod command;
pub mod compress;
pub mod coords;
pub mod error;
pub mod forms;
pub mod merge;
pub mod page;
pub mod page_spec;
pub mod raster;
pub mod rect_merge;
pub mod rotate;
pub mod scrub;
pub mod split;
pub mod text_layout;
pub mod unlock;
mod xobject;

#[cfg(test)]
mod test_support;

pub use annotations::{
    Annotation, AnnotationId, AnnotationKind, FontWeight, FormField, FormFieldType, FormValue,
    FormValues, HighlightAnnotation, HighlightColor, RedactionAnnotation, SignatureAnnotation,
    StrikeColor, StrikethroughAnnotation, TextAnnotation,
};
pub use apply::{Export, MutationEngine};
pub use command::{BatchCommand, ProcessMetrics, ProcessResult};
pub use compress::{compress_document, CompressionLevel};
pub use coords::{flip_y, PdfRect, Point, ViewRect};
pub use error::{EditError, MutationWarning};
pub use forms::read_form_fields;
pub use merge::{merge_documents, NamedDocument};
pub use page_spec::{PageRange, PageSpec};
pub use raster::{PageRenderer, RasterOptions, RenderError};
pub use rect_merge::merge_rects;
pub use rotate::{rotate_pages, RotationDelta};
pub use scrub::extract_text;
pub use split::split_document;
pub use unlock::unlock_document;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, EditError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(EditError::malformed)?;
    Ok(doc.get_pages().len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;

    #[test]
    fn test_page_count() {
        assert_eq!(get_page_count(&create_test_pdf(3)).unwrap(), 3);
    }

    #[test]
    fn test_page_count_rejects_garbage() {
        assert!(matches!(
            get_page_count(b"%PDF-1.7 nope"),
            Err(EditError::MalformedInput(_))
        ));
    }
}

//! PDF Split
//!
//! Extracts the pages selected by a [`PageSpec`] into a new document.

use crate::assemble::{load_source, Assembler};
use crate::error::EditError;
use crate::page_spec::PageSpec;
use tracing::info;

/// Split a PDF, keeping only the pages `spec` selects, in ascending order
///
/// The output is built from scratch, so pages that were not selected and
/// anything only they referenced are gone from the result.
pub fn split_document(bytes: &[u8], spec: &PageSpec) -> Result<Vec<u8>, EditError> {
    let doc = load_source(bytes)?;
    let page_count = doc.get_pages().len() as u32;
    let pages = spec.resolve(page_count)?;
    info!(%spec, selected = pages.len(), of = page_count, "Splitting document");

    let mut assembler = Assembler::new();
    assembler.import_pages(doc, &pages)?;
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrub::extract_text;
    use crate::test_support::create_test_pdf;
    use pretty_assertions::assert_eq;

    fn spec(s: &str) -> PageSpec {
        PageSpec::parse(s).unwrap()
    }

    #[test]
    fn test_split_single_page() {
        let result = split_document(&create_test_pdf(5), &spec("3")).unwrap();
        assert_eq!(extract_text(&result).unwrap(), vec!["Page 3"]);
    }

    #[test]
    fn test_split_ranges() {
        let result = split_document(&create_test_pdf(10), &spec("7, 2-4")).unwrap();
        assert_eq!(
            extract_text(&result).unwrap(),
            vec!["Page 2", "Page 3", "Page 4", "Page 7"]
        );
    }

    #[test]
    fn test_split_every_nth() {
        let result = split_document(&create_test_pdf(7), &spec("every 3")).unwrap();
        assert_eq!(extract_text(&result).unwrap(), vec!["Page 3", "Page 6"]);
    }

    #[test]
    fn test_split_all() {
        let result = split_document(&create_test_pdf(4), &PageSpec::All).unwrap();
        assert_eq!(crate::get_page_count(&result).unwrap(), 4);
    }

    #[test]
    fn test_split_out_of_range_only_is_error() {
        let result = split_document(&create_test_pdf(3), &spec("5-9"));
        assert!(matches!(result, Err(EditError::InvalidPageSpec(_))));
    }

    #[test]
    fn test_split_invalid_pdf() {
        let result = split_document(b"not a pdf", &PageSpec::All);
        assert!(matches!(result, Err(EditError::MalformedInput(_))));
    }
}

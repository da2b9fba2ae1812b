//! Remove encryption and permission restrictions

use crate::assemble::{load_source, Assembler};
use crate::error::EditError;
use tracing::info;

/// Copy every page into a new, unrestricted document
///
/// Documents encrypted with only an owner password (permission flags) are
/// opened with the empty user password. Documents that need a real user
/// password fail with `PasswordRequired`.
pub fn unlock_document(bytes: &[u8]) -> Result<Vec<u8>, EditError> {
    let doc = load_source(bytes)?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    info!(pages = pages.len(), "Unlocking document");

    let mut assembler = Assembler::new();
    assembler.import_pages(doc, &pages)?;
    assembler.finish()
}

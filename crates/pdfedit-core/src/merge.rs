//! PDF Merge
//!
//! Combines multiple PDFs into a single, freshly created document.

use crate::assemble::{load_source, Assembler};
use crate::error::EditError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A document buffer with the name it was opened under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedDocument {
    pub name: String,
    #[serde(with = "crate::annotations::base64_bytes")]
    pub bytes: Vec<u8>,
}

impl NamedDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Merge `sources` into one document
///
/// All pages of every source are copied in source order. A source that
/// fails to parse aborts the merge, and the error names it.
pub fn merge_documents(sources: &[NamedDocument]) -> Result<Vec<u8>, EditError> {
    if sources.is_empty() {
        return Err(EditError::OperationError("No documents to merge".into()));
    }
    info!(sources = sources.len(), "Merging documents");

    let mut assembler = Assembler::new();
    for source in sources {
        let doc = load_source(&source.bytes).map_err(|e| match e {
            EditError::MalformedInput(reason) => {
                EditError::MalformedInput(format!("{}: {}", source.name, reason))
            }
            EditError::PasswordRequired(reason) => {
                EditError::PasswordRequired(format!("{}: {}", source.name, reason))
            }
            other => other,
        })?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        assembler.import_pages(doc, &pages)?;
    }
    assembler.finish()
}

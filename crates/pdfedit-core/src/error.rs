use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Failed to parse PDF: {0}")]
    MalformedInput(String),

    #[error("Invalid page specification: {0}")]
    InvalidPageSpec(String),

    #[error("Invalid rotation {0}: expected 90, 180 or 270")]
    InvalidRotation(i64),

    #[error("Document is protected by a user password: {0}")]
    PasswordRequired(String),

    #[error("Failed to rasterize page {page}: {reason}")]
    RasterizationPageFailure { page: u32, reason: String },

    #[error("Rasterization requested but no page renderer is configured")]
    RendererUnavailable,

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

impl EditError {
    pub(crate) fn malformed(e: impl std::fmt::Display) -> Self {
        EditError::MalformedInput(e.to_string())
    }

    pub(crate) fn operation(e: impl std::fmt::Display) -> Self {
        EditError::OperationError(e.to_string())
    }
}

/// Non-fatal problems recorded while applying edits.
///
/// None of these abort an export; the affected element is skipped and the
/// rest of the document is still produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationWarning {
    /// A form value names a field the document does not have.
    MissingField { name: String },
    /// A form value's type does not fit the field it names.
    FieldTypeMismatch { name: String, expected: &'static str },
    /// A dropdown or radio value is not one of the field's options.
    UnknownOption { name: String, value: String },
    /// A signature image could not be decoded or embedded.
    PartialEmbedFailure { annotation_id: String, reason: String },
    /// An annotation points at a page the document does not have.
    PageOutOfRange { annotation_id: String, page: u32 },
    /// Page content could not be decoded, so covered text was not removed
    /// from the content stream (the opaque box is still drawn).
    RedactionScrubSkipped { page: u32, reason: String },
}

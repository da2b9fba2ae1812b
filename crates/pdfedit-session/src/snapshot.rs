//! Per-document editor state
//!
//! A snapshot is replaced wholesale on every edit; helpers that "modify" it
//! return a new value.

use crate::tools::ToolKind;
use pdfedit_core::{
    Annotation, AnnotationId, FormValues, HighlightAnnotation, RedactionAnnotation,
    SignatureAnnotation, StrikethroughAnnotation, TextAnnotation,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSnapshot {
    pub scale: f64,
    pub texts: Vec<TextAnnotation>,
    pub signatures: Vec<SignatureAnnotation>,
    pub highlights: Vec<HighlightAnnotation>,
    pub strikethroughs: Vec<StrikethroughAnnotation>,
    pub redactions: Vec<RedactionAnnotation>,
    pub form_values: FormValues,
    pub selected_id: Option<AnnotationId>,
    pub active_tool: ToolKind,
    pub clipboard: Option<Annotation>,
    /// Number of undoable steps recorded
    pub undo_depth: u32,
}

impl Default for EditorSnapshot {
    fn default() -> Self {
        Self {
            scale: 1.0,
            texts: Vec::new(),
            signatures: Vec::new(),
            highlights: Vec::new(),
            strikethroughs: Vec::new(),
            redactions: Vec::new(),
            form_values: FormValues::new(),
            selected_id: None,
            active_tool: ToolKind::default(),
            clipboard: None,
            undo_depth: 0,
        }
    }
}

impl EditorSnapshot {
    /// All annotations, grouped by type in drawing order
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut out = Vec::with_capacity(self.annotation_count());
        out.extend(self.texts.iter().cloned().map(Annotation::Text));
        out.extend(self.signatures.iter().cloned().map(Annotation::Signature));
        out.extend(self.highlights.iter().cloned().map(Annotation::Highlight));
        out.extend(self.strikethroughs.iter().cloned().map(Annotation::Strikethrough));
        out.extend(self.redactions.iter().cloned().map(Annotation::Redaction));
        out
    }

    pub fn annotation_count(&self) -> usize {
        self.texts.len()
            + self.signatures.len()
            + self.highlights.len()
            + self.strikethroughs.len()
            + self.redactions.len()
    }

    /// True when there is nothing to bake into the document
    pub fn has_no_edits(&self) -> bool {
        self.annotation_count() == 0 && self.form_values.is_empty()
    }

    /// A copy with `annotation` added to its collection and counted as an undo step
    pub fn with_annotation(&self, annotation: Annotation) -> Self {
        let mut next = self.clone();
        match annotation {
            Annotation::Text(a) => next.texts.push(a),
            Annotation::Signature(a) => next.signatures.push(a),
            Annotation::Highlight(a) => next.highlights.push(a),
            Annotation::Strikethrough(a) => next.strikethroughs.push(a),
            Annotation::Redaction(a) => next.redactions.push(a),
        }
        next.undo_depth += 1;
        next
    }

    /// A copy with `id` removed from whichever collection holds it
    pub fn without_annotation(&self, id: &str) -> Option<Self> {
        let mut next = self.clone();
        let before = next.annotation_count();
        next.texts.retain(|a| a.id != id);
        next.signatures.retain(|a| a.id != id);
        next.highlights.retain(|a| a.id != id);
        next.strikethroughs.retain(|a| a.id != id);
        next.redactions.retain(|a| a.id != id);
        if next.annotation_count() == before {
            return None;
        }
        if next.selected_id.as_deref() == Some(id) {
            next.selected_id = None;
        }
        next.undo_depth += 1;
        Some(next)
    }

    /// A copy with the redaction `id` switched on or off.
    ///
    /// Returns `None` when no redaction has that id.
    pub fn set_redaction_enabled(&self, id: &str, enabled: bool) -> Option<Self> {
        let index = self.redactions.iter().position(|r| r.id == id)?;
        let mut next = self.clone();
        next.redactions[index].enabled = enabled;
        Some(next)
    }
}

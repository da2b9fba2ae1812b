//! Editor tool table
//!
//! Built once from configuration and shared read-only; nothing registers
//! tools at runtime.

use anyhow::bail;
use pdfedit_core::AnnotationKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Select,
    Text,
    Signature,
    Highlight,
    Strikethrough,
    Redact,
}

impl ToolKind {
    /// Annotation type this tool creates, if any
    pub fn creates(self) -> Option<AnnotationKind> {
        match self {
            ToolKind::Select => None,
            ToolKind::Text => Some(AnnotationKind::Text),
            ToolKind::Signature => Some(AnnotationKind::Signature),
            ToolKind::Highlight => Some(AnnotationKind::Highlight),
            ToolKind::Strikethrough => Some(AnnotationKind::Strikethrough),
            ToolKind::Redact => Some(AnnotationKind::Redaction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub label: String,
    #[serde(default)]
    pub shortcut: Option<char>,
}

impl ToolSpec {
    fn new(kind: ToolKind, label: &str, shortcut: char) -> Self {
        Self {
            kind,
            label: label.to_string(),
            shortcut: Some(shortcut),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolTable {
    tools: Vec<ToolSpec>,
}

impl Default for ToolTable {
    fn default() -> Self {
        Self {
            tools: vec![
                ToolSpec::new(ToolKind::Select, "Select", 'v'),
                ToolSpec::new(ToolKind::Text, "Add text", 't'),
                ToolSpec::new(ToolKind::Signature, "Sign", 's'),
                ToolSpec::new(ToolKind::Highlight, "Highlight", 'h'),
                ToolSpec::new(ToolKind::Strikethrough, "Strike through", 'k'),
                ToolSpec::new(ToolKind::Redact, "Redact", 'r'),
            ],
        }
    }
}

impl ToolTable {
    /// Build a table, rejecting duplicate tools or shortcuts
    pub fn from_specs(tools: Vec<ToolSpec>) -> anyhow::Result<Self> {
        if tools.is_empty() {
            bail!("Tool table must contain at least one tool");
        }
        let mut kinds = HashSet::new();
        let mut shortcuts = HashSet::new();
        for tool in &tools {
            if !kinds.insert(tool.kind) {
                bail!("Tool {:?} is listed twice", tool.kind);
            }
            if let Some(key) = tool.shortcut {
                if !shortcuts.insert(key.to_ascii_lowercase()) {
                    bail!("Shortcut '{}' is bound to more than one tool", key);
                }
            }
        }
        Ok(Self { tools })
    }

    pub fn get(&self, kind: ToolKind) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.kind == kind)
    }

    pub fn by_shortcut(&self, key: char) -> Option<&ToolSpec> {
        let key = key.to_ascii_lowercase();
        self.tools
            .iter()
            .find(|t| t.shortcut.map(|s| s.to_ascii_lowercase()) == Some(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

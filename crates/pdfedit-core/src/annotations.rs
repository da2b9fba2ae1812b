//! Annotation model for non-destructive PDF edits
//!
//! Annotations describe edits (text, signature, highlight, strikethrough,
//! redaction) attached to one page. They stay out of the document bytes until
//! the mutation engine bakes them in at export time.

use crate::coords::{PdfRect, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type AnnotationId = String;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    /// PDF standard-14 font used for this weight
    pub fn base_font(&self) -> &'static str {
        match self {
            FontWeight::Normal => "Helvetica",
            FontWeight::Bold => "Helvetica-Bold",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Orange,
}

impl HighlightColor {
    pub fn rgb(&self) -> (f32, f32, f32) {
        match self {
            HighlightColor::Yellow => (1.0, 0.92, 0.23),
            HighlightColor::Green => (0.4, 0.9, 0.4),
            HighlightColor::Blue => (0.45, 0.75, 1.0),
            HighlightColor::Pink => (1.0, 0.5, 0.75),
            HighlightColor::Orange => (1.0, 0.65, 0.2),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrikeColor {
    #[default]
    Red,
    Black,
}

impl StrikeColor {
    pub fn rgb(&self) -> (f32, f32, f32) {
        match self {
            StrikeColor::Red => (0.86, 0.1, 0.1),
            StrikeColor::Black => (0.0, 0.0, 0.0),
        }
    }
}

/// Free text placed at a top-origin position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub position: Point,
    pub text: String,
    pub font_size: f64,
    #[serde(default)]
    pub weight: FontWeight,
    /// Wrap lines to this width in points. `None` keeps explicit lines only.
    #[serde(default)]
    pub wrap_width: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Encoded image (PNG or JPEG)
    #[serde(with = "base64_bytes")]
    pub image_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighlightAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub rects: Vec<PdfRect>,
    #[serde(default)]
    pub color: HighlightColor,
    #[serde(default)]
    pub source_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrikethroughAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub rects: Vec<PdfRect>,
    #[serde(default)]
    pub source_text: String,
    #[serde(default)]
    pub color: StrikeColor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedactionAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub rects: Vec<PdfRect>,
    #[serde(default)]
    pub source_text: String,
    /// Disabled redactions are kept for preview but never drawn
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Text,
    Signature,
    Highlight,
    Strikethrough,
    Redaction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    Text(TextAnnotation),
    Signature(SignatureAnnotation),
    Highlight(HighlightAnnotation),
    Strikethrough(StrikethroughAnnotation),
    Redaction(RedactionAnnotation),
}

impl Annotation {
    pub fn id(&self) -> &str {
        match self {
            Annotation::Text(a) => &a.id,
            Annotation::Signature(a) => &a.id,
            Annotation::Highlight(a) => &a.id,
            Annotation::Strikethrough(a) => &a.id,
            Annotation::Redaction(a) => &a.id,
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            Annotation::Text(a) => a.page,
            Annotation::Signature(a) => a.page,
            Annotation::Highlight(a) => a.page,
            Annotation::Strikethrough(a) => a.page,
            Annotation::Redaction(a) => a.page,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Text(_) => AnnotationKind::Text,
            Annotation::Signature(_) => AnnotationKind::Signature,
            Annotation::Highlight(_) => AnnotationKind::Highlight,
            Annotation::Strikethrough(_) => AnnotationKind::Strikethrough,
            Annotation::Redaction(_) => AnnotationKind::Redaction,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldType {
    Text,
    Checkbox,
    Radio,
    Dropdown,
}

impl FormFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormFieldType::Text => "text",
            FormFieldType::Checkbox => "checkbox",
            FormFieldType::Radio => "radio",
            FormFieldType::Dropdown => "dropdown",
        }
    }
}

/// Interactive form field read from a document at load time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub id: String,
    pub field_type: FormFieldType,
    /// Fully qualified field name (`parent.child`)
    pub name: String,
    pub page: u32,
    pub rect: PdfRect,
    pub default_value: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub group_name: Option<String>,
}

/// Value applied to a form field at export time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FormValue {
    Bool(bool),
    Text(String),
}

pub type FormValues = BTreeMap<String, FormValue>;

pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

//! Bake annotations and form values into a document
//!
//! Layers are drawn in a fixed order so later ones dominate: form values,
//! text, signatures, highlights, strikethroughs, then enabled redactions.
//! Enabled redactions also remove the text they cover from the page content
//! (see [`crate::scrub`]), and the optional rasterization pass replaces every
//! page with a bitmap.

use crate::annotations::{
    Annotation, FontWeight, FormValues, HighlightAnnotation, RedactionAnnotation,
    SignatureAnnotation, StrikethroughAnnotation, TextAnnotation,
};
use crate::coords::{flip_y, PdfRect};
use crate::error::{EditError, MutationWarning};
use crate::forms::apply_form_values;
use crate::page::{
    add_page_resource, append_page_content, page_box, page_content, replace_page_content,
    save_document,
};
use crate::raster::{rasterize, PageRenderer, RasterOptions};
use crate::rect_merge::merge_rects;
use crate::scrub::{literal, scrub_operations, PageFonts};
use crate::text_layout::wrap_lines;
use crate::xobject::embed_image;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Line advance as a multiple of the font size
pub const LINE_HEIGHT: f64 = 1.2;
pub const HIGHLIGHT_OPACITY: f32 = 0.4;

const FONT_REGULAR: &str = "PeHelv";
const FONT_BOLD: &str = "PeHelvB";
const HIGHLIGHT_STATE: &str = "PeHl";

/// Output of an export
#[derive(Debug, Clone)]
pub struct Export {
    pub bytes: Vec<u8>,
    /// Non-fatal problems; the affected elements were skipped
    pub warnings: Vec<MutationWarning>,
}

/// Applies annotations to document buffers.
///
/// Without a renderer the engine still exports, but cannot rasterize.
#[derive(Clone, Default)]
pub struct MutationEngine {
    renderer: Option<Arc<dyn PageRenderer>>,
    options: RasterOptions,
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("renderer", &self.renderer.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// Drawing operations for one page, in layer order
#[derive(Default)]
struct PageLayers {
    text: Vec<Operation>,
    signatures: Vec<Operation>,
    highlights: Vec<Operation>,
    strikes: Vec<Operation>,
    redactions: Vec<Operation>,
    redacted: Vec<PdfRect>,
}

impl PageLayers {
    fn into_operations(self) -> Vec<Operation> {
        let mut ops = self.text;
        ops.extend(self.signatures);
        ops.extend(self.highlights);
        ops.extend(self.strikes);
        ops.extend(self.redactions);
        ops
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.signatures.is_empty()
            && self.highlights.is_empty()
            && self.strikes.is_empty()
            && self.redactions.is_empty()
    }
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn rect_path(rect: &PdfRect) -> Operation {
    Operation::new(
        "re",
        vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
    )
}

fn font_resource(weight: FontWeight) -> Object {
    Object::Dictionary(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => weight.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

impl MutationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_options(mut self, options: RasterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    pub fn can_rasterize(&self) -> bool {
        self.renderer.is_some()
    }

    /// Produce a new document from `base` with `form_values` filled in and
    /// `annotations` drawn.
    ///
    /// Fails with `MalformedInput` if `base` does not parse. With
    /// `rasterize`, every page is then rendered to an image; any page
    /// failing aborts the export.
    pub fn apply(
        &self,
        base: &[u8],
        form_values: &FormValues,
        annotations: &[Annotation],
        rasterize_output: bool,
    ) -> Result<Export, EditError> {
        let renderer = match (&self.renderer, rasterize_output) {
            (None, true) => return Err(EditError::RendererUnavailable),
            (renderer, _) => renderer.clone(),
        };

        info!(
            annotations = annotations.len(),
            form_values = form_values.len(),
            rasterize = rasterize_output,
            "Applying edits"
        );
        let mut doc = Document::load_mem(base).map_err(EditError::malformed)?;
        let mut warnings = apply_form_values(&mut doc, form_values)?;

        let pages = doc.get_pages();
        let mut by_page: BTreeMap<u32, Vec<&Annotation>> = BTreeMap::new();
        for annotation in annotations {
            if pages.contains_key(&annotation.page()) {
                by_page.entry(annotation.page()).or_default().push(annotation);
            } else {
                warn!(id = annotation.id(), page = annotation.page(), "Annotation page out of range");
                warnings.push(MutationWarning::PageOutOfRange {
                    annotation_id: annotation.id().to_string(),
                    page: annotation.page(),
                });
            }
        }

        for (number, page_annotations) in by_page {
            let page_id = pages[&number];
            self.apply_page(&mut doc, number, page_id, &page_annotations, &mut warnings)?;
        }

        doc.compress();
        let bytes = save_document(&mut doc)?;

        let bytes = match renderer {
            Some(renderer) if rasterize_output => {
                let redacted_pages: BTreeSet<u32> = annotations
                    .iter()
                    .filter_map(|annotation| match annotation {
                        Annotation::Redaction(r) if r.enabled => Some(r.page),
                        _ => None,
                    })
                    .collect();
                rasterize(&bytes, renderer.as_ref(), &self.options, &redacted_pages)?
            }
            _ => bytes,
        };

        info!(bytes = bytes.len(), warnings = warnings.len(), "Export finished");
        Ok(Export { bytes, warnings })
    }

    fn apply_page(
        &self,
        doc: &mut Document,
        number: u32,
        page_id: ObjectId,
        annotations: &[&Annotation],
        warnings: &mut Vec<MutationWarning>,
    ) -> Result<(), EditError> {
        let media = page_box(doc, page_id);
        let mut layers = PageLayers::default();

        for annotation in annotations {
            match annotation {
                Annotation::Text(text) => {
                    draw_text(doc, page_id, &media, text, &mut layers.text)?;
                }
                Annotation::Signature(signature) => {
                    if let Err(reason) = draw_signature(doc, page_id, &media, signature, &mut layers.signatures) {
                        warn!(id = %signature.id, %reason, "Skipping signature");
                        warnings.push(MutationWarning::PartialEmbedFailure {
                            annotation_id: signature.id.clone(),
                            reason,
                        });
                    }
                }
                Annotation::Highlight(highlight) => {
                    draw_highlight(doc, page_id, highlight, &mut layers.highlights)?;
                }
                Annotation::Strikethrough(strike) => draw_strikethrough(strike, &mut layers.strikes),
                Annotation::Redaction(redaction) => {
                    draw_redaction(redaction, &mut layers.redactions, &mut layers.redacted)
                }
            }
        }

        if layers.is_empty() {
            return Ok(());
        }

        let redacted = std::mem::take(&mut layers.redacted);
        let drawn = layers.into_operations();
        if redacted.is_empty() {
            return append_operations(doc, page_id, drawn);
        }

        let existing = page_content(doc, page_id)
            .and_then(|bytes| Content::decode(&bytes).map_err(EditError::operation));
        match existing {
            Ok(content) => {
                let mut ops = Vec::with_capacity(content.operations.len() + drawn.len() + 2);
                ops.push(Operation::new("q", vec![]));
                ops.extend(content.operations);
                ops.push(Operation::new("Q", vec![]));
                ops.extend(drawn);

                let fonts = PageFonts::load(doc, page_id);
                let (scrubbed, removed) = scrub_operations(ops, &redacted, &fonts);
                debug!(page = number, glyphs = removed, "Removed text under redactions");
                let encoded = Content { operations: scrubbed }
                    .encode()
                    .map_err(EditError::operation)?;
                replace_page_content(doc, page_id, encoded)
            }
            Err(e) => {
                warn!(page = number, error = %e, "Page content unreadable; redaction is visual only");
                warnings.push(MutationWarning::RedactionScrubSkipped {
                    page: number,
                    reason: e.to_string(),
                });
                append_operations(doc, page_id, drawn)
            }
        }
    }
}

fn append_operations(doc: &mut Document, page_id: ObjectId, ops: Vec<Operation>) -> Result<(), EditError> {
    let encoded = Content { operations: ops }
        .encode()
        .map_err(EditError::operation)?;
    append_page_content(doc, page_id, encoded)
}

fn draw_text(
    doc: &mut Document,
    page_id: ObjectId,
    media: &PdfRect,
    text: &TextAnnotation,
    ops: &mut Vec<Operation>,
) -> Result<(), EditError> {
    let font = match text.weight {
        FontWeight::Normal => FONT_REGULAR,
        FontWeight::Bold => FONT_BOLD,
    };
    add_page_resource(doc, page_id, "Font", font, font_resource(text.weight))?;

    let size = text.font_size;
    let lines = wrap_lines(&text.text, size, text.weight, text.wrap_width);
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let top = text.position.y + i as f64 * LINE_HEIGHT * size;
        let x = media.x + text.position.x;
        let y = media.y + flip_y(top, media.height, size);
        ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.into()), real(size)]),
            Operation::new("g", vec![0.into()]),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new("Tj", vec![literal(line)]),
            Operation::new("ET", vec![]),
        ]);
    }
    Ok(())
}

/// Returns the failure reason when the signature cannot be embedded
fn draw_signature(
    doc: &mut Document,
    page_id: ObjectId,
    media: &PdfRect,
    signature: &SignatureAnnotation,
    ops: &mut Vec<Operation>,
) -> Result<(), String> {
    if !(signature.width > 0.0 && signature.height > 0.0) {
        return Err(format!(
            "invalid size {}x{}",
            signature.width, signature.height
        ));
    }
    let image = image::load_from_memory(&signature.image_bytes)
        .map_err(|e| format!("failed to decode image: {}", e))?;
    let image_id = embed_image(doc, &image).map_err(|e| e.to_string())?;

    // Unique within the document
    let name = format!("PeSig{}_{}", image_id.0, image_id.1);
    add_page_resource(doc, page_id, "XObject", &name, Object::Reference(image_id))
        .map_err(|e| e.to_string())?;

    let x = media.x + signature.position.x;
    let y = media.y + flip_y(signature.position.y, media.height, signature.height);
    ops.extend([
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                real(signature.width),
                0.into(),
                0.into(),
                real(signature.height),
                real(x),
                real(y),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.into_bytes())]),
        Operation::new("Q", vec![]),
    ]);
    Ok(())
}

fn draw_highlight(
    doc: &mut Document,
    page_id: ObjectId,
    highlight: &HighlightAnnotation,
    ops: &mut Vec<Operation>,
) -> Result<(), EditError> {
    let rects = merge_rects(&highlight.rects);
    if rects.is_empty() {
        return Ok(());
    }
    add_page_resource(
        doc,
        page_id,
        "ExtGState",
        HIGHLIGHT_STATE,
        Object::Dictionary(dictionary! {
            "Type" => "ExtGState",
            "ca" => HIGHLIGHT_OPACITY,
            "CA" => HIGHLIGHT_OPACITY,
        }),
    )?;

    let (r, g, b) = highlight.color.rgb();
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("gs", vec![Object::Name(HIGHLIGHT_STATE.into())]));
    ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
    for rect in &rects {
        ops.push(rect_path(rect));
    }
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("Q", vec![]));
    Ok(())
}

fn draw_strikethrough(strike: &StrikethroughAnnotation, ops: &mut Vec<Operation>) {
    let rects = merge_rects(&strike.rects);
    if rects.is_empty() {
        return;
    }
    let (r, g, b) = strike.color.rgb();
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
    for rect in &rects {
        let center = rect.y + rect.height / 2.0;
        ops.push(Operation::new("w", vec![real((rect.height * 0.08).max(1.0))]));
        ops.push(Operation::new("m", vec![real(rect.x), real(center)]));
        ops.push(Operation::new("l", vec![real(rect.right()), real(center)]));
        ops.push(Operation::new("S", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
}

fn draw_redaction(redaction: &RedactionAnnotation, ops: &mut Vec<Operation>, redacted: &mut Vec<PdfRect>) {
    if !redaction.enabled {
        return;
    }
    let rects = merge_rects(&redaction.rects);
    if rects.is_empty() {
        return;
    }
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("g", vec![0.into()]));
    for rect in &rects {
        ops.push(rect_path(rect));
    }
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("Q", vec![]));
    redacted.extend(rects);
}

//! Rasterization: rebuild a document whose pages are images of the original
//!
//! Rendering itself is delegated to a [`PageRenderer`]. Pages are rendered
//! one at a time, in order, and the first failure aborts the whole call.

use crate::annotations::FontWeight;
use crate::error::EditError;
use crate::page::{page_box, page_rotation, save_document};
use crate::scrub::{literal, page_text_runs};
use crate::text_layout::text_width;
use crate::xobject::rgb_stream;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

const RASTER_NAME: &str = "PeRaster";
const TEXT_FONT_NAME: &str = "PeHelv";

#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Renders single pages of a document to bitmaps
pub trait PageRenderer: Send + Sync {
    /// Render page `page_index` (0-based) of `document` at `scale` times its
    /// point size. The bitmap reflects the page's `/Rotate`.
    fn render_page(&self, document: &[u8], page_index: usize, scale: f32) -> Result<RgbImage, RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterOptions {
    /// Linear render scale; 2.0 renders a letter page at 1224x1584
    pub scale: f32,
    /// Lay an invisible text layer over pages without enabled redactions.
    /// Off by default so rasterized pages are purely image content.
    pub searchable_text: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            searchable_text: false,
        }
    }
}

fn invisible_text_ops(runs: &[crate::scrub::TextRun], origin_x: f64, origin_y: f64) -> Vec<Operation> {
    let mut ops = Vec::new();
    for run in runs {
        if run.font_size <= 0.0 || !run.font_size.is_finite() {
            continue;
        }
        let natural = text_width(&run.text, run.font_size, FontWeight::Normal);
        let stretch = if natural > 0.0 {
            (run.bounds.width / natural * 100.0).clamp(10.0, 1000.0)
        } else {
            100.0
        };
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tr", vec![3.into()]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(TEXT_FONT_NAME.into()), Object::Real(run.font_size as f32)],
        ));
        ops.push(Operation::new("Tz", vec![Object::Real(stretch as f32)]));
        ops.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                Object::Real((run.x - origin_x) as f32),
                Object::Real((run.y - origin_y) as f32),
            ],
        ));
        ops.push(Operation::new("Tj", vec![literal(&run.text)]));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Replace every page with a bitmap of itself.
///
/// Output pages keep the displayed size of the originals (rotation baked
/// in). With `searchable_text`, the text still present in the source is laid
/// over unrotated pages in invisible render mode. Pages listed in
/// `redacted_pages` (1-based) never get a text layer.
pub fn rasterize(
    bytes: &[u8],
    renderer: &dyn PageRenderer,
    options: &RasterOptions,
    redacted_pages: &BTreeSet<u32>,
) -> Result<Vec<u8>, EditError> {
    let source = Document::load_mem(bytes).map_err(EditError::malformed)?;
    let pages = source.get_pages();
    info!(pages = pages.len(), scale = options.scale, "Rasterizing document");

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::with_capacity(pages.len());
    for (index, (&number, &page_id)) in pages.iter().enumerate() {
        let bitmap = renderer
            .render_page(bytes, index, options.scale)
            .map_err(|e| {
                warn!(page = number, error = %e, "Page render failed; aborting rasterization");
                EditError::RasterizationPageFailure {
                    page: number,
                    reason: e.to_string(),
                }
            })?;
        debug!(page = number, width = bitmap.width(), height = bitmap.height(), "Rendered page");

        let media = page_box(&source, page_id);
        let rotation = page_rotation(&source, page_id);
        let (width, height) = match rotation {
            90 | 270 => (media.height, media.width),
            _ => (media.width, media.height),
        };

        let image_id = doc.add_object(rgb_stream(&bitmap)?);
        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width as f32),
                    0.into(),
                    0.into(),
                    Object::Real(height as f32),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(RASTER_NAME.into())]),
            Operation::new("Q", vec![]),
        ];

        if options.searchable_text && redacted_pages.contains(&number) {
            debug!(page = number, "Page carries redactions; no text layer");
        } else if options.searchable_text && rotation == 0 {
            match page_text_runs(&source, page_id) {
                Ok(runs) => ops.extend(invisible_text_ops(&runs, media.x, media.y)),
                Err(e) => warn!(page = number, error = %e, "No text layer for page"),
            }
        }

        let content = Content { operations: ops }
            .encode()
            .map_err(EditError::operation)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width as f32), Object::Real(height as f32)],
            "Resources" => dictionary! {
                "XObject" => dictionary! { RASTER_NAME => Object::Reference(image_id) },
                "Font" => dictionary! { TEXT_FONT_NAME => Object::Reference(font_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();
    save_document(&mut doc)
}

/// Renderer backed by a Pdfium library bound at runtime
#[cfg(feature = "pdfium")]
pub mod pdfium {
    use super::{PageRenderer, RenderError};
    use image::RgbImage;
    use pdfium_render::prelude::*;

    pub struct PdfiumRenderer {
        pdfium: Pdfium,
    }

    impl PdfiumRenderer {
        /// Bind to a Pdfium library next to the executable, falling back to
        /// the system library
        pub fn new() -> Result<Self, RenderError> {
            let local = Pdfium::pdfium_platform_library_name_at_path("./");
            let bindings = Pdfium::bind_to_library(&local)
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| RenderError(format!("failed to bind to a pdfium library: {}", e)))?;
            Ok(Self {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    impl PageRenderer for PdfiumRenderer {
        fn render_page(&self, document: &[u8], page_index: usize, scale: f32) -> Result<RgbImage, RenderError> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(document, None)
                .map_err(|e| RenderError(e.to_string()))?;
            let index = PdfPageIndex::try_from(page_index)
                .map_err(|_| RenderError(format!("page {} is out of supported range", page_index)))?;
            let page = document
                .pages()
                .get(index)
                .map_err(|e| RenderError(e.to_string()))?;

            let config = PdfRenderConfig::new().scale_page_by_factor(scale.max(0.1));
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| RenderError(e.to_string()))?;
            let rendered = bitmap.as_image().to_rgb8();
            let (width, height) = (rendered.width(), rendered.height());
            RgbImage::from_raw(width, height, rendered.into_raw())
                .ok_or_else(|| RenderError("bitmap size mismatch".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrub::extract_text;
    use crate::test_support::{build_document, create_test_pdf, save};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Paints every page white and counts calls
    struct BlankRenderer {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl BlankRenderer {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl PageRenderer for BlankRenderer {
        fn render_page(&self, _: &[u8], page_index: usize, scale: f32) -> Result<RgbImage, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(page_index) == self.fail_on {
                return Err(RenderError("surface lost".into()));
            }
            let size = (100.0 * scale) as u32;
            Ok(RgbImage::from_pixel(size, size, image::Rgb([255, 255, 255])))
        }
    }

    #[test]
    fn test_rasterize_replaces_pages_with_images() {
        let renderer = BlankRenderer::new(None);
        let output = rasterize(&create_test_pdf(3), &renderer, &RasterOptions::default(), &BTreeSet::new()).unwrap();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 3);

        let doc = Document::load_mem(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        for page_id in doc.get_pages().values() {
            let content = doc.get_page_content(*page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            assert!(text.contains("/PeRaster Do"));
        }
    }

    fn searchable() -> RasterOptions {
        RasterOptions {
            searchable_text: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_text_layer_keeps_text_searchable() {
        let renderer = BlankRenderer::new(None);
        let output = rasterize(&create_test_pdf(2), &renderer, &searchable(), &BTreeSet::new()).unwrap();
        let pages = extract_text(&output).unwrap();
        assert_eq!(pages, vec!["Page 1".to_string(), "Page 2".to_string()]);
    }

    #[test]
    fn test_default_output_has_no_text() {
        assert!(!RasterOptions::default().searchable_text);
        let renderer = BlankRenderer::new(None);
        let output = rasterize(&create_test_pdf(2), &renderer, &RasterOptions::default(), &BTreeSet::new()).unwrap();
        let pages = extract_text(&output).unwrap();
        assert!(pages.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_redacted_pages_never_get_text_layer() {
        let renderer = BlankRenderer::new(None);
        let redacted = BTreeSet::from([2]);
        let output = rasterize(&create_test_pdf(3), &renderer, &searchable(), &redacted).unwrap();
        let pages = extract_text(&output).unwrap();
        assert_eq!(
            pages,
            vec!["Page 1".to_string(), String::new(), "Page 3".to_string()]
        );
    }

    #[test]
    fn test_failure_aborts_remaining_pages() {
        let renderer = BlankRenderer::new(Some(1));
        let result = rasterize(&create_test_pdf(4), &renderer, &RasterOptions::default(), &BTreeSet::new());
        match result {
            Err(EditError::RasterizationPageFailure { page, reason }) => {
                assert_eq!(page, 2);
                assert_eq!(reason, "surface lost");
            }
            other => panic!("expected page failure, got {:?}", other.map(|b| b.len())),
        }
        // Pages after the failing one are never rendered
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rotated_page_keeps_displayed_size() {
        let (mut doc, page_ids) = build_document(&[vec![("sideways", 50.0, 50.0)]]);
        doc.get_dictionary_mut(page_ids[0]).unwrap().set("Rotate", 90);
        let bytes = save(&mut doc);

        let output = rasterize(&bytes, &BlankRenderer::new(None), &searchable(), &BTreeSet::new()).unwrap();
        let out = Document::load_mem(&output).unwrap();
        let page_id = out.get_pages()[&1];
        let media = page_box(&out, page_id);
        assert_eq!((media.width, media.height), (792.0, 612.0));
        assert_eq!(page_rotation(&out, page_id), 0);
        // No text layer on rotated pages
        assert_eq!(extract_text(&output).unwrap(), vec![String::new()]);
    }
}

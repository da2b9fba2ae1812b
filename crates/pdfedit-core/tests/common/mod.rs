//! Shared fixtures for pdfedit-core integration tests

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use lopdf::{content::Content, content::Operation, dictionary, Document, Object, Stream};
use pdfedit_core::{PageRenderer, RenderError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Create a synthetic PDF whose pages each show `"{prefix}-{n}"` at (100, 700)
pub fn create_synthetic_pdf(num_pages: u32, content_prefix: &str) -> Vec<u8> {
    let labels: Vec<String> = (1..=num_pages)
        .map(|i| format!("{}-{}", content_prefix, i))
        .collect();
    let pages: Vec<Vec<(&str, f64, f64)>> = labels
        .iter()
        .map(|l| vec![(l.as_str(), 100.0, 700.0)])
        .collect();
    create_pdf(&pages)
}

/// Create a PDF from per-page `(text, x, y)` lines, 12pt Helvetica
pub fn create_pdf(pages: &[Vec<(&str, f64, f64)>]) -> Vec<u8> {
    create_pdf_in_font(pages, "Helvetica")
}

/// Like [`create_pdf`], set in the standard font `base_font`
pub fn create_pdf_in_font(pages: &[Vec<(&str, f64, f64)>], base_font: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (text, x, y) in lines {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Real(*x as f32), Object::Real(*y as f32)]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn page_rotations(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|id| pdfedit_core::page::page_rotation(&doc, *id))
        .collect()
}

/// Renderer that paints every page white, optionally failing on one page
pub struct FakeRenderer {
    pub calls: AtomicUsize,
    pub fail_on: Option<usize>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: None,
        }
    }

    pub fn failing_on(page_index: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(page_index),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageRenderer for FakeRenderer {
    fn render_page(&self, _document: &[u8], page_index: usize, scale: f32) -> Result<RgbImage, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(page_index) {
            return Err(RenderError(format!("cannot render page index {}", page_index)));
        }
        let (w, h) = ((61.2 * scale) as u32, (79.2 * scale) as u32);
        Ok(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])))
    }
}

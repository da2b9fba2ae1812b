//! Positioned text in content streams, and removal of text under redactions
//!
//! Glyph advances come from the selected font's `/Widths` array, the fixed
//! 600-unit pitch of the Courier family, or else the Helvetica metrics
//! table. Boxes use a 0.2 em descent and 0.8 em ascent, which is close
//! enough to decide which glyphs a redaction rectangle covers. Removed glyphs are replaced by a
//! `TJ` displacement of the same width so the rest of the line stays put.
//!
//! Text drawn from form XObjects is not visited.

use crate::annotations::FontWeight;
use crate::coords::PdfRect;
use crate::error::EditError;
use crate::page::{name_of, number, resolve, resolve_dict};
use crate::text_layout::{decode_win_ansi, glyph_width, FALLBACK_WIDTH};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

const DESCENT: f64 = -0.2;
const ASCENT: f64 = 0.8;

/// TJ adjustments more negative than this read as a word gap
const WORD_GAP: f64 = -200.0;

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn apply(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn translate(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Text shown by one operator, in page space
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Baseline origin of the first glyph
    pub x: f64,
    pub y: f64,
    /// Effective font size in page units
    pub font_size: f64,
    pub bounds: PdfRect,
}

/// Advance widths of one font, in thousandths of an em
#[derive(Debug, Clone, PartialEq)]
enum FontWidths {
    Helvetica(FontWeight),
    Monospace(f64),
    Table {
        first_char: i64,
        widths: Vec<f64>,
        missing: f64,
    },
}

impl FontWidths {
    fn of(doc: &Document, font: &Dictionary) -> Self {
        let first_char = font.get(b"FirstChar").ok().and_then(number);
        let widths = font.get(b"Widths").ok().map(|w| resolve(doc, w));
        if let (Some(first_char), Some(Object::Array(items))) = (first_char, widths) {
            let missing = font
                .get(b"FontDescriptor")
                .ok()
                .and_then(|d| resolve_dict(doc, d))
                .and_then(|d| d.get(b"MissingWidth").ok())
                .and_then(number)
                .filter(|w| *w > 0.0)
                .unwrap_or(f64::from(FALLBACK_WIDTH));
            return Self::Table {
                first_char: first_char as i64,
                widths: items
                    .iter()
                    .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                    .collect(),
                missing,
            };
        }

        let base = font.get(b"BaseFont").ok().and_then(name_of).unwrap_or_default();
        // Drop a subset tag such as "ABCDEF+"
        let base = match base.iter().position(|&b| b == b'+') {
            Some(i) => &base[i + 1..],
            None => base,
        };
        if base.starts_with(b"Courier") {
            Self::Monospace(600.0)
        } else if base.windows(4).any(|w| w == b"Bold") {
            Self::Helvetica(FontWeight::Bold)
        } else {
            Self::Helvetica(FontWeight::Normal)
        }
    }

    fn width(&self, byte: u8) -> f64 {
        match self {
            Self::Helvetica(weight) => f64::from(glyph_width(byte, *weight)),
            Self::Monospace(width) => *width,
            Self::Table {
                first_char,
                widths,
                missing,
            } => usize::try_from(i64::from(byte) - first_char)
                .ok()
                .and_then(|i| widths.get(i))
                .copied()
                .filter(|w| *w > 0.0)
                .unwrap_or(*missing),
        }
    }
}

/// Width tables for the fonts a page selects with `Tf`.
///
/// The default knows no fonts and measures everything as Helvetica.
#[derive(Debug, Default, Clone)]
pub struct PageFonts {
    fonts: Vec<(Vec<u8>, FontWidths)>,
}

impl PageFonts {
    /// Read the fonts in `page_id`'s resources
    pub fn load(doc: &Document, page_id: ObjectId) -> Self {
        let fonts = doc
            .get_page_fonts(page_id)
            .into_iter()
            .map(|(name, dict)| (name, FontWidths::of(doc, dict)))
            .collect();
        Self { fonts }
    }

    fn find(&self, name: &[u8]) -> Option<usize> {
        self.fonts.iter().position(|(n, _)| n == name)
    }

    fn width(&self, font: Option<usize>, byte: u8) -> f64 {
        match font.and_then(|i| self.fonts.get(i)) {
            Some((_, widths)) => widths.width(byte),
            None => f64::from(glyph_width(byte, FontWeight::Normal)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    /// Index into the page's [`PageFonts`]
    font: Option<usize>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// Horizontal scaling as a fraction (`Tz 100` is 1.0)
    scaling: f64,
    leading: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scaling: 1.0,
            leading: 0.0,
        }
    }
}

struct Glyph {
    byte: u8,
    bounds: PdfRect,
    /// `TJ` number that reproduces this glyph's advance, when one exists
    displacement: Option<f64>,
}

struct TextCursor<'a> {
    fonts: &'a PageFonts,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
}

fn operand(op: &Operation, i: usize) -> Option<f64> {
    op.operands.get(i).and_then(number)
}

impl<'a> TextCursor<'a> {
    fn new(fonts: &'a PageFonts) -> Self {
        Self {
            fonts,
            gs: GraphicsState::default(),
            stack: Vec::new(),
            tm: IDENTITY,
            tlm: IDENTITY,
        }
    }

    /// Update state for non-showing operators
    fn update(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.gs),
            "Q" => {
                if let Some(gs) = self.stack.pop() {
                    self.gs = gs;
                }
            }
            "cm" => {
                if let Some(m) = self.matrix_operands(op) {
                    self.gs.ctm = multiply(&m, &self.gs.ctm);
                }
            }
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tf" => {
                self.gs.font = op
                    .operands
                    .first()
                    .and_then(name_of)
                    .and_then(|name| self.fonts.find(name));
                if let Some(size) = operand(op, 1) {
                    self.gs.font_size = size;
                }
            }
            "Tc" => {
                if let Some(v) = operand(op, 0) {
                    self.gs.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operand(op, 0) {
                    self.gs.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operand(op, 0) {
                    self.gs.scaling = v / 100.0;
                }
            }
            "TL" => {
                if let Some(v) = operand(op, 0) {
                    self.gs.leading = v;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (operand(op, 0), operand(op, 1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (operand(op, 0), operand(op, 1)) {
                    self.gs.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = self.matrix_operands(op) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            _ => {}
        }
    }

    fn matrix_operands(&self, op: &Operation) -> Option<Matrix> {
        let mut m = [0.0; 6];
        for (i, slot) in m.iter_mut().enumerate() {
            *slot = operand(op, i)?;
        }
        Some(m)
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = multiply(&translate(tx, ty), &self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.gs.leading);
    }

    fn rendering_matrix(&self) -> Matrix {
        multiply(&self.tm, &self.gs.ctm)
    }

    fn origin(&self) -> (f64, f64, f64) {
        let m = self.rendering_matrix();
        let (x, y) = apply(&m, 0.0, 0.0);
        let vertical = (m[2] * m[2] + m[3] * m[3]).sqrt();
        (x, y, self.gs.font_size.abs() * vertical)
    }

    /// Lay out `bytes` at the current text position and advance past them
    fn show(&mut self, bytes: &[u8]) -> Vec<Glyph> {
        let gs = self.gs;
        let mut glyphs = Vec::with_capacity(bytes.len());
        for &byte in bytes {
            let w0 = self.fonts.width(gs.font, byte) / 1000.0;
            let spacing = gs.char_spacing + if byte == b' ' { gs.word_spacing } else { 0.0 };
            let advance = (w0 * gs.font_size + spacing) * gs.scaling;

            let m = self.rendering_matrix();
            let corners = [
                apply(&m, 0.0, DESCENT * gs.font_size),
                apply(&m, advance, DESCENT * gs.font_size),
                apply(&m, 0.0, ASCENT * gs.font_size),
                apply(&m, advance, ASCENT * gs.font_size),
            ];
            let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
            let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
            for (x, y) in corners {
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);
            }

            let displacement = (gs.font_size != 0.0 && gs.scaling != 0.0)
                .then(|| -advance / gs.scaling * 1000.0 / gs.font_size);

            glyphs.push(Glyph {
                byte,
                bounds: PdfRect::new(x0, y0, x1 - x0, y1 - y0),
                displacement,
            });
            self.tm = multiply(&translate(advance, 0.0), &self.tm);
        }
        glyphs
    }

    /// Apply a `TJ` number
    fn displace(&mut self, amount: f64) {
        let tx = -amount / 1000.0 * self.gs.font_size * self.gs.scaling;
        self.tm = multiply(&translate(tx, 0.0), &self.tm);
    }
}

fn bounds_of(glyphs: &[Glyph]) -> Option<PdfRect> {
    glyphs
        .iter()
        .map(|g| g.bounds)
        .reduce(|acc, b| acc.union(&b))
}

/// Positioned text runs drawn by a content stream, measured as Helvetica
pub fn text_runs(operations: &[Operation]) -> Vec<TextRun> {
    text_runs_with_fonts(operations, &PageFonts::default())
}

/// Positioned text runs drawn by a content stream using `fonts`
pub fn text_runs_with_fonts(operations: &[Operation], fonts: &PageFonts) -> Vec<TextRun> {
    let mut cursor = TextCursor::new(fonts);
    let mut runs = Vec::new();

    for op in operations {
        let elements: Vec<&Object> = match op.operator.as_str() {
            "Tj" => op.operands.iter().take(1).collect(),
            "'" => {
                cursor.next_line();
                op.operands.iter().take(1).collect()
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (operand(op, 0), operand(op, 1)) {
                    cursor.gs.word_spacing = aw;
                    cursor.gs.char_spacing = ac;
                }
                cursor.next_line();
                op.operands.iter().skip(2).take(1).collect()
            }
            "TJ" => match op.operands.first() {
                Some(Object::Array(items)) => items.iter().collect(),
                _ => Vec::new(),
            },
            _ => {
                cursor.update(op);
                continue;
            }
        };

        let (x, y, font_size) = cursor.origin();
        let mut text = String::new();
        let mut glyphs = Vec::new();
        for element in elements {
            match element {
                Object::String(bytes, _) => {
                    text.push_str(&decode_win_ansi(bytes));
                    glyphs.extend(cursor.show(bytes));
                }
                other => {
                    if let Some(amount) = number(other) {
                        if amount < WORD_GAP && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        cursor.displace(amount);
                    }
                }
            }
        }

        if let Some(bounds) = bounds_of(&glyphs) {
            if !text.trim().is_empty() {
                runs.push(TextRun {
                    text,
                    x,
                    y,
                    font_size,
                    bounds,
                });
            }
        }
    }
    runs
}

fn push_displacement(items: &mut Vec<Object>, amount: f64) {
    if let Some(Object::Real(last)) = items.last_mut() {
        *last += amount as f32;
        return;
    }
    items.push(Object::Real(amount as f32));
}

/// Remove glyphs whose box intersects any of `rects`.
///
/// Returns the rewritten operations and the number of glyphs removed.
/// Operators that show nothing covered are passed through unchanged.
pub fn scrub_operations(
    operations: Vec<Operation>,
    rects: &[PdfRect],
    fonts: &PageFonts,
) -> (Vec<Operation>, usize) {
    let mut cursor = TextCursor::new(fonts);
    let mut out = Vec::with_capacity(operations.len());
    let mut removed = 0;

    let covered = |g: &Glyph| g.displacement.is_some() && rects.iter().any(|r| r.intersects(&g.bounds));

    for op in operations {
        let mut prefix = Vec::new();
        let elements: Vec<Object> = match op.operator.as_str() {
            "Tj" => op.operands.iter().take(1).cloned().collect(),
            "'" => {
                cursor.next_line();
                prefix.push(Operation::new("T*", vec![]));
                op.operands.iter().take(1).cloned().collect()
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (operand(&op, 0), operand(&op, 1)) {
                    cursor.gs.word_spacing = aw;
                    cursor.gs.char_spacing = ac;
                    prefix.push(Operation::new("Tw", vec![Object::Real(aw as f32)]));
                    prefix.push(Operation::new("Tc", vec![Object::Real(ac as f32)]));
                }
                cursor.next_line();
                prefix.push(Operation::new("T*", vec![]));
                op.operands.iter().skip(2).take(1).cloned().collect()
            }
            "TJ" => match op.operands.first() {
                Some(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            },
            _ => {
                cursor.update(&op);
                out.push(op);
                continue;
            }
        };

        let mut items = Vec::new();
        let mut op_removed = 0;
        for element in elements {
            match element {
                Object::String(bytes, format) => {
                    let mut kept = Vec::new();
                    for glyph in cursor.show(&bytes) {
                        if covered(&glyph) {
                            if !kept.is_empty() {
                                items.push(Object::String(std::mem::take(&mut kept), format.clone()));
                            }
                            if let Some(amount) = glyph.displacement {
                                push_displacement(&mut items, amount);
                            }
                            op_removed += 1;
                        } else {
                            kept.push(glyph.byte);
                        }
                    }
                    if !kept.is_empty() {
                        items.push(Object::String(kept, format.clone()));
                    }
                }
                other => {
                    if let Some(amount) = number(&other) {
                        cursor.displace(amount);
                        push_displacement(&mut items, amount);
                    }
                }
            }
        }

        if op_removed == 0 {
            out.push(op);
            continue;
        }
        removed += op_removed;
        out.extend(prefix);
        out.push(Operation::new("TJ", vec![Object::Array(items)]));
    }

    (out, removed)
}

/// Positioned text runs of one page
pub fn page_text_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>, EditError> {
    let content = doc.get_page_content(page_id).map_err(EditError::operation)?;
    let content = Content::decode(&content).map_err(EditError::operation)?;
    Ok(text_runs_with_fonts(&content.operations, &PageFonts::load(doc, page_id)))
}

/// Text of every page, runs joined by spaces
pub fn extract_text(bytes: &[u8]) -> Result<Vec<String>, EditError> {
    let doc = Document::load_mem(bytes).map_err(EditError::malformed)?;
    doc.get_pages()
        .values()
        .map(|page_id| {
            let runs = page_text_runs(&doc, *page_id)?;
            Ok(runs
                .iter()
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join(" "))
        })
        .collect()
}

pub(crate) fn literal(text: &str) -> Object {
    Object::String(crate::text_layout::encode_win_ansi(text), StringFormat::Literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use lopdf::dictionary;

    fn ops(source: &str) -> Vec<Operation> {
        Content::decode(source.as_bytes()).unwrap().operations
    }

    fn shown(operations: &[Operation]) -> String {
        text_runs(operations)
            .iter()
            .map(|r| r.text.clone())
            .collect::<Vec<_>>()
            .join("|")
    }

    #[test]
    fn test_text_run_position() {
        let runs = text_runs(&ops("BT /F1 12 Tf 100 700 Td (Hello) Tj ET"));
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.text, "Hello");
        assert!((run.x - 100.0).abs() < 1e-9);
        assert!((run.y - 700.0).abs() < 1e-9);
        assert!((run.font_size - 12.0).abs() < 1e-9);
        // H e l l o = 2278 units at 12pt
        assert!((run.bounds.width - 27.336).abs() < 1e-6);
        assert!((run.bounds.y - 697.6).abs() < 1e-6);
    }

    #[test]
    fn test_cm_and_graphics_stack() {
        let runs = text_runs(&ops(
            "q 2 0 0 2 10 20 cm BT /F1 10 Tf 5 5 Td (A) Tj ET Q BT /F1 10 Tf 5 5 Td (B) Tj ET",
        ));
        assert_eq!(runs.len(), 2);
        assert!((runs[0].x - 20.0).abs() < 1e-9);
        assert!((runs[0].y - 30.0).abs() < 1e-9);
        assert!((runs[0].font_size - 20.0).abs() < 1e-9);
        assert!((runs[1].x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_leading_operators() {
        let runs = text_runs(&ops(
            "BT /F1 10 Tf 14 TL 50 500 Td (one) Tj (two) ' T* (three) Tj ET",
        ));
        let ys: Vec<f64> = runs.iter().map(|r| r.y).collect();
        assert_eq!(ys, vec![500.0, 486.0, 472.0]);
    }

    #[test]
    fn test_tj_word_gap_becomes_space() {
        let runs = text_runs(&ops("BT /F1 10 Tf 0 0 Td [(Hello) -400 (World)] TJ ET"));
        assert_eq!(runs[0].text, "Hello World");
    }

    #[test]
    fn test_scrub_removes_covered_glyphs_only() {
        let operations = ops(
            "BT /F1 12 Tf 100 700 Td (Name: Secret) Tj ET BT /F1 12 Tf 100 600 Td (Public) Tj ET",
        );
        let before = text_runs(&operations);
        let name_width =
            crate::text_layout::text_width("Name: ", 12.0, FontWeight::Normal);
        let cover = PdfRect::new(100.0 + name_width + 0.5, 695.0, 80.0, 20.0);

        let (scrubbed, removed) = scrub_operations(operations, &[cover], &PageFonts::default());
        assert_eq!(removed, "Secret".len());
        assert_eq!(shown(&scrubbed), "Name: |Public");

        // Later text keeps its position
        let after = text_runs(&scrubbed);
        assert!((after[1].x - before[1].x).abs() < 1e-9);
        assert!((after[1].y - before[1].y).abs() < 1e-9);
    }

    #[test]
    fn test_scrub_keeps_following_glyph_positions() {
        let operations = ops("BT /F1 10 Tf 0 0 Td (abc) Tj (xyz) Tj ET");
        let before = text_runs(&operations);
        let b_box = PdfRect::new(5.7, -1.0, 0.5, 5.0);
        let (scrubbed, removed) = scrub_operations(operations, &[b_box], &PageFonts::default());
        assert_eq!(removed, 1);
        // The gap left behind reads as a word break
        assert_eq!(shown(&scrubbed), "a c|xyz");
        let after = text_runs(&scrubbed);
        assert!((after[1].x - before[1].x).abs() < 1e-4);
    }

    #[test]
    fn test_scrub_rewrites_quote_operators() {
        let operations = ops("BT /F1 10 Tf 12 TL 0 100 Td (top) Tj (gone) ' (kept) ' ET");
        let cover = PdfRect::new(0.0, 86.0, 40.0, 6.0);
        let (scrubbed, removed) = scrub_operations(operations, &[cover], &PageFonts::default());
        assert_eq!(removed, 4);
        let runs = text_runs(&scrubbed);
        assert_eq!(runs.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(), vec!["top", "kept"]);
        assert!((runs[1].y - 76.0).abs() < 1e-9);
    }

    #[test]
    fn test_scrub_without_overlap_is_identity() {
        let operations = ops("BT /F1 12 Tf 100 700 Td (Hello) Tj ET");
        let (scrubbed, removed) =
            scrub_operations(
                operations.clone(),
                &[PdfRect::new(0.0, 0.0, 10.0, 10.0)],
                &PageFonts::default(),
            );
        assert_eq!(removed, 0);
        assert_eq!(scrubbed.len(), operations.len());
    }

    #[test]
    fn test_font_widths_by_base_font() {
        let doc = Document::with_version("1.7");
        let font = |base: &str| lopdf::dictionary! { "Type" => "Font", "BaseFont" => base };
        assert_eq!(FontWidths::of(&doc, &font("Courier")), FontWidths::Monospace(600.0));
        assert_eq!(FontWidths::of(&doc, &font("ABCDEF+Courier-Bold")), FontWidths::Monospace(600.0));
        assert_eq!(
            FontWidths::of(&doc, &font("Helvetica-Bold")),
            FontWidths::Helvetica(FontWeight::Bold)
        );
        assert_eq!(
            FontWidths::of(&doc, &font("Times-Roman")),
            FontWidths::Helvetica(FontWeight::Normal)
        );
    }

    #[test]
    fn test_font_widths_from_table() {
        let mut doc = Document::with_version("1.7");
        let descriptor = doc.add_object(lopdf::dictionary! { "MissingWidth" => 300 });
        let font = lopdf::dictionary! {
            "BaseFont" => "ABCDEF+CustomSans",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(250), Object::Integer(0)],
            "FontDescriptor" => Object::Reference(descriptor),
        };
        let widths = FontWidths::of(&doc, &font);
        assert_eq!(widths.width(b'A'), 250.0);
        assert_eq!(widths.width(b'B'), 300.0);
        assert_eq!(widths.width(b' '), 300.0);
    }

    #[test]
    fn test_courier_text_is_scrubbed_where_it_is_drawn() {
        let (doc, page_ids) = crate::test_support::build_document_in_font(
            &[vec![("iiiiiiiiiiSECRET", 100.0, 700.0)]],
            "Courier",
        );
        let fonts = PageFonts::load(&doc, page_ids[0]);
        let operations =
            Content::decode(&doc.get_page_content(page_ids[0]).unwrap()).unwrap().operations;

        let runs = text_runs_with_fonts(&operations, &fonts);
        assert!((runs[0].bounds.width - 16.0 * 7.2).abs() < 1e-6);

        // Courier places SECRET at x 172..215.2
        let cover = PdfRect::new(172.5, 695.0, 44.0, 20.0);
        let (scrubbed, removed) = scrub_operations(operations, &[cover], &fonts);
        assert_eq!(removed, "SECRET".len());
        let text = shown(&scrubbed);
        assert!(!text.contains('S') && !text.contains('T'), "left behind: {}", text);
        assert_eq!(text.trim(), "iiiiiiiiii");
    }
}

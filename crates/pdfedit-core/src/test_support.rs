//! Document fixtures for unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

fn text_ops(lines: &[(&str, f64, f64)]) -> Vec<Operation> {
    let mut ops = Vec::new();
    for (text, x, y) in lines {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
        ));
        ops.push(Operation::new("Td", vec![Object::Real(*x as f32), Object::Real(*y as f32)]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Build a document whose pages carry the given `(text, x, y)` lines.
///
/// Returns the document with its page ids in order.
pub fn build_document(pages: &[Vec<(&str, f64, f64)>]) -> (Document, Vec<ObjectId>) {
    build_document_in_font(pages, "Helvetica")
}

/// Like [`build_document`], with every line set in the standard font `base_font`
pub fn build_document_in_font(
    pages: &[Vec<(&str, f64, f64)>],
    base_font: &str,
) -> (Document, Vec<ObjectId>) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
    });

    let mut page_ids = Vec::new();
    for lines in pages {
        let content = Content {
            operations: text_ops(lines),
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap_or_default(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_ids.len() as i64,
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    (doc, page_ids)
}

/// Register `image` as `/Im1` on `page_id`
pub fn attach_image(doc: &mut Document, page_id: ObjectId, image: Stream) -> ObjectId {
    let image_id = doc.add_object(image);
    let page = doc.get_dictionary_mut(page_id).unwrap();
    let resources = page.get_mut(b"Resources").unwrap().as_dict_mut().unwrap();
    resources.set("XObject", dictionary! { "Im1" => Object::Reference(image_id) });
    image_id
}

/// PNG-predict 8-bit `raw` rows, cycling through the five filter types
pub fn png_predict(raw: &[u8], colors: usize, columns: usize) -> Vec<u8> {
    let row_len = colors * columns;
    let mut out = Vec::new();
    let mut previous = vec![0u8; row_len];
    for (index, row) in raw.chunks(row_len).enumerate() {
        let tag = (index % 5) as u8;
        out.push(tag);
        for i in 0..row_len {
            let left = if i >= colors { row[i - colors] } else { 0 };
            let up = previous[i];
            let up_left = if i >= colors { previous[i - colors] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                _ => {
                    let p = left as i16 + up as i16 - up_left as i16;
                    let (pa, pb, pc) = (
                        (p - left as i16).abs(),
                        (p - up as i16).abs(),
                        (p - up_left as i16).abs(),
                    );
                    if pa <= pb && pa <= pc {
                        left
                    } else if pb <= pc {
                        up
                    } else {
                        up_left
                    }
                }
            };
            out.push(row[i].wrapping_sub(predicted));
        }
        previous = row.to_vec();
    }
    out
}

pub fn save(doc: &mut Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A letter-size document with "Page N" drawn near the top of each page
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let labels: Vec<String> = (1..=num_pages).map(|i| format!("Page {}", i)).collect();
    let pages: Vec<Vec<(&str, f64, f64)>> = labels
        .iter()
        .map(|label| vec![(label.as_str(), 100.0, 700.0)])
        .collect();
    let (mut doc, _) = build_document(&pages);
    save(&mut doc)
}

/// One page with two lines of text
pub fn create_text_pdf(lines: &[(&str, f64, f64)]) -> Vec<u8> {
    let (mut doc, _) = build_document(&[lines.to_vec()]);
    save(&mut doc)
}

fn widget_appearance(doc: &mut Document, on_state: &str) -> Object {
    let on = doc.add_object(Stream::new(Dictionary::new(), b"0 g 0 0 10 10 re f".to_vec()));
    let off = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    Object::Dictionary(dictionary! {
        "N" => dictionary! {
            on_state => Object::Reference(on),
            "Off" => Object::Reference(off),
        },
    })
}

/// Two pages with an interactive form:
/// `name` (text, p1), `agree` (checkbox, p1), `color` (radio Red/Blue, p2),
/// `country` (dropdown US/CA, p2) and `person.first` (nested text, p1).
pub fn create_form_pdf() -> Vec<u8> {
    let (mut doc, page_ids) = build_document(&[Vec::new(), Vec::new()]);
    let (p1, p2) = (page_ids[0], page_ids[1]);

    let name_id = doc.add_object(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("name"),
        "V" => Object::string_literal("Grace"),
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![100.into(), 600.into(), 300.into(), 620.into()],
        "P" => Object::Reference(p1),
    });

    let agree_ap = widget_appearance(&mut doc, "Yes");
    let agree_id = doc.add_object(dictionary! {
        "FT" => "Btn",
        "T" => Object::string_literal("agree"),
        "V" => "Off",
        "AS" => "Off",
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![100.into(), 560.into(), 112.into(), 572.into()],
        "AP" => agree_ap,
    });

    let color_id = doc.new_object_id();
    let red_ap = widget_appearance(&mut doc, "Red");
    let red_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Parent" => Object::Reference(color_id),
        "Rect" => vec![100.into(), 500.into(), 112.into(), 512.into()],
        "AS" => "Off",
        "AP" => red_ap,
        "P" => Object::Reference(p2),
    });
    let blue_ap = widget_appearance(&mut doc, "Blue");
    let blue_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Parent" => Object::Reference(color_id),
        "Rect" => vec![140.into(), 500.into(), 152.into(), 512.into()],
        "AS" => "Off",
        "AP" => blue_ap,
        "P" => Object::Reference(p2),
    });
    doc.objects.insert(
        color_id,
        Object::Dictionary(dictionary! {
            "FT" => "Btn",
            "Ff" => 1i64 << 15,
            "T" => Object::string_literal("color"),
            "V" => "Off",
            "Kids" => vec![Object::Reference(red_id), Object::Reference(blue_id)],
        }),
    );

    let country_id = doc.add_object(dictionary! {
        "FT" => "Ch",
        "Ff" => 1i64 << 17,
        "T" => Object::string_literal("country"),
        "Opt" => vec![
            Object::string_literal("US"),
            Object::Array(vec![Object::string_literal("CA"), Object::string_literal("Canada")]),
        ],
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![100.into(), 450.into(), 250.into(), 470.into()],
        "P" => Object::Reference(p2),
    });

    let person_id = doc.new_object_id();
    let first_id = doc.add_object(dictionary! {
        "T" => Object::string_literal("first"),
        "Parent" => Object::Reference(person_id),
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![100.into(), 400.into(), 300.into(), 420.into()],
    });
    doc.objects.insert(
        person_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("person"),
            "FT" => "Tx",
            "Kids" => vec![Object::Reference(first_id)],
        }),
    );

    doc.get_dictionary_mut(p1).unwrap().set(
        "Annots",
        vec![
            Object::Reference(name_id),
            Object::Reference(agree_id),
            Object::Reference(first_id),
        ],
    );
    doc.get_dictionary_mut(p2).unwrap().set(
        "Annots",
        vec![
            Object::Reference(red_id),
            Object::Reference(blue_id),
            Object::Reference(country_id),
        ],
    );

    let acro_form = doc.add_object(dictionary! {
        "Fields" => vec![
            Object::Reference(name_id),
            Object::Reference(agree_id),
            Object::Reference(color_id),
            Object::Reference(country_id),
            Object::Reference(person_id),
        ],
    });
    let catalog_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    doc.get_dictionary_mut(catalog_id)
        .unwrap()
        .set("AcroForm", Object::Reference(acro_form));

    save(&mut doc)
}

/// A 2x2 PNG
pub fn tiny_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 30, 30, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

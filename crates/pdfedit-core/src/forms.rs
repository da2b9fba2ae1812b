//! Interactive form fields: discovery at load time and value filling at export

use crate::annotations::{FormField, FormFieldType, FormValue, FormValues};
use crate::coords::PdfRect;
use crate::error::{EditError, MutationWarning};
use crate::page::{name_of, number, resolve, resolve_dict};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::HashMap;
use tracing::{debug, warn};

const FF_PUSHBUTTON: i64 = 1 << 16;
const FF_RADIO: i64 = 1 << 15;
const MAX_FIELD_DEPTH: usize = 32;

/// Terminal field with its widgets
#[derive(Debug, Clone)]
pub(crate) struct FieldNode {
    pub id: ObjectId,
    pub name: String,
    pub field_type: FormFieldType,
    pub widgets: Vec<ObjectId>,
    pub options: Vec<String>,
    pub value: Option<String>,
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise PDFDocEncoding,
/// read here as Latin-1)
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn text_value(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj) {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn catalog_id(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Root").ok()?.as_reference().ok()
}

fn acro_form(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_dictionary(catalog_id(doc)?).ok()?;
    resolve_dict(doc, catalog.get(b"AcroForm").ok()?)
}

fn kid_refs(doc: &Document, dict: &Dictionary) -> Vec<ObjectId> {
    match dict.get(b"Kids").map(|k| resolve(doc, k)) {
        Ok(Object::Array(kids)) => kids.iter().filter_map(|k| k.as_reference().ok()).collect(),
        _ => Vec::new(),
    }
}

/// On-state name of a checkbox or radio widget: the normal appearance key
/// that is not `Off`
fn on_state(doc: &Document, widget: &Dictionary) -> String {
    widget
        .get(b"AP")
        .ok()
        .and_then(|ap| resolve_dict(doc, ap))
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| resolve_dict(doc, n))
        .and_then(|n| {
            n.iter()
                .map(|(key, _)| key)
                .find(|key| key.as_slice() != b"Off")
                .map(|key| String::from_utf8_lossy(key).into_owned())
        })
        .unwrap_or_else(|| "Yes".to_string())
}

fn choice_options(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let Ok(Object::Array(opts)) = dict.get(b"Opt").map(|o| resolve(doc, o)) else {
        return Vec::new();
    };
    opts.iter()
        .filter_map(|opt| match resolve(doc, opt) {
            // [export display] pairs carry the export value first
            Object::Array(pair) => pair.first().and_then(|v| text_value(doc, v)),
            other => text_value(doc, other),
        })
        .collect()
}

#[derive(Clone, Default)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    flags: i64,
    value: Option<Object>,
    options: Option<Object>,
}

fn classify(inherited: &Inherited) -> Option<FormFieldType> {
    match inherited.field_type.as_deref() {
        Some(b"Tx") => Some(FormFieldType::Text),
        Some(b"Ch") => Some(FormFieldType::Dropdown),
        Some(b"Btn") if inherited.flags & FF_PUSHBUTTON != 0 => None,
        Some(b"Btn") if inherited.flags & FF_RADIO != 0 => Some(FormFieldType::Radio),
        Some(b"Btn") => Some(FormFieldType::Checkbox),
        _ => None,
    }
}

fn walk(
    doc: &Document,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited: &Inherited,
    depth: usize,
    out: &mut Vec<FieldNode>,
) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let partial = dict.get(b"T").ok().and_then(|t| text_value(doc, t));
    let name = match (parent_name, partial) {
        (Some(parent), Some(partial)) => format!("{}.{}", parent, partial),
        (None, Some(partial)) => partial,
        (Some(parent), None) => parent.to_string(),
        (None, None) => return,
    };

    let mut inherited = inherited.clone();
    if let Some(ft) = dict.get(b"FT").ok().and_then(name_of) {
        inherited.field_type = Some(ft.to_vec());
    }
    if let Some(ff) = dict.get(b"Ff").ok().and_then(|f| number(resolve(doc, f))) {
        inherited.flags = ff as i64;
    }
    if let Ok(v) = dict.get(b"V") {
        inherited.value = Some(v.clone());
    }
    if let Ok(opt) = dict.get(b"Opt") {
        inherited.options = Some(opt.clone());
    }

    let kids = kid_refs(doc, dict);
    let child_fields: Vec<ObjectId> = kids
        .iter()
        .copied()
        .filter(|kid| {
            doc.get_dictionary(*kid)
                .map(|k| k.has(b"T"))
                .unwrap_or(false)
        })
        .collect();

    if !child_fields.is_empty() {
        for kid in child_fields {
            walk(doc, kid, Some(&name), &inherited, depth + 1, out);
        }
        return;
    }

    let Some(field_type) = classify(&inherited) else {
        debug!(field = %name, "Skipping non-fillable field");
        return;
    };

    // Without field children, kids are widgets; with no kids the field is
    // its own widget
    let widgets = if kids.is_empty() { vec![id] } else { kids };

    let options = match field_type {
        FormFieldType::Dropdown => {
            let mut holder = Dictionary::new();
            if let Some(opt) = &inherited.options {
                holder.set("Opt", opt.clone());
            }
            choice_options(doc, &holder)
        }
        FormFieldType::Checkbox | FormFieldType::Radio => widgets
            .iter()
            .filter_map(|w| doc.get_dictionary(*w).ok())
            .map(|w| on_state(doc, w))
            .collect(),
        FormFieldType::Text => Vec::new(),
    };

    out.push(FieldNode {
        id,
        name,
        field_type,
        widgets,
        options,
        value: inherited.value.as_ref().and_then(|v| text_value(doc, v)),
    });
}

/// All fillable terminal fields of the document's interactive form
pub(crate) fn collect_fields(doc: &Document) -> Vec<FieldNode> {
    let Some(form) = acro_form(doc) else {
        return Vec::new();
    };
    let roots: Vec<ObjectId> = match form.get(b"Fields").map(|f| resolve(doc, f)) {
        Ok(Object::Array(fields)) => fields.iter().filter_map(|f| f.as_reference().ok()).collect(),
        _ => return Vec::new(),
    };

    let mut out = Vec::new();
    for root in roots {
        walk(doc, root, None, &Inherited::default(), 0, &mut out);
    }
    out
}

fn widget_pages(doc: &Document) -> (HashMap<ObjectId, u32>, HashMap<ObjectId, u32>) {
    let mut page_numbers = HashMap::new();
    let mut annot_pages = HashMap::new();
    for (number, page_id) in doc.get_pages() {
        page_numbers.insert(page_id, number);
        let annots = doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|p| p.get(b"Annots").ok())
            .map(|a| resolve(doc, a));
        if let Some(Object::Array(annots)) = annots {
            for annot in annots.iter().filter_map(|a| a.as_reference().ok()) {
                annot_pages.insert(annot, number);
            }
        }
    }
    (page_numbers, annot_pages)
}

fn widget_rect(doc: &Document, widget: &Dictionary) -> PdfRect {
    let coords: Vec<f64> = match widget.get(b"Rect").map(|r| resolve(doc, r)) {
        Ok(Object::Array(values)) => values.iter().filter_map(|v| number(resolve(doc, v))).collect(),
        _ => Vec::new(),
    };
    if coords.len() != 4 {
        return PdfRect::new(0.0, 0.0, 0.0, 0.0);
    }
    let x = coords[0].min(coords[2]);
    let y = coords[1].min(coords[3]);
    PdfRect::new(x, y, (coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs())
}

/// Read the interactive form fields of a document.
///
/// Radio groups produce one entry per button, sharing `name` and
/// `group_name`, with the button's export value as the only option.
pub fn read_form_fields(bytes: &[u8]) -> Result<Vec<FormField>, EditError> {
    let doc = Document::load_mem(bytes).map_err(EditError::malformed)?;
    let (page_numbers, annot_pages) = widget_pages(&doc);

    let page_of = |widget_id: ObjectId, widget: &Dictionary| -> u32 {
        widget
            .get(b"P")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|p| page_numbers.get(&p).copied())
            .or_else(|| annot_pages.get(&widget_id).copied())
            .unwrap_or(1)
    };

    let mut fields = Vec::new();
    for node in collect_fields(&doc) {
        let widgets: Vec<(ObjectId, &Dictionary)> = node
            .widgets
            .iter()
            .filter_map(|w| doc.get_dictionary(*w).ok().map(|d| (*w, d)))
            .collect();

        match node.field_type {
            FormFieldType::Radio => {
                for (widget_id, widget) in widgets {
                    fields.push(FormField {
                        id: format!("{}-{}", widget_id.0, widget_id.1),
                        field_type: FormFieldType::Radio,
                        name: node.name.clone(),
                        page: page_of(widget_id, widget),
                        rect: widget_rect(&doc, widget),
                        default_value: node.value.clone().filter(|v| v != "Off"),
                        options: Some(vec![on_state(&doc, widget)]),
                        group_name: Some(node.name.clone()),
                    });
                }
            }
            field_type => {
                let (page, rect) = widgets
                    .first()
                    .map(|(id, w)| (page_of(*id, w), widget_rect(&doc, w)))
                    .unwrap_or((1, PdfRect::new(0.0, 0.0, 0.0, 0.0)));
                let options = match field_type {
                    FormFieldType::Dropdown => Some(node.options.clone()),
                    _ => None,
                };
                fields.push(FormField {
                    id: format!("{}-{}", node.id.0, node.id.1),
                    field_type,
                    name: node.name,
                    page,
                    rect,
                    default_value: node.value,
                    options,
                    group_name: None,
                });
            }
        }
    }
    Ok(fields)
}

fn set_need_appearances(doc: &mut Document) -> Result<(), EditError> {
    let Some(catalog_id) = catalog_id(doc) else {
        return Ok(());
    };
    let form_ref = doc
        .get_dictionary(catalog_id)
        .ok()
        .and_then(|c| c.get(b"AcroForm").ok())
        .and_then(|f| f.as_reference().ok());

    let form = match form_ref {
        Some(id) => doc.get_dictionary_mut(id).map_err(EditError::operation)?,
        None => doc
            .get_dictionary_mut(catalog_id)
            .map_err(EditError::operation)?
            .get_mut(b"AcroForm")
            .and_then(Object::as_dict_mut)
            .map_err(EditError::operation)?,
    };
    form.set("NeedAppearances", Object::Boolean(true));
    Ok(())
}

fn set_states(doc: &mut Document, field: &FieldNode, selected: Option<&str>) -> Result<(), EditError> {
    let value = selected.unwrap_or("Off");
    doc.get_dictionary_mut(field.id)
        .map_err(EditError::operation)?
        .set("V", Object::Name(value.as_bytes().to_vec()));

    for (widget, state) in field.widgets.iter().zip(&field.options) {
        let appearance = if Some(state.as_str()) == selected {
            state.as_str()
        } else {
            "Off"
        };
        doc.get_dictionary_mut(*widget)
            .map_err(EditError::operation)?
            .set("AS", Object::Name(appearance.as_bytes().to_vec()));
    }
    Ok(())
}

/// Fill form values into the document.
///
/// Names the document does not have, values of the wrong shape, and
/// choices outside a field's options are reported as warnings and leave the
/// field untouched.
pub(crate) fn apply_form_values(
    doc: &mut Document,
    values: &FormValues,
) -> Result<Vec<MutationWarning>, EditError> {
    let mut warnings = Vec::new();
    if values.is_empty() {
        return Ok(warnings);
    }

    let fields: HashMap<String, FieldNode> = collect_fields(doc)
        .into_iter()
        .map(|f| (f.name.clone(), f))
        .collect();

    let mut changed = false;
    for (name, value) in values {
        let Some(field) = fields.get(name) else {
            warn!(field = %name, "Form value for unknown field ignored");
            warnings.push(MutationWarning::MissingField { name: name.clone() });
            continue;
        };

        match (field.field_type, value) {
            (FormFieldType::Text, FormValue::Text(text)) => {
                doc.get_dictionary_mut(field.id)
                    .map_err(EditError::operation)?
                    .set("V", encode_text_string(text));
            }
            (FormFieldType::Dropdown, FormValue::Text(choice)) => {
                if !field.options.is_empty() && !field.options.contains(choice) {
                    warnings.push(MutationWarning::UnknownOption {
                        name: name.clone(),
                        value: choice.clone(),
                    });
                    continue;
                }
                doc.get_dictionary_mut(field.id)
                    .map_err(EditError::operation)?
                    .set("V", encode_text_string(choice));
            }
            (FormFieldType::Checkbox, FormValue::Bool(checked)) => {
                let on = field.options.first().map(String::as_str).unwrap_or("Yes");
                set_states(doc, field, checked.then_some(on))?;
            }
            (FormFieldType::Radio, FormValue::Text(choice)) => {
                if !field.options.contains(choice) {
                    warnings.push(MutationWarning::UnknownOption {
                        name: name.clone(),
                        value: choice.clone(),
                    });
                    continue;
                }
                set_states(doc, field, Some(choice))?;
            }
            (field_type, _) => {
                warnings.push(MutationWarning::FieldTypeMismatch {
                    name: name.clone(),
                    expected: field_type.as_str(),
                });
                continue;
            }
        }
        changed = true;
    }

    if changed {
        set_need_appearances(doc)?;
    }
    Ok(warnings)
}

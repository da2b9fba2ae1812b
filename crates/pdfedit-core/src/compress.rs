//! Size reduction by re-encoding embedded images

use crate::assemble::load_source;
use crate::error::EditError;
use crate::page::{name_of, resolve, save_document};
use crate::xobject::{decode_image, jpeg_stream};
use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// How hard to compress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "preset", content = "quality")]
pub enum CompressionLevel {
    Light,
    Balanced,
    Strong,
    /// JPEG quality factor in `(0, 1]`
    Custom(f32),
}

/// What a compression level does
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionSettings {
    pub quality: f32,
    pub strip_metadata: bool,
    pub grayscale: bool,
}

impl CompressionLevel {
    pub fn settings(self) -> CompressionSettings {
        let (quality, strip_metadata, grayscale) = match self {
            CompressionLevel::Light => (0.85, false, false),
            CompressionLevel::Balanced => (0.65, true, false),
            CompressionLevel::Strong => (0.40, true, true),
            CompressionLevel::Custom(q) => (q, false, false),
        };
        CompressionSettings {
            quality,
            strip_metadata,
            grayscale,
        }
    }

    fn jpeg_quality(self) -> Result<u8, EditError> {
        let quality = self.settings().quality;
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(EditError::OperationError(format!(
                "Quality factor {} is outside (0, 1]",
                quality
            )));
        }
        Ok(((quality * 100.0).round() as u8).max(1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionStats {
    pub images: usize,
    pub reencoded: usize,
    pub input_bytes: usize,
    pub output_bytes: usize,
}

fn is_image(dict: &lopdf::Dictionary) -> bool {
    dict.get(b"Subtype").ok().and_then(name_of) == Some(b"Image".as_slice())
}

fn is_gray(doc: &Document, dict: &lopdf::Dictionary) -> bool {
    dict.get(b"ColorSpace")
        .ok()
        .map(|cs| resolve(doc, cs))
        .and_then(name_of)
        == Some(b"DeviceGray".as_slice())
}

/// Soft masks and anything carrying one are kept as-is
fn masked_images(doc: &Document) -> HashSet<ObjectId> {
    let mut skip = HashSet::new();
    for (id, object) in &doc.objects {
        let Object::Stream(stream) = object else {
            continue;
        };
        if !is_image(&stream.dict) {
            continue;
        }
        if let Ok(Object::Reference(mask)) = stream.dict.get(b"SMask") {
            skip.insert(*id);
            skip.insert(*mask);
        }
        if let Ok(Object::Reference(mask)) = stream.dict.get(b"Mask") {
            skip.insert(*id);
            skip.insert(*mask);
        }
        let image_mask = matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
        if image_mask {
            skip.insert(*id);
        }
    }
    skip
}

fn strip_metadata(doc: &mut Document) {
    doc.trailer.remove(b"Info");
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .ok();
    if let Some(catalog) = catalog_id.and_then(|id| doc.get_dictionary_mut(id).ok()) {
        catalog.remove(b"Metadata");
    }
}

/// Re-encode images and recompress streams
///
/// Images are only replaced when the re-encoded stream is smaller.
pub fn compress_document(bytes: &[u8], level: CompressionLevel) -> Result<Vec<u8>, EditError> {
    compress_document_with_stats(bytes, level).map(|(out, _)| out)
}

pub fn compress_document_with_stats(
    bytes: &[u8],
    level: CompressionLevel,
) -> Result<(Vec<u8>, CompressionStats), EditError> {
    let quality = level.jpeg_quality()?;
    let settings = level.settings();
    let mut doc = load_source(bytes)?;
    info!(?level, quality, "Compressing document");

    let skip = masked_images(&doc);
    let candidates: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if is_image(&stream.dict) => Some(*id),
            _ => None,
        })
        .collect();

    let mut stats = CompressionStats {
        images: candidates.len(),
        input_bytes: bytes.len(),
        ..Default::default()
    };

    for id in candidates {
        if skip.contains(&id) {
            continue;
        }
        let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
            continue;
        };
        let Some(image) = decode_image(&doc, stream) else {
            debug!(?id, "Image encoding not supported; leaving as-is");
            continue;
        };
        let grayscale = settings.grayscale || is_gray(&doc, &stream.dict);
        let original_len = stream.content.len();
        let mut replacement = jpeg_stream(&image, quality, grayscale)?;
        if replacement.content.len() >= original_len {
            continue;
        }

        for key in [b"Interpolate".as_slice(), b"Intent"] {
            if let Ok(value) = stream.dict.get(key) {
                replacement.dict.set(key.to_vec(), value.clone());
            }
        }
        debug!(?id, from = original_len, to = replacement.content.len(), "Re-encoded image");
        doc.objects.insert(id, Object::Stream(replacement));
        stats.reencoded += 1;
    }

    if settings.strip_metadata {
        strip_metadata(&mut doc);
        doc.prune_objects();
    }
    doc.compress();
    let out = save_document(&mut doc)?;
    stats.output_bytes = out.len();
    info!(
        images = stats.images,
        reencoded = stats.reencoded,
        from = stats.input_bytes,
        to = stats.output_bytes,
        "Compression finished"
    );
    Ok((out, stats))
}

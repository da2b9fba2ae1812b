//! Image XObject encoding and decoding

use crate::error::EditError;
use crate::page::{name_of, number, resolve};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageFormat, RgbImage};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::{Read, Write};

pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>, EditError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| EditError::OperationError(format!("Failed to compress image data: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| EditError::OperationError(format!("Failed to finish compression: {}", e)))
}

fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut decoded).ok()?;
    Some(decoded)
}

fn image_stream(width: u32, height: u32, color_space: &str, filter: &str, data: Vec<u8>) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => filter,
    };
    // Already encoded; keep lopdf from compressing it again
    Stream::new(dict, data).with_compression(false)
}

/// Flate-compressed DeviceRGB image
pub(crate) fn rgb_stream(img: &RgbImage) -> Result<Stream, EditError> {
    let (width, height) = img.dimensions();
    Ok(image_stream(width, height, "DeviceRGB", "FlateDecode", deflate(img.as_raw())?))
}

/// Add `img` to the document, with a soft mask when it has transparency
pub(crate) fn embed_image(doc: &mut Document, img: &DynamicImage) -> Result<ObjectId, EditError> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(EditError::OperationError("image has no pixels".into()));
    }

    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| EditError::OperationError("image is too large to embed".into()))?;
    let mut rgb = Vec::with_capacity(pixels.saturating_mul(3));
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut stream = image_stream(width, height, "DeviceRGB", "FlateDecode", deflate(&rgb)?);
    if alpha.iter().any(|&a| a < 255) {
        let mask = image_stream(width, height, "DeviceGray", "FlateDecode", deflate(&alpha)?);
        let mask_id = doc.add_object(mask);
        stream.dict.set("SMask", Object::Reference(mask_id));
    }
    Ok(doc.add_object(stream))
}

/// JPEG-encoded image stream at `quality` (1-100)
pub(crate) fn jpeg_stream(img: &DynamicImage, quality: u8, grayscale: bool) -> Result<Stream, EditError> {
    let mut jpeg = Vec::new();
    let quality = quality.clamp(1, 100);
    let (width, height, color_space) = if grayscale {
        let gray: GrayImage = img.to_luma8();
        let (w, h) = gray.dimensions();
        JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode(gray.as_raw(), w, h, ExtendedColorType::L8)
            .map_err(|e| EditError::OperationError(format!("Failed to encode JPEG: {}", e)))?;
        (w, h, "DeviceGray")
    } else {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
            .map_err(|e| EditError::OperationError(format!("Failed to encode JPEG: {}", e)))?;
        (w, h, "DeviceRGB")
    };
    Ok(image_stream(width, height, color_space, "DCTDecode", jpeg))
}

fn single_filter(stream: &Stream) -> Option<Vec<u8>> {
    match stream.dict.get(b"Filter").ok()? {
        Object::Name(n) => Some(n.clone()),
        Object::Array(items) if items.len() == 1 => name_of(&items[0]).map(|n| n.to_vec()),
        _ => None,
    }
}

fn dimension(dict: &lopdf::Dictionary, key: &[u8]) -> Option<u32> {
    let value = dict.get(key).ok().and_then(number)?;
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let (a, b, c) = (i16::from(left), i16::from(up), i16::from(up_left));
    let p = a + b - c;
    let (pa, pb, pc) = ((p - a).abs(), (p - b).abs(), (p - c).abs());
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Undo PNG row prediction (`/Predictor` 10-15) for 8-bit samples
fn unpredict_png(data: &[u8], colors: usize, columns: usize, rows: usize) -> Option<Vec<u8>> {
    let row_len = colors.checked_mul(columns)?;
    let stride = row_len.checked_add(1)?;
    if data.len() < stride.checked_mul(rows)? {
        return None;
    }
    let mut out = Vec::with_capacity(row_len * rows);
    let mut previous = vec![0u8; row_len];
    for row in data.chunks_exact(stride).take(rows) {
        let (tag, encoded) = (row[0], &row[1..]);
        let mut current = vec![0u8; row_len];
        for i in 0..row_len {
            let left = if i >= colors { current[i - colors] } else { 0 };
            let up = previous[i];
            let up_left = if i >= colors { previous[i - colors] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => return None,
            };
            current[i] = encoded[i].wrapping_add(predicted);
        }
        out.extend_from_slice(&current);
        previous = current;
    }
    Some(out)
}

/// Apply `/DecodeParms` to inflated data. Only PNG predictors with
/// parameters matching the image are understood.
fn apply_decode_parms(
    doc: &Document,
    stream: &Stream,
    data: Vec<u8>,
    components: usize,
    width: u32,
    height: u32,
) -> Option<Vec<u8>> {
    let parms = match stream.dict.get(b"DecodeParms").ok().map(|p| resolve(doc, p)) {
        None | Some(Object::Null) => return Some(data),
        Some(Object::Dictionary(parms)) => parms,
        Some(Object::Array(items)) if items.len() == 1 => match resolve(doc, &items[0]) {
            Object::Dictionary(parms) => parms,
            Object::Null => return Some(data),
            _ => return None,
        },
        Some(_) => return None,
    };
    let param = |key: &[u8], default: f64| parms.get(key).ok().and_then(number).unwrap_or(default);
    let predictor = param(b"Predictor", 1.0);
    if predictor == 1.0 {
        return Some(data);
    }
    let matches_image = param(b"Colors", 1.0) == components as f64
        && param(b"BitsPerComponent", 8.0) == 8.0
        && param(b"Columns", 1.0) == f64::from(width);
    if !(10.0..=15.0).contains(&predictor) || !matches_image {
        return None;
    }
    unpredict_png(&data, components, width as usize, height as usize)
}

/// Decode an image XObject this crate knows how to re-encode: baseline JPEG,
/// or 8-bit Flate/unfiltered DeviceRGB and DeviceGray.
///
/// Anything else returns `None` and is left untouched: `/Decode` arrays,
/// indexed, ICC and CMYK color, unknown predictors and short data.
pub(crate) fn decode_image(doc: &Document, stream: &Stream) -> Option<DynamicImage> {
    let dict = &stream.dict;
    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let bits = dict.get(b"BitsPerComponent").ok().and_then(number).unwrap_or(8.0);
    if bits != 8.0 || dict.has(b"Decode") {
        return None;
    }
    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .map(|cs| resolve(doc, cs))
        .and_then(name_of)?
        .to_vec();
    let components: usize = match color_space.as_slice() {
        b"DeviceRGB" => 3,
        b"DeviceGray" => 1,
        _ => return None,
    };

    let filter = single_filter(stream);
    if dict.has(b"Filter") && filter.is_none() {
        return None;
    }
    let data = match filter.as_deref() {
        Some(b"DCTDecode") => {
            let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok()?;
            return (img.width() == width && img.height() == height).then_some(img);
        }
        Some(b"FlateDecode") => {
            let inflated = inflate(&stream.content)?;
            apply_decode_parms(doc, stream, inflated, components, width, height)?
        }
        None => stream.content.clone(),
        Some(_) => return None,
    };

    let needed = u64::from(width)
        .checked_mul(u64::from(height))?
        .checked_mul(components as u64)?;
    let needed = usize::try_from(needed).ok()?;
    if data.len() < needed {
        return None;
    }
    let pixels = data[..needed].to_vec();
    match components {
        3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        _ => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
    }
}

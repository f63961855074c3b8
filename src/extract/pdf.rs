//! PDF extraction: page text plus OCR over embedded raster images.
use crate::config::ScanRequest;
use crate::keywords::KeywordSet;
use log::error;
use lopdf::{Document, Object, Stream};
use std::collections::BTreeSet;
use std::path::Path;

use super::image as image_ocr;

pub(crate) fn scan(path: &Path, request: &ScanRequest, keywords: &KeywordSet) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    match pdf_extract::extract_text(path) {
        Ok(text) => found.extend(keywords.contains_any(&text)),
        Err(err) => error!("failed to extract text from {}: {err}", path.display()),
    }
    // Embedded images are only worth decoding when OCR can read them.
    if request.capabilities.ocr {
        found.extend(ocr_embedded_images(path, request, keywords));
    }
    found
}

fn ocr_embedded_images(
    path: &Path,
    request: &ScanRequest,
    keywords: &KeywordSet,
) -> BTreeSet<String> {
    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(err) => {
            error!("failed to open {} for image extraction: {err}", path.display());
            return BTreeSet::new();
        }
    };
    let mut found = BTreeSet::new();
    for object in doc.objects.values() {
        let Object::Stream(stream) = object else {
            continue;
        };
        if !is_image_stream(stream) {
            continue;
        }
        if let Some(bytes) = image_payload(stream) {
            if let Some(text) = image_ocr::ocr_bytes(&bytes, request) {
                found.extend(keywords.contains_any(&text));
            }
        }
    }
    found
}

fn is_image_stream(stream: &Stream) -> bool {
    stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map(|name| name == b"Image")
        .unwrap_or(false)
}

/// DCT/JPX streams carry a complete JPEG payload as-is; for anything else the
/// best bet is the decompressed content, which the image decoder may or may
/// not understand.
fn image_payload(stream: &Stream) -> Option<Vec<u8>> {
    let filter = match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(name.clone()),
        Ok(Object::Array(filters)) => filters
            .last()
            .and_then(|f| f.as_name().ok())
            .map(|name| name.to_vec()),
        _ => None,
    };
    match filter.as_deref() {
        Some(b"DCTDecode") | Some(b"JPXDecode") => Some(stream.content.clone()),
        _ => stream.decompressed_content().ok(),
    }
}

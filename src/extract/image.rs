//! Image extraction via tesseract OCR.
//!
//! The caller is responsible for checking the OCR capability before invoking
//! this extractor; these functions assume the tesseract binary is present.
use crate::config::ScanRequest;
use crate::keywords::KeywordSet;
use image::{ColorType, DynamicImage};
use log::{debug, error};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Stdio};

pub(crate) fn scan(path: &Path, request: &ScanRequest, keywords: &KeywordSet) -> BTreeSet<String> {
    match ocr_file(path, request) {
        Some(text) => keywords.contains_any(&text),
        None => BTreeSet::new(),
    }
}

pub(crate) fn ocr_file(path: &Path, request: &ScanRequest) -> Option<String> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(err) => {
            error!("failed to decode image {}: {err}", path.display());
            return None;
        }
    };
    recognize(&img, request)
}

/// OCR an in-memory image (embedded in a PDF or DOCX). Undecodable payloads
/// are common (raw pixel streams, exotic formats) and only worth a debug line.
pub(crate) fn ocr_bytes(bytes: &[u8], request: &ScanRequest) -> Option<String> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(err) => {
            debug!("skipping undecodable embedded image: {err}");
            return None;
        }
    };
    recognize(&img, request)
}

fn recognize(img: &DynamicImage, request: &ScanRequest) -> Option<String> {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => {
            error!("failed to create OCR scratch directory: {err}");
            return None;
        }
    };
    let input = dir.path().join("ocr-input.png");
    // Tesseract copes poorly with exotic color modes; normalize to RGB.
    let saved = match img.color() {
        ColorType::Rgb8 | ColorType::L8 => img.save(&input),
        _ => img.to_rgb8().save(&input),
    };
    if let Err(err) = saved {
        error!("failed to write OCR input image: {err}");
        return None;
    }
    let output = Command::new("tesseract")
        .arg(&input)
        .arg("stdout")
        .args(["-l", &request.ocr_languages])
        .args(&request.ocr_args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();
    match output {
        Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
        Ok(out) => {
            error!("tesseract exited with {}", out.status);
            None
        }
        Err(err) => {
            error!("failed to run tesseract: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::config::Config;

    #[test]
    fn undecodable_image_yields_no_matches() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image at all").unwrap();
        let request = Config::default().to_request(Capabilities::all()).unwrap();
        let keywords = KeywordSet::from_terms(["x"]).unwrap();
        assert!(scan(&path, &request, &keywords).is_empty());
    }

    #[test]
    fn undecodable_embedded_bytes_are_skipped() {
        let request = Config::default().to_request(Capabilities::all()).unwrap();
        assert!(ocr_bytes(b"\x00\x01garbage", &request).is_none());
    }
}

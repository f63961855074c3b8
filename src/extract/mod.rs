//! Format-specific extraction.
//!
//! Every extractor obeys the same contract: take one file (or archive entry),
//! return the keywords found in it, and never let an internal failure escape.
//! Malformed input is logged with the offending path and yields zero matches.
pub mod archive;
pub mod docx;
pub mod image;
pub mod pdf;
pub mod spreadsheet;
pub mod text;

use crate::capability::Capabilities;
use crate::config::ScanRequest;
use crate::keywords::KeywordSet;
use std::collections::BTreeSet;
use std::path::Path;

/// Containers nested deeper than this are skipped; guards against archive
/// bombs.
pub const MAX_ARCHIVE_DEPTH: usize = 8;

/// One matched source: a file path, or a virtual `archive!entry` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub path: String,
    pub keywords: BTreeSet<String>,
}

/// Which extractor handles a file, keyed by its lower-cased extension.
/// Anything unrecognized is treated as plain text, so unknown formats still
/// get a best-effort scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Text,
    Image,
    Pdf,
    Docx,
    Spreadsheet,
    Zip,
    SevenZ,
    Rar,
}

impl ExtractorKind {
    pub fn for_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tif" | "tiff" => Self::Image,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "xls" | "xlsx" | "xlsm" | "ods" => Self::Spreadsheet,
            "zip" => Self::Zip,
            "7z" => Self::SevenZ,
            "rar" => Self::Rar,
            _ => Self::Text,
        }
    }

    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::for_extension(ext),
            None => Self::Text,
        }
    }

    /// The capability this extractor needs but the current run lacks, if any.
    pub fn missing_capability(&self, caps: &Capabilities) -> Option<&'static str> {
        match self {
            Self::Pdf if !caps.pdf => Some("PDF"),
            Self::Docx if !caps.docx => Some("DOCX"),
            Self::Spreadsheet if !caps.spreadsheet => Some("spreadsheet"),
            Self::Image if !caps.ocr => Some("OCR"),
            Self::SevenZ if !caps.sevenz => Some("7z"),
            Self::Rar if !caps.rar => Some("RAR"),
            _ => None,
        }
    }
}

/// Run the extractor for `kind` over `path`, reporting matches under the
/// `display` name. `depth` counts container nesting.
pub fn extract(
    kind: ExtractorKind,
    path: &Path,
    display: &str,
    request: &ScanRequest,
    keywords: &KeywordSet,
    depth: usize,
) -> Vec<Found> {
    match kind {
        ExtractorKind::Text => single(display, text::scan(path, keywords)),
        ExtractorKind::Image => single(display, image::scan(path, request, keywords)),
        ExtractorKind::Pdf => single(display, pdf::scan(path, request, keywords)),
        ExtractorKind::Docx => single(display, docx::scan(path, request, keywords)),
        ExtractorKind::Spreadsheet => single(display, spreadsheet::scan(path, keywords)),
        ExtractorKind::Zip => archive::scan_zip(path, display, request, keywords, depth),
        ExtractorKind::SevenZ => {
            archive::scan_cli(archive::CliBackend::SevenZ, path, display, request, keywords, depth)
        }
        ExtractorKind::Rar => {
            archive::scan_cli(archive::CliBackend::Rar, path, display, request, keywords, depth)
        }
    }
}

fn single(display: &str, keywords: BTreeSet<String>) -> Vec<Found> {
    if keywords.is_empty() {
        Vec::new()
    } else {
        vec![Found {
            path: display.to_string(),
            keywords,
        }]
    }
}

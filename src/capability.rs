//! Optional-backend availability, probed once at startup.
use log::warn;
use std::process::{Command, Stdio};

/// Which format backends this run can use. Computed once and threaded through
/// the scan request; extractors never probe on their own.
///
/// Plain text and zip need no capability and are always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub pdf: bool,
    pub docx: bool,
    pub spreadsheet: bool,
    pub ocr: bool,
    pub sevenz: bool,
    pub rar: bool,
}

impl Capabilities {
    /// Probe the environment. PDF, DOCX and spreadsheet support are compiled
    /// in; OCR and the 7z/RAR backends depend on external binaries.
    pub fn detect(search_images: bool) -> Self {
        let tesseract = probe("tesseract", &["--version"]);
        let sevenz = probe("7z", &[]);
        let rar = probe("unrar", &[]);
        if !tesseract {
            warn!("tesseract binary not found; image OCR disabled");
        } else if !search_images {
            warn!("image search disabled in configuration; OCR will not run");
        }
        if !sevenz {
            warn!("7z binary not found; 7z archive support disabled");
        }
        if !rar {
            warn!("unrar binary not found; RAR archive support disabled");
        }
        Self {
            pdf: true,
            docx: true,
            spreadsheet: true,
            ocr: search_images && tesseract,
            sevenz,
            rar,
        }
    }

    /// Everything enabled; useful in tests.
    pub fn all() -> Self {
        Self {
            pdf: true,
            docx: true,
            spreadsheet: true,
            ocr: true,
            sevenz: true,
            rar: true,
        }
    }
}

fn probe(binary: &str, args: &[&str]) -> bool {
    Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

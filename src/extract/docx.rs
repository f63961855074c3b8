//! DOCX extraction: body text from `word/document.xml` plus OCR over the
//! images bundled under `word/media/`.
use crate::config::ScanRequest;
use crate::keywords::KeywordSet;
use log::error;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::image as image_ocr;

pub(crate) fn scan(path: &Path, request: &ScanRequest, keywords: &KeywordSet) -> BTreeSet<String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            error!("failed to open {}: {err}", path.display());
            return BTreeSet::new();
        }
    };
    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(err) => {
            error!("{} is not a readable DOCX container: {err}", path.display());
            return BTreeSet::new();
        }
    };

    let mut found = BTreeSet::new();
    match read_entry(&mut archive, "word/document.xml") {
        Ok(xml) => {
            let body = body_text(&String::from_utf8_lossy(&xml));
            found.extend(keywords.contains_any(&body));
        }
        Err(err) => error!("failed to read body of {}: {err}", path.display()),
    }

    if request.capabilities.ocr {
        let media: Vec<String> = archive
            .file_names()
            .filter(|name| name.starts_with("word/media/"))
            .map(String::from)
            .collect();
        for name in media {
            match read_entry(&mut archive, &name) {
                Ok(bytes) => {
                    if let Some(text) = image_ocr::ocr_bytes(&bytes, request) {
                        found.extend(keywords.contains_any(&text));
                    }
                }
                Err(err) => error!("failed to read {name} in {}: {err}", path.display()),
            }
        }
    }
    found
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> zip::result::ZipResult<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Pull the visible text out of WordprocessingML: the contents of `<w:t>`
/// runs, with a newline per paragraph.
pub(crate) fn body_text(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    let mut body = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text_run = false,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => body.push('\n'),
            Ok(Event::Text(t)) if in_text_run => {
                body.push_str(&t.unescape().unwrap_or_else(|_| "".into()));
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                error!("malformed document XML: {err}");
                break;
            }
            _ => {}
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_text_joins_runs_and_paragraphs() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>Invoice </w:t></w:r><w:r><w:t>attached</w:t></w:r></w:p>
            <w:p><w:r><w:t>second paragraph</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let body = body_text(xml);
        assert!(body.contains("Invoice attached"));
        assert!(body.contains("second paragraph"));
        assert!(body.contains('\n'));
    }

    #[test]
    fn body_text_ignores_non_run_text() {
        let xml = r#"<w:document><w:p><w:pPr>style noise</w:pPr><w:r><w:t>real</w:t></w:r></w:p></w:document>"#;
        assert_eq!(body_text(xml).trim(), "real");
    }

    #[test]
    fn body_text_unescapes_entities() {
        let xml = r#"<d><w:p><w:t>Q1 &amp; Q2</w:t></w:p></d>"#;
        assert!(body_text(xml).contains("Q1 & Q2"));
    }
}

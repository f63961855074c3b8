//! Plain-text extraction with legacy-encoding fallback.
use crate::keywords::KeywordSet;
use log::error;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub(crate) fn scan(path: &Path, keywords: &KeywordSet) -> BTreeSet<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("failed to read {}: {err}", path.display());
            return BTreeSet::new();
        }
    };
    keywords.contains_any(&decode(&bytes))
}

/// UTF-8 when valid; otherwise windows-1251 if it decodes cleanly; otherwise
/// lossy UTF-8 with replacement characters.
pub(crate) fn decode(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }
    let (text, had_errors) = encoding_rs::WINDOWS_1251.decode_without_bom_handling(bytes);
    if !had_errors {
        return Cow::Owned(text.into_owned());
    }
    Cow::Owned(String::from_utf8_lossy(bytes).into_owned())
}

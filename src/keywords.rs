//! Keyword loading and matching.
use crate::error::{Result, ScanError};
use aho_corasick::AhoCorasick;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Immutable set of lower-cased search terms, loaded once per run.
///
/// Matching is substring containment against a lower-cased haystack. The
/// automaton is built once at load time; `contains_any` is read-only and safe
/// to share across workers.
pub struct KeywordSet {
    terms: Vec<String>,
    automaton: AhoCorasick,
}

impl KeywordSet {
    /// Build a set from raw terms. Terms are trimmed and lower-cased; blank
    /// entries are dropped and duplicates collapse. An empty result is an
    /// error: a scan must not start without keywords.
    pub fn from_terms<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let mut normalized = Vec::new();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if term.is_empty() || !seen.insert(term.clone()) {
                continue;
            }
            normalized.push(term);
        }
        if normalized.is_empty() {
            return Err(ScanError::NoKeywords);
        }
        let automaton = AhoCorasick::new(&normalized)
            .map_err(|e| ScanError::Config(format!("failed to build keyword automaton: {e}")))?;
        Ok(Self {
            terms: normalized,
            automaton,
        })
    }

    /// Load keywords from a file, one term per line.
    ///
    /// Decoding attempts UTF-8 first, then windows-1251, then ISO-8859-1.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let text =
            decode_keyword_bytes(&bytes).ok_or_else(|| ScanError::KeywordsUndecodable(path.to_path_buf()))?;
        Self::from_terms(text.lines())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Every keyword that occurs as a substring of `text`, case-insensitively.
    /// Empty input yields the empty set.
    pub fn contains_any(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        if text.is_empty() {
            return found;
        }
        let haystack = text.to_lowercase();
        for m in self.automaton.find_overlapping_iter(&haystack) {
            found.insert(self.terms[m.pattern().as_usize()].clone());
            if found.len() == self.terms.len() {
                break;
            }
        }
        found
    }
}

fn decode_keyword_bytes(bytes: &[u8]) -> Option<String> {
    // NUL never appears in any supported text encoding.
    if bytes.contains(&0) {
        return None;
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.trim_start_matches('\u{feff}').to_string());
    }
    let (text, had_errors) = encoding_rs::WINDOWS_1251.decode_without_bom_handling(bytes);
    if !had_errors {
        return Some(text.into_owned());
    }
    // ISO-8859-1 maps every remaining byte value.
    Some(bytes.iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn matches_are_subset_and_substring_iff() {
        let set = KeywordSet::from_terms(["Invoice", "urgent", "quarterly"]).unwrap();
        let found = set.contains_any("This INVOICE needs urgent review");
        assert_eq!(
            found,
            BTreeSet::from(["invoice".to_string(), "urgent".to_string()])
        );
        // Not found iff not a substring.
        assert!(!found.contains("quarterly"));
    }

    #[test]
    fn empty_text_yields_empty_set() {
        let set = KeywordSet::from_terms(["invoice"]).unwrap();
        assert!(set.contains_any("").is_empty());
    }

    #[test]
    fn overlapping_keywords_both_match() {
        let set = KeywordSet::from_terms(["invoice", "voice"]).unwrap();
        let found = set.contains_any("the invoice arrived");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn terms_are_deduplicated_and_blank_lines_ignored() {
        let set = KeywordSet::from_terms(["Foo", "foo", "", "  ", "bar"]).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_source_is_an_error() {
        assert!(matches!(
            KeywordSet::from_terms(Vec::<String>::new()),
            Err(ScanError::NoKeywords)
        ));
        assert!(matches!(
            KeywordSet::from_terms(["", "  "]),
            Err(ScanError::NoKeywords)
        ));
    }

    #[test]
    fn loads_cp1251_keyword_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        // "срочно" in windows-1251
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0xF1, 0xF0, 0xEE, 0xF7, 0xED, 0xEE, b'\n'])
            .unwrap();
        let set = KeywordSet::load(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert!(!set.contains_any("это срочно!").is_empty());
    }

    #[test]
    fn binary_keyword_file_is_undecodable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.bin");
        std::fs::write(&path, [0x00, 0x01, 0xFF, 0x00]).unwrap();
        assert!(matches!(
            KeywordSet::load(&path),
            Err(ScanError::KeywordsUndecodable(_))
        ));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let set = KeywordSet::from_terms(["x"]).unwrap();
        assert_eq!(set.len(), 1);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keywords.txt");
        std::fs::write(&path, b"\xEF\xBB\xBFinvoice\n").unwrap();
        let set = KeywordSet::load(&path).unwrap();
        assert!(!set.contains_any("invoice").is_empty());
    }
}

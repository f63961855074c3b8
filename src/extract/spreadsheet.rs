//! Spreadsheet extraction: every string cell of every sheet, matched
//! independently so a huge workbook never needs concatenating.
use crate::keywords::KeywordSet;
use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, error};
use std::collections::BTreeSet;
use std::path::Path;

pub(crate) fn scan(path: &Path, keywords: &KeywordSet) -> BTreeSet<String> {
    // "~$" files are Office lock artifacts left by open documents.
    if path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"))
    {
        debug!("skipping Office lock file {}", path.display());
        return BTreeSet::new();
    }
    let mut workbook = match open_workbook_auto(path) {
        Ok(workbook) => workbook,
        Err(err) => {
            error!("failed to open workbook {}: {err}", path.display());
            return BTreeSet::new();
        }
    };
    let mut found = BTreeSet::new();
    for sheet in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&sheet) {
            Ok(range) => range,
            Err(err) => {
                error!("failed to read sheet '{sheet}' of {}: {err}", path.display());
                continue;
            }
        };
        for row in range.rows() {
            for cell in row {
                if let Data::String(value) = cell {
                    if !value.is_empty() {
                        found.extend(keywords.contains_any(value));
                    }
                }
            }
        }
    }
    found
}

//! Per-file admission policy.
use crate::config::ScanRequest;
use crate::extract::ExtractorKind;
use log::{info, warn};
use std::path::Path;

/// Outcome of the admission check. Everything except `Admit` is a filtering
/// condition, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit(ExtractorKind),
    TooLarge,
    NoPatternMatch,
    CapabilityMissing(&'static str),
}

pub fn admit(path: &Path, size: u64, request: &ScanRequest) -> Admission {
    if size > request.max_file_size {
        warn!(
            "skipping {} ({:.2} MB exceeds the {:.2} MB limit)",
            path.display(),
            size as f64 / (1024.0 * 1024.0),
            request.max_file_size as f64 / (1024.0 * 1024.0)
        );
        return Admission::TooLarge;
    }
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return Admission::NoPatternMatch,
    };
    if !request.matches_name(&name) {
        return Admission::NoPatternMatch;
    }
    let kind = ExtractorKind::for_path(path);
    if let Some(capability) = kind.missing_capability(&request.capabilities) {
        info!(
            "skipping {} ({capability} support unavailable)",
            path.display()
        );
        return Admission::CapabilityMissing(capability);
    }
    Admission::Admit(kind)
}

//! Archive extraction.
//!
//! Zip is read entry-by-entry with the zip crate. 7z and RAR are handled by
//! their command-line tools: the archive is unpacked into a scoped temporary
//! directory and the tree is walked, which is also how availability is probed
//! (the binary either exists or the capability is off).
//!
//! Entry names are matched against the same glob patterns as on-disk files
//! and their uncompressed size against the same limit (a small compressed
//! entry can still expand past it); matching entries are dispatched through
//! the regular extractor table under a virtual `archive!entry` path. One
//! entry failing never aborts its siblings.
use crate::config::ScanRequest;
use crate::keywords::KeywordSet;
use log::{error, info, warn};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::ZipArchive;

use super::{extract, ExtractorKind, Found, MAX_ARCHIVE_DEPTH};

#[derive(Debug, Clone, Copy)]
pub(crate) enum CliBackend {
    SevenZ,
    Rar,
}

impl CliBackend {
    fn label(self) -> &'static str {
        match self {
            Self::SevenZ => "7z",
            Self::Rar => "rar",
        }
    }

    fn unpack(self, archive: &Path, dest: &Path) -> std::io::Result<std::process::ExitStatus> {
        let mut cmd = match self {
            Self::SevenZ => {
                let mut cmd = Command::new("7z");
                cmd.arg("x").arg("-y").arg(format!("-o{}", dest.display())).arg(archive);
                cmd
            }
            Self::Rar => {
                let mut cmd = Command::new("unrar");
                cmd.arg("x").arg("-y").arg(archive).arg(dest);
                cmd
            }
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
    }
}

pub(crate) fn scan_zip(
    path: &Path,
    display: &str,
    request: &ScanRequest,
    keywords: &KeywordSet,
    depth: usize,
) -> Vec<Found> {
    if depth >= MAX_ARCHIVE_DEPTH {
        warn!("{display}: container nesting exceeds {MAX_ARCHIVE_DEPTH} levels, skipping");
        return Vec::new();
    }
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            error!("failed to open {display}: {err}");
            return Vec::new();
        }
    };
    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(err) => {
            error!("failed to read zip archive {display}: {err}");
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                error!("{display}: failed to open entry #{index}: {err}");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !request.matches_name(&name) {
            continue;
        }
        let virtual_path = format!("{display}!{name}");
        if entry.size() > request.max_file_size {
            warn!(
                "skipping {virtual_path} ({:.2} MB uncompressed exceeds the {:.2} MB limit)",
                entry.size() as f64 / (1024.0 * 1024.0),
                request.max_file_size as f64 / (1024.0 * 1024.0)
            );
            continue;
        }
        if is_text_entry(&name) {
            let mut bytes = Vec::new();
            if let Err(err) = entry.read_to_end(&mut bytes) {
                error!("{virtual_path}: failed to read entry: {err}");
                continue;
            }
            let hits = keywords.contains_any(&super::text::decode(&bytes));
            if !hits.is_empty() {
                found.push(Found {
                    path: virtual_path,
                    keywords: hits,
                });
            }
        } else {
            match spill_entry(&mut entry, &name) {
                Ok((_scratch, spilled)) => {
                    found.extend(dispatch_entry(&spilled, &virtual_path, request, keywords, depth));
                }
                Err(err) => error!("{virtual_path}: failed to extract entry: {err}"),
            }
        }
    }
    found
}

pub(crate) fn scan_cli(
    backend: CliBackend,
    path: &Path,
    display: &str,
    request: &ScanRequest,
    keywords: &KeywordSet,
    depth: usize,
) -> Vec<Found> {
    if depth >= MAX_ARCHIVE_DEPTH {
        warn!("{display}: container nesting exceeds {MAX_ARCHIVE_DEPTH} levels, skipping");
        return Vec::new();
    }
    let scratch = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => {
            error!("{display}: failed to create extraction directory: {err}");
            return Vec::new();
        }
    };
    match backend.unpack(path, scratch.path()) {
        Ok(status) if status.success() => {}
        Ok(status) => {
            error!("{display}: {} extraction exited with {status}", backend.label());
            return Vec::new();
        }
        Err(err) => {
            error!("{display}: failed to run {} extractor: {err}", backend.label());
            return Vec::new();
        }
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(scratch.path())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let rel = entry
            .path()
            .strip_prefix(scratch.path())
            .unwrap_or_else(|_| entry.path());
        let rel_name = rel.to_string_lossy().replace('\\', "/");
        if !request.matches_name(&rel_name) {
            continue;
        }
        let virtual_path = format!("{display}!{rel_name}");
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > request.max_file_size {
            warn!(
                "skipping {virtual_path} ({:.2} MB exceeds the {:.2} MB limit)",
                size as f64 / (1024.0 * 1024.0),
                request.max_file_size as f64 / (1024.0 * 1024.0)
            );
            continue;
        }
        if is_text_entry(&rel_name) {
            match std::fs::read(entry.path()) {
                Ok(bytes) => {
                    let hits = keywords.contains_any(&super::text::decode(&bytes));
                    if !hits.is_empty() {
                        found.push(Found {
                            path: virtual_path,
                            keywords: hits,
                        });
                    }
                }
                Err(err) => error!("{virtual_path}: failed to read extracted entry: {err}"),
            }
        } else {
            found.extend(dispatch_entry(entry.path(), &virtual_path, request, keywords, depth));
        }
    }
    found
}

/// Route an extracted entry through the regular dispatch table. Capability is
/// re-checked here: archives can contain formats the run cannot handle.
fn dispatch_entry(
    path: &Path,
    virtual_path: &str,
    request: &ScanRequest,
    keywords: &KeywordSet,
    depth: usize,
) -> Vec<Found> {
    let kind = ExtractorKind::for_path(path);
    if let Some(capability) = kind.missing_capability(&request.capabilities) {
        info!("skipping {virtual_path} ({capability} support unavailable)");
        return Vec::new();
    }
    extract(kind, path, virtual_path, request, keywords, depth + 1)
}

/// Suffixes read and decoded in place rather than spilled to disk.
fn is_text_entry(name: &str) -> bool {
    let lower = name.to_lowercase();
    [".txt", ".csv", ".log", ".xml", ".html", ".htm"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

/// Write a binary entry to a scoped temp directory under its base name; the
/// directory is removed when the returned guard drops.
fn spill_entry<R: Read>(entry: &mut R, name: &str) -> std::io::Result<(TempDir, std::path::PathBuf)> {
    let scratch = tempfile::tempdir()?;
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".to_string());
    let target = scratch.path().join(base);
    let mut out = File::create(&target)?;
    std::io::copy(entry, &mut out)?;
    out.flush()?;
    Ok((scratch, target))
}

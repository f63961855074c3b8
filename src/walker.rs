use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A candidate file produced by enumeration. No identity beyond the path.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
}

/// Lazily enumerate every regular file under `root`. Unreadable entries and
/// symlink loops are skipped with a diagnostic; they never abort the walk.
/// No ordering is guaranteed.
pub fn walk_root(root: &Path) -> impl Iterator<Item = FileRecord> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| match entry.metadata() {
            Ok(metadata) => Some(FileRecord {
                path: entry.into_path(),
                size: metadata.len(),
            }),
            Err(err) => {
                debug!("skipping {}: {err}", entry.path().display());
                None
            }
        })
}

//! Result aggregation and incremental reporting.
use crate::error::Result;
use chrono::Local;
use log::warn;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Collects per-file keyword matches and, when a destination is attached,
/// streams each one out the moment it is recorded so partial results survive
/// a crash or cancellation.
///
/// Safe to call from any worker; synchronization lives behind this type so
/// extractor code never reasons about it.
pub struct ResultSink {
    inner: Mutex<Inner>,
}

struct Inner {
    matches: BTreeMap<String, BTreeSet<String>>,
    out: Option<Box<dyn Write + Send>>,
}

impl ResultSink {
    /// In-memory only.
    pub fn new() -> Self {
        Self::with_output(None)
    }

    pub fn with_output(out: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                matches: BTreeMap::new(),
                out,
            }),
        }
    }

    /// Append to a results file, writing a timestamped header when the file
    /// is new or empty.
    pub fn open(path: &Path) -> Result<Self> {
        let existing = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut out = BufWriter::new(file);
        if existing == 0 {
            writeln!(out, "Search results")?;
            writeln!(out)?;
            writeln!(out, "Started: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
            writeln!(out)?;
            out.flush()?;
        }
        Ok(Self::with_output(Some(Box::new(out))))
    }

    /// Record one file's matches. Duplicate paths are not expected within a
    /// scan (one worker owns one file); if one arrives anyway, last write
    /// wins. Output write failures degrade to a warning so a full disk never
    /// kills the scan.
    pub fn record(&self, path: String, keywords: BTreeSet<String>) {
        let mut inner = self.inner.lock();
        if let Some(out) = inner.out.as_mut() {
            let joined = keywords.iter().cloned().collect::<Vec<_>>().join(", ");
            let block = format!("File: {path}\nKeywords found: {joined}\n\n");
            if let Err(err) = out.write_all(block.as_bytes()).and_then(|_| out.flush()) {
                warn!("failed to write result for {path}: {err}");
            }
        }
        inner.matches.insert(path, keywords);
    }

    /// Write the closing timestamp line, if a destination is attached.
    pub fn finish(&self) {
        let mut inner = self.inner.lock();
        if let Some(out) = inner.out.as_mut() {
            let line = format!(
                "Finished: {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            );
            if let Err(err) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
                warn!("failed to finalize results output: {err}");
            }
        }
    }

    pub fn matched_count(&self) -> usize {
        self.inner.lock().matches.len()
    }

    pub fn snapshot(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.inner.lock().matches.clone()
    }
}

impl Default for ResultSink {
    fn default() -> Self {
        Self::new()
    }
}

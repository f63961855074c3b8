//! The scanning engine: enumeration, bounded fan-out, timeout, cancellation.
use crate::config::ScanRequest;
use crate::error::{Result, ScanError};
use crate::extract::{self, ExtractorKind, Found};
use crate::gate::{self, Admission};
use crate::keywords::KeywordSet;
use crate::sink::ResultSink;
use crate::walker::{self, FileRecord};
use crossbeam_channel::bounded;
use log::{debug, error, info};
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cooperative early-stop flag, shared between the engine and its caller.
/// Workers finish their current file; nothing further is dispatched.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One progress notification per processed file. `processed` is monotonic
/// non-decreasing across a scan.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub path: PathBuf,
    pub processed: usize,
    pub total: Option<usize>,
}

/// Receives progress from the engine. Events are delivered from the scan's
/// calling thread, never from workers; a GUI/TUI observer is responsible for
/// marshaling onto its own context.
pub trait ScanObserver: Send + Sync {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl ScanObserver for NullObserver {}

/// Terminal summary of one complete (or cancelled) scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub matches: BTreeMap<String, BTreeSet<String>>,
    /// Files seen by the walk, before gating.
    pub files_seen: usize,
    /// Files that went through an extractor (with or without matches).
    pub processed: usize,
    pub bytes_processed: u64,
    pub filtered_size: usize,
    pub filtered_pattern: usize,
    pub skipped_capability: usize,
    pub timeouts: usize,
    pub errors: Vec<String>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ScanOutcome {
    pub fn matched_files(&self) -> usize {
        self.matches.len()
    }
}

struct Candidate {
    record: FileRecord,
    kind: ExtractorKind,
}

struct FileReport {
    path: PathBuf,
    size: u64,
    outcome: FileOutcome,
}

enum FileOutcome {
    Matches(Vec<Found>),
    TimedOut(Duration),
    Failed(String),
}

/// Drives one scan: single-threaded enumeration per root, then a fixed pool
/// of workers fed through a rendezvous channel, with results drained by the
/// calling thread.
pub struct Scanner {
    request: Arc<ScanRequest>,
    keywords: Arc<KeywordSet>,
}

impl Scanner {
    pub fn new(request: ScanRequest, keywords: KeywordSet) -> Self {
        Self {
            request: Arc::new(request),
            keywords: Arc::new(keywords),
        }
    }

    /// Run the scan to completion (or cancellation). Per-file failures and
    /// timeouts are contained and tallied; only the absence of any usable
    /// root is fatal.
    pub fn run(
        &self,
        sink: &ResultSink,
        observer: &dyn ScanObserver,
        cancel: &CancelToken,
    ) -> Result<ScanOutcome> {
        let started = Instant::now();
        let mut outcome = ScanOutcome::default();

        // Materialize candidates per root first: the total drives progress
        // reporting, and the gate runs once per file per root.
        let mut batches: Vec<Vec<Candidate>> = Vec::new();
        let mut usable_roots = 0;
        for root in &self.request.roots {
            if !root.is_dir() {
                error!("root directory {} does not exist, skipping", root.display());
                outcome
                    .errors
                    .push(format!("{}: root not found", root.display()));
                continue;
            }
            usable_roots += 1;
            let mut candidates = Vec::new();
            for record in walker::walk_root(root) {
                outcome.files_seen += 1;
                match gate::admit(&record.path, record.size, &self.request) {
                    Admission::Admit(kind) => candidates.push(Candidate { record, kind }),
                    Admission::TooLarge => outcome.filtered_size += 1,
                    Admission::NoPatternMatch => outcome.filtered_pattern += 1,
                    Admission::CapabilityMissing(_) => outcome.skipped_capability += 1,
                }
            }
            info!(
                "{}: {} candidate files",
                root.display(),
                candidates.len()
            );
            batches.push(candidates);
        }
        if usable_roots == 0 {
            return Err(ScanError::NoUsableRoots);
        }

        let total: usize = batches.iter().map(Vec::len).sum();
        let mut processed = 0usize;
        for candidates in batches {
            if cancel.is_cancelled() {
                break;
            }
            self.process_batch(
                candidates,
                total,
                &mut processed,
                &mut outcome,
                sink,
                observer,
                cancel,
            );
        }

        outcome.cancelled = cancel.is_cancelled();
        outcome.processed = processed;
        outcome.matches = sink.snapshot();
        outcome.elapsed = started.elapsed();
        info!(
            "scan finished: {} of {} candidates processed, {} matched, {} errors, {} timeouts",
            outcome.processed,
            total,
            outcome.matched_files(),
            outcome.errors.len(),
            outcome.timeouts
        );
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_batch(
        &self,
        candidates: Vec<Candidate>,
        total: usize,
        processed: &mut usize,
        outcome: &mut ScanOutcome,
        sink: &ResultSink,
        observer: &dyn ScanObserver,
        cancel: &CancelToken,
    ) {
        if candidates.is_empty() {
            return;
        }
        // Rendezvous channels on both sides: nothing queues up, so once the
        // flag is set at most one in-flight file per worker completes.
        let (work_tx, work_rx) = bounded::<Candidate>(0);
        let (done_tx, done_rx) = bounded::<FileReport>(0);

        thread::scope(|scope| {
            for _ in 0..self.request.workers.max(1) {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    while let Ok(candidate) = work_rx.recv() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let report = self.process_candidate(candidate);
                        if done_tx.send(report).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);
            drop(work_rx);

            scope.spawn(move || {
                for candidate in candidates {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if work_tx.send(candidate).is_err() {
                        break;
                    }
                }
            });

            for report in done_rx {
                *processed += 1;
                outcome.bytes_processed += report.size;
                match report.outcome {
                    FileOutcome::Matches(found) => {
                        for hit in found {
                            if !hit.keywords.is_empty() {
                                sink.record(hit.path, hit.keywords);
                            }
                        }
                    }
                    FileOutcome::TimedOut(limit) => {
                        error!(
                            "timed out after {limit:?} while processing {}",
                            report.path.display()
                        );
                        outcome.timeouts += 1;
                    }
                    FileOutcome::Failed(reason) => {
                        error!("failed to process {}: {reason}", report.path.display());
                        outcome
                            .errors
                            .push(format!("{}: {reason}", report.path.display()));
                    }
                }
                observer.on_progress(&ProgressEvent {
                    path: report.path,
                    processed: *processed,
                    total: Some(total),
                });
            }
        });
    }

    /// Process one file under the per-file budget. The extraction runs on a
    /// detached thread so a wedged parser cannot hold a pool slot forever;
    /// on timeout the thread is abandoned and the file is final for this
    /// scan. Panics are caught at this boundary and become zero matches.
    fn process_candidate(&self, candidate: Candidate) -> FileReport {
        let Candidate { record, kind } = candidate;
        let size = record.size;
        debug!("processing {}", record.path.display());

        let (tx, rx) = bounded(1);
        let request = Arc::clone(&self.request);
        let keywords = Arc::clone(&self.keywords);
        let path = record.path.clone();
        let display = record.path.display().to_string();
        let spawned = thread::Builder::new()
            .name("kwscan-extract".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    extract::extract(kind, &path, &display, &request, &keywords, 0)
                }));
                let _ = tx.send(result);
            });
        if let Err(err) = spawned {
            return FileReport {
                path: record.path,
                size,
                outcome: FileOutcome::Failed(format!("could not spawn extraction: {err}")),
            };
        }

        let outcome = match rx.recv_timeout(self.request.per_file_timeout) {
            Ok(Ok(found)) => FileOutcome::Matches(found),
            Ok(Err(_)) => FileOutcome::Failed("extraction panicked".to_string()),
            Err(_) => FileOutcome::TimedOut(self.request.per_file_timeout),
        };
        FileReport {
            path: record.path,
            size,
            outcome,
        }
    }
}
